//! Provider registry
//!
//! Maps a configured provider name onto a shared chat capability. Built once
//! at startup, then read by the engine while it constructs agents.

use crate::provider::{
    AnthropicProvider, ChatCapability, GeminiProvider, OpenAIProvider, ProviderConfig,
    ProviderType,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use undercover_error::{Error, Result};

#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderType, Arc<dyn ChatCapability>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every vendor whose API key is present in the environment
    pub fn from_env() -> Result<Self> {
        let mut registry = Self::new();
        for provider_type in ProviderType::vendors() {
            if let Some(config) = ProviderConfig::from_env(provider_type) {
                registry.register(provider_type, Self::build(config)?);
                log::debug!("[registry] {} configured from environment", provider_type);
            }
        }
        Ok(registry)
    }

    /// Construct the vendor adapter a config describes
    pub fn build(config: ProviderConfig) -> Result<Arc<dyn ChatCapability>> {
        let provider: Arc<dyn ChatCapability> = match config.provider_type {
            ProviderType::OpenAI => Arc::new(OpenAIProvider::new(config)?),
            ProviderType::Anthropic => Arc::new(AnthropicProvider::new(config)?),
            ProviderType::Google => Arc::new(GeminiProvider::new(config)?),
            ProviderType::Mock => {
                return Err(Error::unsupported(
                    "mock providers are registered directly, not built from config",
                ))
            }
        };
        Ok(provider)
    }

    pub fn register(&mut self, provider_type: ProviderType, provider: Arc<dyn ChatCapability>) {
        self.providers.insert(provider_type, provider);
    }

    /// Builder form of [`register`](Self::register)
    pub fn with(mut self, provider_type: ProviderType, provider: Arc<dyn ChatCapability>) -> Self {
        self.register(provider_type, provider);
        self
    }

    pub fn get(&self, provider_type: ProviderType) -> Result<Arc<dyn ChatCapability>> {
        self.providers
            .get(&provider_type)
            .cloned()
            .ok_or_else(|| Error::provider_unavailable(provider_type.as_str()))
    }

    pub fn contains(&self, provider_type: ProviderType) -> bool {
        self.providers.contains_key(&provider_type)
    }

    /// Registered provider types in a stable order
    pub fn provider_types(&self) -> Vec<ProviderType> {
        let mut types: Vec<_> = self.providers.keys().copied().collect();
        types.sort_by_key(|t| t.as_str());
        types
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.provider_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockChat;
    use undercover_error::ErrorKind;

    #[test]
    fn test_register_and_get() {
        let registry = ProviderRegistry::new()
            .with(ProviderType::Mock, Arc::new(MockChat::new().with_name("offline")));

        assert!(registry.contains(ProviderType::Mock));
        assert_eq!(registry.get(ProviderType::Mock).unwrap().name(), "offline");
        assert_eq!(registry.provider_types(), vec![ProviderType::Mock]);
    }

    #[test]
    fn test_missing_provider() {
        let registry = ProviderRegistry::new();
        let err = registry.get(ProviderType::Anthropic).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::ProviderUnavailable);
        assert!(!err.is_retryable());
        assert_eq!(err.context_value("provider"), Some("anthropic"));
    }

    #[test]
    fn test_build_vendor_adapters() {
        let openai = ProviderRegistry::build(ProviderConfig::openai("sk-test")).unwrap();
        assert_eq!(openai.name(), "openai");
        assert!(openai.models().contains(&"GPT-4o".to_string()));

        let gemini = ProviderRegistry::build(ProviderConfig::google("key")).unwrap();
        assert_eq!(gemini.name(), "google");
    }

    #[test]
    fn test_build_rejects_missing_key() {
        let err = ProviderRegistry::build(ProviderConfig::anthropic("")).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }
}
