//! # Chat Provider Interface
//!
//! A trait-based abstraction over LLM vendors. Agents only ever see
//! [`ChatCapability`]; which vendor sits behind it is decided by
//! configuration when the game is set up.
//!
//! ## Design
//! - `ChatCapability::complete` is the vendor-specific part (raw text out)
//! - `ChatCapability::chat` layers JSON extraction on top when asked for
//! - HTTP 429 always surfaces as `ErrorKind::RateLimited` tagged "rate limit"

pub mod openai;
pub mod anthropic;
pub mod gemini;

pub use openai::OpenAIProvider;
pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use undercover_error::{Error, ErrorKind, Result};

// ============================================================================
// Core Types
// ============================================================================

/// Per-call generation options
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
    /// Ask for structured output; the reply is parsed as JSON
    pub json_mode: bool,
}

impl ChatOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn with_max_tokens(mut self, max: usize) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }
}

/// What a chat call produced
#[derive(Debug, Clone, PartialEq)]
pub enum ChatReply {
    Text(String),
    Json(serde_json::Value),
}

impl ChatReply {
    /// Structured payload, or `MalformedResponse` if the model answered in prose
    pub fn into_json(self) -> Result<serde_json::Value> {
        match self {
            ChatReply::Json(value) => Ok(value),
            ChatReply::Text(text) => Err(Error::malformed_response(format!(
                "expected structured output, got text: {}",
                truncate(&text, 120)
            ))),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ChatReply::Text(text) => Some(text),
            ChatReply::Json(_) => None,
        }
    }
}

// ============================================================================
// Provider Trait
// ============================================================================

/// The uniform chat capability.
///
/// Implementations only supply [`complete`](ChatCapability::complete); the
/// provided [`chat`](ChatCapability::chat) applies the JSON extraction rule.
#[async_trait]
pub trait ChatCapability: Send + Sync {
    /// Provider name (e.g. "openai", "anthropic")
    fn name(&self) -> &str;

    /// Display names of the models this provider knows about
    fn models(&self) -> Vec<String> {
        Vec::new()
    }

    /// One round trip: system + user prompt in, raw text out
    async fn complete(
        &self,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
        options: &ChatOptions,
    ) -> Result<String>;

    /// Chat completion, parsed as JSON when `options.json_mode` is set
    async fn chat(
        &self,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
        options: &ChatOptions,
    ) -> Result<ChatReply> {
        let text = self
            .complete(model, system_prompt, user_prompt, options)
            .await?;
        if options.json_mode {
            extract_json(&text).map(ChatReply::Json)
        } else {
            Ok(ChatReply::Text(text))
        }
    }

    /// Minimal round trip to verify credentials and model name
    async fn test_connection(&self, model: &str) -> Result<()> {
        let options = ChatOptions::new().with_max_tokens(10);
        self.complete(
            model,
            "You are a helpful assistant.",
            "Say \"test\" if you can hear me.",
            &options,
        )
        .await
        .map(|_| ())
    }
}

/// Rate-limit failures are recognized by kind or by the "rate limit" tag
pub fn is_rate_limited(err: &Error) -> bool {
    err.kind() == ErrorKind::RateLimited || err.message().to_lowercase().contains("rate limit")
}

// ============================================================================
// JSON extraction
// ============================================================================

/// Parse structured data out of model text.
///
/// Takes the first balanced `{...}` region (braces inside JSON strings do
/// not count); without one the whole text is parsed.
pub fn extract_json(text: &str) -> Result<serde_json::Value> {
    let candidate = first_balanced_object(text).unwrap_or_else(|| text.trim());
    serde_json::from_str(candidate).map_err(|e| {
        Error::parse_failed(format!(
            "invalid JSON response: {} in: {}",
            e,
            truncate(text, 200)
        ))
        .set_source(e)
    })
}

fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

// ============================================================================
// Provider Configuration
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    OpenAI,
    Anthropic,
    Google,
    Mock,
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::OpenAI => "openai",
            ProviderType::Anthropic => "anthropic",
            ProviderType::Google => "google",
            ProviderType::Mock => "mock",
        }
    }

    /// Vendors reachable over HTTP
    pub fn vendors() -> [ProviderType; 3] {
        [ProviderType::OpenAI, ProviderType::Anthropic, ProviderType::Google]
    }

    /// Environment variables consulted for the API key, in order
    pub fn key_vars(&self) -> &'static [&'static str] {
        match self {
            ProviderType::OpenAI => &["OPENAI_API_KEY"],
            ProviderType::Anthropic => &["ANTHROPIC_API_KEY"],
            ProviderType::Google => &["GOOGLE_API_KEY", "GEMINI_API_KEY"],
            ProviderType::Mock => &[],
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(ProviderType::OpenAI),
            "anthropic" | "claude" => Ok(ProviderType::Anthropic),
            "google" | "gemini" => Ok(ProviderType::Google),
            "mock" => Ok(ProviderType::Mock),
            other => Err(Error::invalid_argument(format!("unknown provider '{}'", other))
                .with_context("provider", other)),
        }
    }
}

/// Configuration for creating vendor providers
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub provider_type: ProviderType,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub headers: HashMap<String, String>,
    pub timeout_secs: Option<u64>,
}

impl ProviderConfig {
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self {
            provider_type: ProviderType::OpenAI,
            api_key: Some(api_key.into()),
            base_url: Some("https://api.openai.com/v1".into()),
            headers: HashMap::new(),
            timeout_secs: Some(120),
        }
    }

    pub fn anthropic(api_key: impl Into<String>) -> Self {
        let mut headers = HashMap::new();
        headers.insert("anthropic-version".into(), "2023-06-01".into());

        Self {
            provider_type: ProviderType::Anthropic,
            api_key: Some(api_key.into()),
            base_url: Some("https://api.anthropic.com/v1".into()),
            headers,
            timeout_secs: Some(120),
        }
    }

    pub fn google(api_key: impl Into<String>) -> Self {
        Self {
            provider_type: ProviderType::Google,
            api_key: Some(api_key.into()),
            base_url: Some("https://generativelanguage.googleapis.com/v1beta".into()),
            headers: HashMap::new(),
            timeout_secs: Some(120),
        }
    }

    /// Build a vendor config from its API key variable, if set and non-empty
    pub fn from_env(provider_type: ProviderType) -> Option<Self> {
        let key = provider_type
            .key_vars()
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|value| !value.trim().is_empty())?;

        match provider_type {
            ProviderType::OpenAI => Some(Self::openai(key)),
            ProviderType::Anthropic => Some(Self::anthropic(key)),
            ProviderType::Google => Some(Self::google(key)),
            ProviderType::Mock => None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    fn require_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                Error::config_invalid("API key is required")
                    .with_context("provider", self.provider_type.as_str())
            })
    }
}

// ============================================================================
// Shared HTTP helpers
// ============================================================================

fn http_client(config: &ProviderConfig) -> Result<Client> {
    Client::builder()
        .timeout(std::time::Duration::from_secs(
            config.timeout_secs.unwrap_or(120),
        ))
        .build()
        .map_err(|e| {
            Error::unexpected(format!("failed to create HTTP client: {}", e))
                .with_operation("provider::http_client")
                .set_source(e)
        })
}

fn network_error(provider: &'static str, err: reqwest::Error) -> Error {
    let base = if err.is_timeout() {
        Error::new(ErrorKind::Timeout, err.to_string())
    } else {
        Error::network_failed(err.to_string())
    };
    base.with_context("provider", provider).set_source(err)
}

/// Map a non-success vendor response onto the error taxonomy
fn vendor_error(provider: &'static str, status: u16, body: &str) -> Error {
    match status {
        429 => Error::rate_limited(provider),
        401 | 403 => Error::authentication_failed(provider),
        _ => {
            let detail = serde_json::from_str::<serde_json::Value>(body)
                .ok()
                .and_then(|v| {
                    v.pointer("/error/message")
                        .and_then(|m| m.as_str())
                        .map(str::to_string)
                })
                .unwrap_or_else(|| truncate(body, 200));
            Error::api_failed(status, format!("{} API error ({}): {}", provider, status, detail))
                .with_context("provider", provider)
        }
    }
}

/// Map a display alias onto the vendor model id; unknown names pass through
fn resolve_model(aliases: &[(&str, &str)], model: &str) -> String {
    aliases
        .iter()
        .find(|(alias, _)| *alias == model)
        .map(|(_, id)| id.to_string())
        .unwrap_or_else(|| model.to_string())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len).collect();
        format!("{}…", head)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_plain_json() {
        let value = extract_json(r#"{"vote": 3}"#).unwrap();
        assert_eq!(value, json!({"vote": 3}));
    }

    #[test]
    fn test_extract_from_markdown_fence() {
        let text = "Here you go:\n```json\n{\"statement\": \"it has wheels\"}\n```\nGood luck!";
        let value = extract_json(text).unwrap();
        assert_eq!(value["statement"], "it has wheels");
    }

    #[test]
    fn test_extract_first_balanced_region_only() {
        let text = r#"{"novelty": {"score": 0.8}} trailing {"other": 1}"#;
        let value = extract_json(text).unwrap();
        assert_eq!(value, json!({"novelty": {"score": 0.8}}));
    }

    #[test]
    fn test_braces_inside_strings_are_ignored() {
        let text = r#"{"statement": "shaped like } or {", "identity": "civilian"} tail"#;
        let value = extract_json(text).unwrap();
        assert_eq!(value["identity"], "civilian");
    }

    #[test]
    fn test_no_braces_parses_whole_text() {
        assert_eq!(extract_json("  42 ").unwrap(), json!(42));
    }

    #[test]
    fn test_parse_failure_names_text() {
        let err = extract_json("I refuse to answer in JSON").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseFailed);
        assert!(err.message().contains("I refuse"));
    }

    #[test]
    fn test_reply_into_json() {
        let err = ChatReply::Text("hello".into()).into_json().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
        assert!(ChatReply::Json(json!({})).into_json().is_ok());
    }

    #[test]
    fn test_rate_limit_detection() {
        assert!(is_rate_limited(&Error::rate_limited("openai")));
        assert!(is_rate_limited(&Error::api_failed(500, "Rate limit reached, slow down")));
        assert!(!is_rate_limited(&Error::network_failed("connection refused")));
    }

    #[test]
    fn test_vendor_error_mapping() {
        assert_eq!(vendor_error("openai", 429, "").kind(), ErrorKind::RateLimited);
        assert_eq!(vendor_error("openai", 401, "").kind(), ErrorKind::AuthenticationFailed);

        let err = vendor_error("openai", 500, r#"{"error": {"message": "overloaded"}}"#);
        assert_eq!(err.kind(), ErrorKind::ApiFailed);
        assert!(err.message().contains("overloaded"));
        assert_eq!(err.context_value("status"), Some("500"));
    }

    #[test]
    fn test_provider_type_parsing() {
        assert_eq!("OpenAI".parse::<ProviderType>().unwrap(), ProviderType::OpenAI);
        assert_eq!("gemini".parse::<ProviderType>().unwrap(), ProviderType::Google);
        assert!("cohere".parse::<ProviderType>().is_err());
    }

    #[test]
    fn test_provider_config() {
        let config = ProviderConfig::anthropic("sk-ant-test");
        assert_eq!(config.provider_type, ProviderType::Anthropic);
        assert!(config.headers.contains_key("anthropic-version"));

        let config = ProviderConfig::openai("").with_timeout(5);
        assert!(config.require_key().is_err());
        assert_eq!(config.timeout_secs, Some(5));
    }

    #[test]
    fn test_options_builder() {
        let options = ChatOptions::new().with_temperature(0.3).json();
        assert_eq!(options.temperature, Some(0.3));
        assert!(options.json_mode);
        assert_eq!(options.max_tokens, None);
    }
}
