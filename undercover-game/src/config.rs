//! Game configuration
//!
//! Loaded from camelCase JSON or built in code; always validated before a
//! game starts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use undercover_error::{Error, Result};
use undercover_llm::{ProviderType, RetryPolicy};

use crate::prompts::Language;
use crate::types::ConceptPair;

/// Which provider and model drives one agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSpec {
    pub provider: ProviderType,
    pub model: String,
}

impl AgentSpec {
    pub fn new(provider: ProviderType, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

impl fmt::Display for AgentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.model)
    }
}

/// Parses `provider:model`, e.g. `anthropic:Claude-3-Haiku`
impl FromStr for AgentSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (provider, model) = s.split_once(':').ok_or_else(|| {
            Error::invalid_argument(format!("expected provider:model, got '{}'", s))
        })?;
        if model.trim().is_empty() {
            return Err(Error::invalid_argument(format!("missing model in '{}'", s)));
        }
        Ok(Self::new(provider.parse()?, model.trim()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    pub player_count: usize,
    pub undercover_count: usize,
    /// One entry per player, in id order
    pub players: Vec<AgentSpec>,
    #[serde(default)]
    pub judges: Vec<AgentSpec>,
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
    #[serde(default = "default_rounds_before_voting")]
    pub rounds_before_voting: u32,
    #[serde(default = "default_threshold")]
    pub elimination_threshold: f64,
    #[serde(default)]
    pub language: Language,
    pub concept_pair: ConceptPair,
    #[serde(default)]
    pub retry: RetryConfig,
    /// Per chat call; expiry counts as a transport failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_timeout_secs: Option<f64>,
}

fn default_max_rounds() -> u32 {
    10
}

fn default_rounds_before_voting() -> u32 {
    1
}

fn default_threshold() -> f64 {
    0.5
}

impl GameConfig {
    pub fn new(concept_pair: ConceptPair, players: Vec<AgentSpec>, undercover_count: usize) -> Self {
        Self {
            player_count: players.len(),
            undercover_count,
            players,
            judges: Vec::new(),
            max_rounds: default_max_rounds(),
            rounds_before_voting: default_rounds_before_voting(),
            elimination_threshold: default_threshold(),
            language: Language::default(),
            concept_pair,
            retry: RetryConfig::default(),
            call_timeout_secs: None,
        }
    }

    pub fn with_judges(mut self, judges: Vec<AgentSpec>) -> Self {
        self.judges = judges;
        self
    }

    pub fn with_max_rounds(mut self, rounds: u32) -> Self {
        self.max_rounds = rounds;
        self
    }

    pub fn with_rounds_before_voting(mut self, rounds: u32) -> Self {
        self.rounds_before_voting = rounds;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.elimination_threshold = threshold;
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_call_timeout(mut self, secs: f64) -> Self {
        self.call_timeout_secs = Some(secs);
        self
    }

    /// Read and validate a JSON config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::from(e).with_context("path", path.display().to_string()))?;
        let config: GameConfig = serde_json::from_str(&text).map_err(|e| {
            Error::config_invalid(format!("invalid game config: {}", e))
                .with_context("path", path.display().to_string())
                .set_source(e)
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> {
            Err(Error::config_invalid(msg).with_operation("config::validate"))
        };

        if self.players.len() != self.player_count {
            return invalid(format!(
                "playerCount is {} but {} player specs were given",
                self.player_count,
                self.players.len()
            ));
        }
        if self.undercover_count < 1 || self.undercover_count >= self.player_count {
            return invalid(format!(
                "undercoverCount must be at least 1 and below playerCount ({}), got {}",
                self.player_count, self.undercover_count
            ));
        }
        if self.max_rounds < 1 {
            return invalid("maxRounds must be at least 1".to_string());
        }
        if self.rounds_before_voting < 1 {
            return invalid("roundsBeforeVoting must be at least 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.elimination_threshold) {
            return invalid(format!(
                "eliminationThreshold must be within [0, 1], got {}",
                self.elimination_threshold
            ));
        }
        if self.concept_pair.concept_a.trim().is_empty() || self.concept_pair.concept_b.trim().is_empty() {
            return invalid("both concept words must be non-empty".to_string());
        }
        if self.retry.max_attempts < 1 {
            return invalid("retry.maxAttempts must be at least 1".to_string());
        }
        if let Some(secs) = self.call_timeout_secs {
            if !(secs.is_finite() && secs > 0.0) {
                return invalid(format!("callTimeoutSecs must be positive, got {}", secs));
            }
            if Duration::try_from_secs_f64(secs).is_err() {
                return invalid(format!("callTimeoutSecs is out of range, got {}", secs));
            }
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let policy = RetryPolicy::new()
            .with_max_attempts(self.retry.max_attempts)
            .with_base_delay(Duration::from_millis(self.retry.base_delay_ms));
        match self.call_timeout_secs.map(Duration::try_from_secs_f64) {
            Some(Ok(timeout)) => policy.with_call_timeout(timeout),
            Some(Err(_)) => {
                log::warn!("[config] unusable callTimeoutSecs, calls run without a timeout");
                policy
            }
            None => policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use undercover_error::ErrorKind;

    fn mock_players(n: usize) -> Vec<AgentSpec> {
        (0..n).map(|_| AgentSpec::new(ProviderType::Mock, "mock")).collect()
    }

    #[test]
    fn test_agent_spec_parsing() {
        let spec: AgentSpec = "anthropic:Claude-3-Haiku".parse().unwrap();
        assert_eq!(spec.provider, ProviderType::Anthropic);
        assert_eq!(spec.model, "Claude-3-Haiku");
        assert_eq!(spec.to_string(), "anthropic:Claude-3-Haiku");

        assert!("openai".parse::<AgentSpec>().is_err());
        assert!("openai:".parse::<AgentSpec>().is_err());
        assert!("nobody:model".parse::<AgentSpec>().is_err());
    }

    #[test]
    fn test_defaults_from_json() {
        let json = r#"{
            "playerCount": 3,
            "undercoverCount": 1,
            "players": [
                {"provider": "openai", "model": "GPT-4o"},
                {"provider": "google", "model": "Gemini-1.5-Flash"},
                {"provider": "mock", "model": "mock"}
            ],
            "conceptPair": {"conceptA": "tea", "conceptB": "coffee"}
        }"#;
        let config: GameConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.max_rounds, 10);
        assert_eq!(config.rounds_before_voting, 1);
        assert_eq!(config.elimination_threshold, 0.5);
        assert_eq!(config.language, Language::En);
        assert_eq!(config.retry, RetryConfig::default());
        assert!(config.judges.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rules() {
        let pair = ConceptPair::new("tea", "coffee");
        let base = GameConfig::new(pair, mock_players(4), 1);
        assert!(base.validate().is_ok());

        let mut config = base.clone();
        config.undercover_count = 4;
        assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::ConfigInvalid);

        let mut config = base.clone();
        config.undercover_count = 0;
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.player_count = 5;
        assert!(config.validate().is_err());

        assert!(base.clone().with_rounds_before_voting(0).validate().is_err());
        assert!(base.clone().with_max_rounds(0).validate().is_err());
        assert!(base.clone().with_threshold(1.5).validate().is_err());
        assert!(base.clone().with_call_timeout(0.0).validate().is_err());

        let huge = base.clone().with_call_timeout(1e30);
        assert_eq!(huge.validate().unwrap_err().kind(), ErrorKind::ConfigInvalid);
        assert_eq!(huge.retry_policy().call_timeout, None);
    }

    #[test]
    fn test_retry_policy() {
        let config = GameConfig::new(ConceptPair::new("a", "b"), mock_players(3), 1)
            .with_retry(RetryConfig {
                max_attempts: 5,
                base_delay_ms: 10,
            })
            .with_call_timeout(2.5);
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_delay, Duration::from_millis(10));
        assert_eq!(policy.call_timeout, Some(Duration::from_millis(2500)));
    }

    #[test]
    fn test_from_file() {
        let config = GameConfig::new(ConceptPair::new("tea", "coffee"), mock_players(3), 1)
            .with_language(Language::Zh);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&config).unwrap().as_bytes())
            .unwrap();

        let loaded = GameConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded, config);

        let err = GameConfig::from_file("/no/such/game.json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
    }

    #[test]
    fn test_from_file_rejects_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"playerCount": 2}"#).unwrap();
        let err = GameConfig::from_file(file.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }
}
