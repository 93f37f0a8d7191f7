//! Anthropic Claude provider implementation

use super::*;
use serde::{Deserialize, Serialize};

const MODELS: &[(&str, &str)] = &[
    ("Claude-3-Opus", "claude-3-opus-20240229"),
    ("Claude-3-Sonnet", "claude-3-sonnet-20240229"),
    ("Claude-3-Haiku", "claude-3-haiku-20240307"),
    ("Claude-3.5-Sonnet", "claude-3-5-sonnet-20241022"),
];

const DEFAULT_MAX_TOKENS: usize = 1024;

/// Anthropic Claude provider
pub struct AnthropicProvider {
    client: Client,
    config: ProviderConfig,
}

impl AnthropicProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        config.require_key()?;
        let client = http_client(&config)?;
        Ok(Self { client, config })
    }

    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or("https://api.anthropic.com/v1")
    }
}

#[async_trait]
impl ChatCapability for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn models(&self) -> Vec<String> {
        MODELS.iter().map(|(alias, _)| alias.to_string()).collect()
    }

    /// The messages API has no JSON switch; structured output relies on the
    /// prompt plus extraction in `chat`.
    async fn complete(
        &self,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
        options: &ChatOptions,
    ) -> Result<String> {
        let api_request = AnthropicRequest {
            model: resolve_model(MODELS, model),
            system: Some(system_prompt.to_string()).filter(|s| !s.is_empty()),
            messages: vec![AnthropicMessage {
                role: "user".into(),
                content: user_prompt.to_string(),
            }],
            max_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: options.temperature,
        };

        let mut req = self
            .client
            .post(format!("{}/messages", self.base_url()))
            .header("x-api-key", self.config.require_key()?)
            .header("content-type", "application/json")
            .json(&api_request);

        for (key, value) in &self.config.headers {
            req = req.header(key, value);
        }

        log::debug!("[anthropic] POST messages model={}", api_request.model);

        let response = req
            .send()
            .await
            .map_err(|e| network_error("anthropic", e).with_operation("anthropic::complete"))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(
                vendor_error("anthropic", status, &text).with_operation("anthropic::complete")
            );
        }

        let api_response: AnthropicResponse = response.json().await.map_err(|e| {
            Error::malformed_response(format!("unreadable Anthropic response: {}", e))
                .with_operation("anthropic::complete")
                .set_source(e)
        })?;

        let content: String = api_response
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .collect();

        if content.is_empty() {
            return Err(Error::malformed_response("no text content in response")
                .with_operation("anthropic::complete"));
        }
        Ok(content)
    }
}

// ============================================================================
// Anthropic API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_aliases() {
        assert_eq!(resolve_model(MODELS, "Claude-3-Haiku"), "claude-3-haiku-20240307");
        assert_eq!(
            resolve_model(MODELS, "Claude-3.5-Sonnet"),
            "claude-3-5-sonnet-20241022"
        );
    }

    #[test]
    fn test_system_is_top_level() {
        let request = AnthropicRequest {
            model: "claude-3-haiku-20240307".into(),
            messages: vec![AnthropicMessage {
                role: "user".into(),
                content: "Describe your concept".into(),
            }],
            system: Some("You are playing a game".into()),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: Some(0.3),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["system"], "You are playing a game");
        assert_eq!(value["messages"].as_array().unwrap().len(), 1);
        assert_eq!(value["max_tokens"], 1024);
    }

    #[test]
    fn test_response_text_blocks() {
        let body = r#"{"content": [{"type": "text", "text": "{\"vote\": "}, {"type": "tool_use"}, {"type": "text", "text": "2}"}]}"#;
        let response: AnthropicResponse = serde_json::from_str(body).unwrap();
        let text: String = response
            .content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .collect();
        assert_eq!(text, r#"{"vote": 2}"#);
    }
}
