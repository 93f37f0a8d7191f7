//! OpenAI chat-completions provider
//!
//! Also works with OpenAI-compatible endpoints via `ProviderConfig::with_base_url`.

use super::*;
use serde::{Deserialize, Serialize};

const MODELS: &[(&str, &str)] = &[
    ("GPT-4o", "gpt-4o"),
    ("GPT-4o-mini", "gpt-4o-mini"),
    ("GPT-4-turbo", "gpt-4-turbo"),
    ("GPT-4", "gpt-4"),
    ("GPT-3.5-turbo", "gpt-3.5-turbo"),
];

const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_MAX_TOKENS: usize = 1000;

/// OpenAI-compatible provider
pub struct OpenAIProvider {
    client: Client,
    config: ProviderConfig,
}

impl OpenAIProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        config.require_key()?;
        let client = http_client(&config)?;
        Ok(Self { client, config })
    }

    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or("https://api.openai.com/v1")
    }
}

#[async_trait]
impl ChatCapability for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn models(&self) -> Vec<String> {
        MODELS.iter().map(|(alias, _)| alias.to_string()).collect()
    }

    async fn complete(
        &self,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
        options: &ChatOptions,
    ) -> Result<String> {
        let api_request = OpenAIRequest {
            model: resolve_model(MODELS, model),
            messages: vec![
                OpenAIMessage {
                    role: "system".into(),
                    content: Some(system_prompt.to_string()),
                },
                OpenAIMessage {
                    role: "user".into(),
                    content: Some(user_prompt.to_string()),
                },
            ],
            temperature: options.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            response_format: options.json_mode.then(|| ResponseFormat {
                r#type: "json_object".into(),
            }),
        };

        let mut req = self
            .client
            .post(format!("{}/chat/completions", self.base_url()))
            .bearer_auth(self.config.require_key()?)
            .json(&api_request);

        for (key, value) in &self.config.headers {
            req = req.header(key, value);
        }

        log::debug!("[openai] POST chat/completions model={}", api_request.model);

        let response = req
            .send()
            .await
            .map_err(|e| network_error("openai", e).with_operation("openai::complete"))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(vendor_error("openai", status, &text).with_operation("openai::complete"));
        }

        let api_response: OpenAIResponse = response.json().await.map_err(|e| {
            Error::malformed_response(format!("unreadable OpenAI response: {}", e))
                .with_operation("openai::complete")
                .set_source(e)
        })?;

        api_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                Error::malformed_response("no choices in response")
                    .with_operation("openai::complete")
            })
    }
}

// ============================================================================
// OpenAI API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    temperature: f32,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    r#type: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}
