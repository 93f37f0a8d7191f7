//! Google Gemini provider
//!
//! Gemini has no system role in `generateContent`; the system prompt is
//! prepended to the user text.

use super::*;
use serde::{Deserialize, Serialize};

const MODELS: &[(&str, &str)] = &[
    ("Gemini-Pro", "gemini-pro"),
    ("Gemini-1.5-Pro", "gemini-1.5-pro"),
    ("Gemini-1.5-Flash", "gemini-1.5-flash"),
];

const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1024;

pub struct GeminiProvider {
    client: Client,
    config: ProviderConfig,
}

impl GeminiProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        config.require_key()?;
        let client = http_client(&config)?;
        Ok(Self { client, config })
    }

    fn api_url(&self, model: &str) -> String {
        let base = self
            .config
            .base_url
            .as_deref()
            .unwrap_or("https://generativelanguage.googleapis.com/v1beta");
        format!("{}/models/{}:generateContent", base, model)
    }

    fn build_request(system_prompt: &str, user_prompt: &str, options: &ChatOptions) -> GeminiRequest {
        let text = if system_prompt.is_empty() {
            user_prompt.to_string()
        } else {
            format!("{}\n\n{}", system_prompt, user_prompt)
        };

        GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".into()),
                parts: vec![GeminiPart { text }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: options.temperature,
                max_output_tokens: options
                    .max_tokens
                    .map(|n| n as u32)
                    .unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS),
                response_mime_type: options.json_mode.then(|| "application/json".to_string()),
            },
        }
    }
}

#[async_trait]
impl ChatCapability for GeminiProvider {
    fn name(&self) -> &str {
        "google"
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
        let model = resolve_model(MODELS, model);
        let api_request = Self::build_request(system_prompt, user_prompt, options);

        let mut req = self
            .client
            .post(self.api_url(&model))
            .query(&[("key", self.config.require_key()?)])
            .json(&api_request);

        for (key, value) in &self.config.headers {
            req = req.header(key, value);
        }

        log::debug!("[gemini] POST generateContent model={}", model);

        let response = req
            .send()
            .await
            .map_err(|e| network_error("google", e).with_operation("gemini::complete"))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(vendor_error("google", status, &text).with_operation("gemini::complete"));
        }

        let api_response: GeminiResponse = response.json().await.map_err(|e| {
            Error::malformed_response(format!("unreadable Gemini response: {}", e))
                .with_operation("gemini::complete")
                .set_source(e)
        })?;

        let text: String = api_response
            .candidates
            .first()
            .map(|c| c.content.parts.iter().map(|p| p.text.as_str()).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(Error::malformed_response("no candidates in response")
                .with_operation("gemini::complete"));
        }
        Ok(text)
    }
}

// ============================================================================
// Gemini API Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    /// Parts may be missing if the response was truncated
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}
