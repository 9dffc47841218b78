use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::{info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::config::ProviderConfig;
use crate::llm_manager::LLMProvider;

/// Reply used when the response carries no candidate text.
pub const NO_PLAN_REPLY: &str = "🤷 Couldn't generate a meal plan. Try rephrasing.";

/// Gemini `generateContent` provider
pub struct GeminiProvider {
    api_key: String,
    model: String,
    base_url: String,
    max_output_tokens: usize,
    temperature: f32,
    client: Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<usize>,
    candidates_token_count: Option<usize>,
    total_token_count: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorDetails,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetails {
    message: String,
    #[allow(dead_code)]
    status: Option<String>,
}

impl GeminiProvider {
    /// Build a provider from config. The key comes from the config file or
    /// the GEMINI_API_KEY environment variable.
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let api_key = match &config.api_key {
            Some(key) => key.clone(),
            None => env::var("GEMINI_API_KEY")
                .context("GEMINI_API_KEY environment variable not set")?,
        };
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_output_tokens: config.max_output_tokens,
            temperature: config.temperature,
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn build_request(&self, prompt: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        }
    }

    /// Turn a raw HTTP reply into the model's text.
    ///
    /// Non-2xx statuses and unparsable bodies are errors; a well-formed
    /// body without candidate text yields `NO_PLAN_REPLY`.
    fn parse_reply(&self, status: reqwest::StatusCode, body: &str) -> Result<String> {
        if !status.is_success() {
            return Err(upstream_error(status, body));
        }

        let gemini_response: GenerateContentResponse =
            serde_json::from_str(body).context("Failed to parse Gemini response")?;

        if let Some(candidate) = gemini_response.candidates.first() {
            if candidate.finish_reason.as_deref() == Some("MAX_TOKENS") {
                warn!(
                    "Gemini response was truncated at {} output tokens",
                    self.max_output_tokens
                );
            }
        }

        if let Some(usage) = &gemini_response.usage_metadata {
            info!(
                "Gemini token usage - Prompt: {}, Completion: {}, Total: {}",
                usage.prompt_token_count.unwrap_or(0),
                usage.candidates_token_count.unwrap_or(0),
                usage.total_token_count.unwrap_or(0)
            );
        }

        Ok(extract_reply(&gemini_response)
            .filter(|text| !text.is_empty())
            .unwrap_or(NO_PLAN_REPLY)
            .to_string())
    }
}

/// Pull `candidates[0].content.parts[0].text` out of a response body.
fn extract_reply(response: &GenerateContentResponse) -> Option<&str> {
    response
        .candidates
        .first()?
        .content
        .as_ref()?
        .parts
        .first()?
        .text
        .as_deref()
}

/// Error text for a failed call: the upstream `error.message` when the
/// body carries one, else the status and raw body.
fn upstream_error(status: reqwest::StatusCode, body: &str) -> anyhow::Error {
    match serde_json::from_str::<GeminiError>(body) {
        Ok(error_response) => anyhow!("{}", error_response.error.message),
        Err(_) => anyhow!("Request failed with status {}: {}", status, body.trim()),
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    fn name(&self) -> &str {
        "Gemini"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn send_prompt(&self, prompt: &str) -> Result<String> {
        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .header("Content-Type", "application/json")
            .json(&self.build_request(prompt))
            .send()
            .await
            .map_err(|e| anyhow!("{}", e.without_url()))?;

        let status = response.status();
        let response_text = response.text().await?;
        self.parse_reply(status, &response_text)
    }
}
