// OpenAI-compatible client implementation (OpenAI, OpenRouter, and other gateways)

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::traits::{ChatClient, ChatOptions, ChatRequest, ChatResponse, TokenUsage};
use crate::types::Message;

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";

/// OpenAI-compatible client (HTTP direct, no SDK)
pub struct OpenAIClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl OpenAIClient {
    /// Create new client with API key
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .context("Invalid API key format")?,
        );

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            base_url: OPENAI_API_BASE.to_string(),
        })
    }

    /// Point the client at another OpenAI-compatible endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build chat completion request payload
    fn build_chat_request(
        &self,
        model: &str,
        messages: &[Message],
        options: &ChatOptions,
    ) -> Result<Value> {
        let mut obj = Map::new();
        obj.insert("model".to_string(), serde_json::json!(model));
        obj.insert("messages".to_string(), serde_json::to_value(messages)?);
        obj.insert("stream".to_string(), Value::Bool(false));

        // o1 and gpt-5 models use different parameter names
        let reasoning = is_reasoning_model(model);

        if let Some(temp) = options.temperature {
            if !reasoning {
                obj.insert("temperature".to_string(), serde_json::json!(temp));
            }
        }
        if let Some(max_tokens) = options.max_tokens {
            let token_field = if reasoning {
                "max_completion_tokens"
            } else {
                "max_tokens"
            };
            obj.insert(token_field.to_string(), serde_json::json!(max_tokens));
        }
        if let Some(format) = &options.response_format {
            obj.insert("response_format".to_string(), serde_json::to_value(format)?);
        }

        Ok(Value::Object(obj))
    }
}

/// Matches bare and gateway-prefixed ids (`gpt-5-mini`, `openai/o1-preview`)
fn is_reasoning_model(model: &str) -> bool {
    let name = model.rsplit('/').next().unwrap_or(model);
    name.starts_with("o1") || name.starts_with("o3") || name.starts_with("gpt-5")
}

// ============================================================================
// TRAIT IMPLEMENTATIONS
// ============================================================================

#[async_trait]
impl ChatClient for OpenAIClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let payload = self.build_chat_request(&request.model, &request.messages, &request.options)?;

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&payload)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI API error ({}): {}", status, error_text);
        }

        let raw: OpenAIChatResponse = response
            .json()
            .await
            .context("Failed to parse response")?;

        // Gateways report upstream failures inside a 200 body
        if let Some(error) = &raw.error {
            anyhow::bail!("Provider error: {}", error.message);
        }

        let choice = raw.choices.first();
        Ok(ChatResponse {
            content: choice.and_then(|c| c.message.content.clone()),
            usage: raw.usage.map(|u| TokenUsage {
                total_tokens: if u.total_tokens == 0 {
                    u.input_tokens + u.output_tokens
                } else {
                    u.total_tokens
                },
                ..u
            }),
            finish_reason: choice.and_then(|c| c.finish_reason.clone()),
            model: raw.model.clone(),
            raw: serde_json::to_value(&raw)?,
        })
    }
}

// ============================================================================
// OPENAI-SPECIFIC RESPONSE TYPES (for Chat Completions)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIChatResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<TokenUsage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ProviderError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Choice {
    #[serde(default)]
    pub index: u32,
    pub message: ResponseMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ResponseMessage {
    pub role: String,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProviderError {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ResponseFormat;

    #[test]
    fn test_build_chat_request_with_schema() {
        let client = OpenAIClient::new("sk-test").unwrap();
        let options = ChatOptions::new()
            .temperature(0.3)
            .max_tokens(500)
            .response_format(ResponseFormat::json_schema(
                "summary",
                serde_json::json!({"type": "object"}),
            ));

        let payload = client
            .build_chat_request("openai/gpt-4o-mini", &[Message::user("Hi")], &options)
            .unwrap();

        assert_eq!(payload["model"], "openai/gpt-4o-mini");
        assert_eq!(payload["max_tokens"], 500);
        assert_eq!(payload["response_format"]["type"], "json_schema");
        assert_eq!(payload["response_format"]["json_schema"]["name"], "summary");
        assert_eq!(payload["response_format"]["json_schema"]["strict"], true);
        assert_eq!(payload["messages"][0]["role"], "user");
        assert_eq!(payload["messages"][0]["content"], "Hi");
    }

    #[test]
    fn test_reasoning_models_skip_temperature() {
        let client = OpenAIClient::new("sk-test").unwrap();
        let options = ChatOptions::new().temperature(0.3).max_tokens(100);

        let payload = client
            .build_chat_request("gpt-5-mini", &[Message::user("Hi")], &options)
            .unwrap();

        assert!(payload.get("temperature").is_none());
        assert_eq!(payload["max_completion_tokens"], 100);

        assert!(is_reasoning_model("openai/o1-preview"));
        assert!(!is_reasoning_model("openai/gpt-4o-mini"));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = OpenAIClient::new("sk-test")
            .unwrap()
            .with_base_url("https://openrouter.ai/api/v1/");
        assert_eq!(client.base_url(), OPENROUTER_API_BASE);
    }
}
