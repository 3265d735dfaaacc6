use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::traits::{
    ChatClient, ChatRequest, ResponseFormat, StructuredClient, StructuredRequest,
    StructuredResponse,
};
use crate::types::Message;

/// Structured generation over a [`ChatClient`], falling back through candidate models
///
/// A candidate fails when the request errors, the response has no content, or the
/// content is not valid JSON. The first candidate that yields JSON wins.
pub struct CascadeClient {
    chat_client: Arc<dyn ChatClient>,
}

impl CascadeClient {
    pub fn new(chat_client: Arc<dyn ChatClient>) -> Self {
        Self { chat_client }
    }

    async fn attempt(
        &self,
        model: &str,
        request: &StructuredRequest,
    ) -> Result<StructuredResponse> {
        let options = request
            .options
            .clone()
            .response_format(ResponseFormat::json_schema(
                request.schema_name.clone(),
                request.schema.clone(),
            ));
        let chat_request = ChatRequest::new(model, vec![Message::user(request.prompt.clone())])
            .with_options(options);

        let response = self.chat_client.chat(chat_request).await?;
        let content = response
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("empty response"))?;
        let output = parse_json_output(&content)?;

        Ok(StructuredResponse {
            output,
            usage: response.usage,
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl StructuredClient for CascadeClient {
    async fn generate_structured(&self, request: StructuredRequest) -> Result<StructuredResponse> {
        if request.models.is_empty() {
            anyhow::bail!("No candidate models configured");
        }

        let mut failures = Vec::with_capacity(request.models.len());
        for model in &request.models {
            match self.attempt(model, &request).await {
                Ok(response) => {
                    tracing::info!(
                        model = %model,
                        attempts = failures.len() + 1,
                        "Structured generation succeeded"
                    );
                    return Ok(response);
                }
                Err(e) => {
                    tracing::warn!(
                        model = %model,
                        error = %e,
                        "Candidate model failed, trying next"
                    );
                    failures.push(format!("{}: {}", model, e));
                }
            }
        }

        anyhow::bail!(
            "All {} candidate models failed: {}",
            failures.len(),
            failures.join("; ")
        )
    }
}

/// Parse model output as JSON, tolerating a surrounding markdown code fence
fn parse_json_output(content: &str) -> Result<Value> {
    let trimmed = content.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);

    serde_json::from_str(unfenced.trim())
        .map_err(|e| anyhow::anyhow!("invalid JSON output: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let value = parse_json_output(r#"{"overview": "ok"}"#).unwrap();
        assert_eq!(value["overview"], "ok");
    }

    #[test]
    fn test_parse_fenced_json() {
        let value = parse_json_output("```json\n{\"overview\": \"ok\"}\n```").unwrap();
        assert_eq!(value["overview"], "ok");
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(parse_json_output("Here is your summary!").is_err());
    }
}
