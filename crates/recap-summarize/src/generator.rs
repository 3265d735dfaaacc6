use std::sync::Arc;

use recap_llm::{ChatOptions, StructuredClient, StructuredRequest, TokenUsage};
use recap_persist::{Message, SummaryContent};
use serde_json::Value;

use crate::config::{ModelPricing, SummarizationConfig};
use crate::error::GenerationError;
use crate::templates::{build_summary_prompt, summary_schema, TranscriptLimits, SUMMARY_SCHEMA_NAME};

/// A validated summary plus what it cost to produce
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedSummary {
    pub summary: SummaryContent,
    pub usage: Option<TokenUsage>,
    pub cost_usd: Option<f64>,
    pub model_used: String,
}

/// Runs one structured generation over the configured candidate models
///
/// The whole cascade counts as a single attempt: it either yields a validated
/// [`SummaryContent`] or one [`GenerationError`].
pub struct SummaryGenerator {
    client: Arc<dyn StructuredClient>,
    config: Arc<SummarizationConfig>,
}

impl SummaryGenerator {
    pub fn new(client: Arc<dyn StructuredClient>, config: Arc<SummarizationConfig>) -> Self {
        Self { client, config }
    }

    pub async fn generate(
        &self,
        messages: &[Message],
        previous: Option<&SummaryContent>,
    ) -> Result<GeneratedSummary, GenerationError> {
        let candidates = &self.config.candidate_models;
        let limits = TranscriptLimits {
            max_line_chars: self.config.max_line_chars,
            max_tool_output_chars: self.config.max_tool_output_chars,
        };

        let prompt = build_summary_prompt(messages, previous, limits);
        let request = StructuredRequest::new(prompt, SUMMARY_SCHEMA_NAME, summary_schema())
            .with_models(candidates.clone())
            .with_options(
                ChatOptions::new()
                    .temperature(self.config.temperature)
                    .max_tokens(self.config.max_output_tokens),
            );

        let response = self.client.generate_structured(request).await.map_err(|e| {
            GenerationError::new(
                e.to_string(),
                candidates.len(),
                candidates.last().cloned().unwrap_or_default(),
            )
        })?;

        let summary = validate_summary(&response.output).map_err(|message| {
            GenerationError::new(message, candidates.len(), response.model.clone())
        })?;

        let cost_usd = response
            .usage
            .as_ref()
            .zip(self.config.pricing.get(&response.model))
            .map(|(usage, pricing)| estimate_cost(usage, pricing));

        Ok(GeneratedSummary {
            summary,
            usage: response.usage,
            cost_usd,
            model_used: response.model,
        })
    }
}

/// Structural checks on raw model output, then typed decoding
///
/// An empty `overview` or a non-array `key_points` is rejected outright.
pub fn validate_summary(output: &Value) -> Result<SummaryContent, String> {
    let overview = output.get("overview").and_then(Value::as_str).unwrap_or("");
    if overview.trim().is_empty() {
        return Err("Invalid summary: overview is empty".to_string());
    }

    if !output.get("key_points").is_some_and(Value::is_array) {
        return Err("Invalid summary: key_points is not a list".to_string());
    }

    serde_json::from_value(output.clone()).map_err(|e| format!("Invalid summary: {}", e))
}

pub fn estimate_cost(usage: &TokenUsage, pricing: &ModelPricing) -> f64 {
    usage.input_tokens as f64 * pricing.prompt + usage.output_tokens as f64 * pricing.completion
}
