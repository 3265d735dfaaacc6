use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// USD per token
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    pub prompt: f64,
    pub completion: f64,
}

/// Policy constants for triggering, range selection and generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizationConfig {
    /// Auto-trigger once this many messages arrived since the last summary
    pub auto_message_threshold: u64,
    /// Auto-trigger once this many estimated tokens arrived since the last summary
    pub auto_token_threshold: u64,
    /// Minimum range size for a manual run
    pub min_messages: usize,
    /// Tails shorter than this are widened to the last `fallback_window` messages
    pub fallback_window: usize,
    /// Tried in order; the first is recorded as the model of an in-flight record
    pub candidate_models: Vec<String>,
    pub temperature: f32,
    pub max_output_tokens: u32,
    /// Per-message transcript line cap, in characters
    pub max_line_chars: usize,
    /// Per-tool-result transcript cap, in characters
    pub max_tool_output_chars: usize,
    /// Records returned by `get_thread_summaries`
    pub history_limit: usize,
    /// Completed records returned for context assembly
    pub context_limit: usize,
    /// `generating` records older than this are failed by the sweep
    pub stale_after_secs: u64,
    pub pricing: HashMap<String, ModelPricing>,
}

impl Default for SummarizationConfig {
    fn default() -> Self {
        let candidate_models = vec![
            "meta-llama/llama-3.3-70b-instruct:free".to_string(),
            "openai/gpt-4o-mini".to_string(),
            "anthropic/claude-3.5-haiku".to_string(),
        ];

        let pricing = HashMap::from([
            (
                candidate_models[0].clone(),
                ModelPricing { prompt: 0.0, completion: 0.0 },
            ),
            (
                candidate_models[1].clone(),
                ModelPricing { prompt: 0.000_000_15, completion: 0.000_000_6 },
            ),
            (
                candidate_models[2].clone(),
                ModelPricing { prompt: 0.000_000_8, completion: 0.000_004 },
            ),
        ]);

        Self {
            auto_message_threshold: 20,
            auto_token_threshold: 8_000,
            min_messages: 4,
            fallback_window: 4,
            candidate_models,
            temperature: 0.3,
            max_output_tokens: 2_000,
            max_line_chars: 1_500,
            max_tool_output_chars: 300,
            history_limit: 10,
            context_limit: 2,
            stale_after_secs: 600,
            pricing,
        }
    }
}

impl SummarizationConfig {
    pub fn with_candidate_models(mut self, models: Vec<String>) -> Self {
        self.candidate_models = models;
        self
    }

    pub fn with_auto_thresholds(mut self, messages: u64, tokens: u64) -> Self {
        self.auto_message_threshold = messages;
        self.auto_token_threshold = tokens;
        self
    }

    pub fn with_pricing(mut self, model: impl Into<String>, pricing: ModelPricing) -> Self {
        self.pricing.insert(model.into(), pricing);
        self
    }

    /// Model stamped on a record before generation runs
    pub fn primary_model(&self) -> &str {
        self.candidate_models.first().map(String::as_str).unwrap_or("")
    }

    pub fn stale_after(&self) -> chrono::Duration {
        let secs = i64::try_from(self.stale_after_secs).unwrap_or(i64::MAX);
        chrono::Duration::try_seconds(secs).unwrap_or(chrono::Duration::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SummarizationConfig::default();
        assert_eq!(config.min_messages, 4);
        assert_eq!(config.fallback_window, 4);
        assert_eq!(config.history_limit, 10);
        assert_eq!(config.context_limit, 2);
        assert_eq!(config.candidate_models.len(), 3);
        assert_eq!(config.primary_model(), "meta-llama/llama-3.3-70b-instruct:free");
        assert!(config.pricing.contains_key("openai/gpt-4o-mini"));
    }

    #[test]
    fn test_partial_deserialization_keeps_defaults() {
        let config: SummarizationConfig =
            serde_json::from_str(r#"{"auto_message_threshold": 5, "candidate_models": ["x"]}"#).unwrap();
        assert_eq!(config.auto_message_threshold, 5);
        assert_eq!(config.auto_token_threshold, 8_000);
        assert_eq!(config.primary_model(), "x");
    }

    #[test]
    fn test_stale_after() {
        let config = SummarizationConfig {
            stale_after_secs: 90,
            ..Default::default()
        };
        assert_eq!(config.stale_after(), chrono::Duration::seconds(90));
    }
}
