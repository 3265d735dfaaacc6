use std::fmt;

use recap_persist::{Thread, TriggerType};
use serde::{Serialize, Serializer};

use crate::config::SummarizationConfig;
use crate::range::ComputedRange;

/// Why a trigger was refused. Refusals are values, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyInProgress,
    NotEnoughMessages,
    NoMessages,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AlreadyInProgress => "already in progress",
            Self::NotEnoughMessages => "not enough messages",
            Self::NoMessages => "no messages",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SkipReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Decides whether a summarization run may start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerPolicy {
    pub auto_message_threshold: u64,
    pub auto_token_threshold: u64,
    pub min_messages: usize,
}

impl TriggerPolicy {
    pub fn from_config(config: &SummarizationConfig) -> Self {
        Self {
            auto_message_threshold: config.auto_message_threshold,
            auto_token_threshold: config.auto_token_threshold,
            min_messages: config.min_messages,
        }
    }

    /// Counter thresholds for the automatic path
    pub fn should_auto_trigger(&self, thread: &Thread) -> bool {
        thread.messages_since_last_summary >= self.auto_message_threshold
            || thread.tokens_since_last_summary >= self.auto_token_threshold
    }

    /// Single-flight gate, checked before anything else
    pub fn check_in_flight(&self, in_progress: bool) -> Result<(), SkipReason> {
        if in_progress {
            Err(SkipReason::AlreadyInProgress)
        } else {
            Ok(())
        }
    }

    /// Range preconditions; only manual runs enforce the minimum size
    pub fn check_range(
        &self,
        trigger: TriggerType,
        range: Option<&ComputedRange>,
    ) -> Result<(), SkipReason> {
        let range = range.ok_or(SkipReason::NoMessages)?;
        if trigger == TriggerType::Manual && range.message_count() < self.min_messages {
            return Err(SkipReason::NotEnoughMessages);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recap_persist::{MessageRange, ThreadMetadata};

    fn policy() -> TriggerPolicy {
        TriggerPolicy {
            auto_message_threshold: 20,
            auto_token_threshold: 8_000,
            min_messages: 4,
        }
    }

    fn computed(count: usize) -> ComputedRange {
        ComputedRange {
            range: MessageRange {
                from_message_id: "a".to_string(),
                to_message_id: "b".to_string(),
                message_count: count,
                from_index: 0,
                to_index: count.saturating_sub(1),
            },
            source_token_count: 10,
        }
    }

    #[test]
    fn test_auto_trigger_thresholds() {
        let mut thread = Thread::new("u", ThreadMetadata::default());
        assert!(!policy().should_auto_trigger(&thread));

        thread.messages_since_last_summary = 20;
        assert!(policy().should_auto_trigger(&thread));

        thread.messages_since_last_summary = 3;
        thread.tokens_since_last_summary = 8_000;
        assert!(policy().should_auto_trigger(&thread));

        thread.tokens_since_last_summary = 7_999;
        assert!(!policy().should_auto_trigger(&thread));
    }

    #[test]
    fn test_in_flight_refusal() {
        assert_eq!(policy().check_in_flight(true), Err(SkipReason::AlreadyInProgress));
        assert_eq!(policy().check_in_flight(false), Ok(()));
    }

    #[test]
    fn test_range_checks() {
        let p = policy();
        assert_eq!(p.check_range(TriggerType::Manual, None), Err(SkipReason::NoMessages));
        assert_eq!(
            p.check_range(TriggerType::Manual, Some(&computed(3))),
            Err(SkipReason::NotEnoughMessages)
        );
        assert_eq!(p.check_range(TriggerType::Manual, Some(&computed(4))), Ok(()));
        assert_eq!(p.check_range(TriggerType::Auto, Some(&computed(2))), Ok(()));
        assert_eq!(p.check_range(TriggerType::Auto, None), Err(SkipReason::NoMessages));
    }

    #[test]
    fn test_reason_strings() {
        assert_eq!(SkipReason::AlreadyInProgress.to_string(), "already in progress");
        assert_eq!(
            serde_json::to_value(SkipReason::NotEnoughMessages).unwrap(),
            serde_json::json!("not enough messages")
        );
    }
}
