//! Baseline policy.

use crate::domain::{Decision, HistoryEntry};
use crate::engine::Policy;

/// Allows every output. Used as the control arm of an evaluation.
pub struct NoOpPolicy;

impl Policy for NoOpPolicy {
    fn name(&self) -> &'static str {
        "no_op"
    }

    fn config_snapshot(&self) -> serde_json::Value {
        serde_json::json!({})
    }

    fn decide(
        &self,
        _user_prompt: &str,
        _model_output: &str,
        _history: &mut Vec<HistoryEntry>,
    ) -> Decision {
        Decision::Allow
    }
}
