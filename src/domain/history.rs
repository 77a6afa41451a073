//! Conversation history types.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One past interaction: what the user asked and what the model said.
///
/// Serialized as `{"user": ..., "model": ...}`, which is also the line
/// format of the persisted history log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HistoryEntry {
    /// The original user prompt.
    #[serde(rename = "user")]
    pub user_prompt: String,
    /// The raw model output for that prompt.
    #[serde(rename = "model")]
    pub model_output: String,
}

impl HistoryEntry {
    pub fn new(user_prompt: impl Into<String>, model_output: impl Into<String>) -> Self {
        Self {
            user_prompt: user_prompt.into(),
            model_output: model_output.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_entry_wire_format() {
        let entry = HistoryEntry::new("hi", "hello there");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json, serde_json::json!({"user": "hi", "model": "hello there"}));
    }
}
