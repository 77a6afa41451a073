//! Verdict and decision types.
//!
//! A policy answers every generation round with a [`Decision`]; the
//! [`Verdict`] is its payload-free tag, which is what the audit trail records.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Four-way outcome of a policy decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// Output is released unchanged.
    Allow,
    /// Output is replaced by the configured safe refusal.
    Block,
    /// Output is replaced by policy-supplied text.
    Modify,
    /// Output is discarded and the model is asked again.
    Requery,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Allow => write!(f, "ALLOW"),
            Verdict::Block => write!(f, "BLOCK"),
            Verdict::Modify => write!(f, "MODIFY"),
            Verdict::Requery => write!(f, "REQUERY"),
        }
    }
}

/// A verdict together with its payload.
///
/// The payload lives inside the variant that gives it meaning, so a MODIFY
/// without replacement text cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Block,
    /// Replace the model output with `output`.
    Modify { output: String },
    /// Generate again. `revised_prompt` is used verbatim when present and
    /// non-empty; otherwise the runner falls back to its own rephrasing.
    Requery { revised_prompt: Option<String> },
}

impl Decision {
    pub fn modify(output: impl Into<String>) -> Self {
        Decision::Modify {
            output: output.into(),
        }
    }

    pub fn requery(revised_prompt: impl Into<String>) -> Self {
        Decision::Requery {
            revised_prompt: Some(revised_prompt.into()),
        }
    }

    /// The payload-free tag of this decision.
    pub fn verdict(&self) -> Verdict {
        match self {
            Decision::Allow => Verdict::Allow,
            Decision::Block => Verdict::Block,
            Decision::Modify { .. } => Verdict::Modify,
            Decision::Requery { .. } => Verdict::Requery,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_serialization() {
        let json = serde_json::to_string(&Verdict::Requery).unwrap();
        assert_eq!(json, "\"REQUERY\"");

        let parsed: Verdict = serde_json::from_str("\"BLOCK\"").unwrap();
        assert_eq!(parsed, Verdict::Block);
    }

    #[test]
    fn test_display_matches_serialized_form() {
        for verdict in [Verdict::Allow, Verdict::Block, Verdict::Modify, Verdict::Requery] {
            let json = serde_json::to_string(&verdict).unwrap();
            assert_eq!(json, format!("\"{verdict}\""));
        }
    }

    #[test]
    fn test_decision_verdict() {
        assert_eq!(Decision::modify("x").verdict(), Verdict::Modify);
        assert_eq!(Decision::requery("again").verdict(), Verdict::Requery);
        assert_eq!(
            Decision::Requery {
                revised_prompt: None
            }
            .verdict(),
            Verdict::Requery
        );
    }
}
