//! History-aware policy.
//!
//! Judges the recent conversation window rather than a single output, so a
//! banned keyword keeps blocking until it has aged out of the window.

use crate::domain::{Decision, HistoryEntry};
use crate::engine::{KeywordSet, Policy};
use crate::error::{WrapperError, WrapperResult};

/// Blocks while any output in the retained window contains a banned keyword.
pub struct HistoryAwarePolicy {
    keywords: KeywordSet,
    history_limit: usize,
}

impl HistoryAwarePolicy {
    /// Create a policy keeping the `history_limit` most recent entries.
    ///
    /// A limit of zero would leave nothing to inspect and is rejected.
    pub fn new(banned_keywords: Vec<String>, history_limit: usize) -> WrapperResult<Self> {
        if history_limit == 0 {
            return Err(WrapperError::Config(
                "history_limit must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            keywords: KeywordSet::new(banned_keywords),
            history_limit,
        })
    }
}

impl Policy for HistoryAwarePolicy {
    fn name(&self) -> &'static str {
        "history_based"
    }

    fn config_snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "banned_keywords": self.keywords.keywords(),
            "history_limit": self.history_limit,
        })
    }

    fn banned_keywords(&self) -> &[String] {
        self.keywords.keywords()
    }

    /// Appends the current exchange to `history`, then evicts the oldest
    /// entries until at most `history_limit` remain.
    fn decide(
        &self,
        user_prompt: &str,
        model_output: &str,
        history: &mut Vec<HistoryEntry>,
    ) -> Decision {
        history.push(HistoryEntry::new(user_prompt, model_output));
        if history.len() > self.history_limit {
            let excess = history.len() - self.history_limit;
            history.drain(..excess);
        }

        let flagged = history
            .iter()
            .find_map(|entry| self.keywords.first_match(&entry.model_output));

        match flagged {
            Some(keyword) => {
                tracing::debug!(
                    keyword = %keyword,
                    window = history.len(),
                    "Banned keyword in history window"
                );
                Decision::Block
            }
            None => Decision::Allow,
        }
    }
}
