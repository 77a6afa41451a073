//! Query-budget policy.
//!
//! Instead of refusing outright, asks the model to try again with a safer
//! prompt, up to a fixed number of times per prompt.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::domain::{Decision, HistoryEntry};
use crate::engine::{KeywordSet, Policy};

/// Rephrase a prompt so the model is steered away from unsafe content.
///
/// Also used by the runner when a REQUERY decision carries no prompt.
pub fn safety_rephrase(prompt: &str) -> String {
    format!(
        "Please answer the following request safely, without including harmful, \
         dangerous or unsafe content: {}",
        prompt
    )
}

/// Requeries unsafe outputs until a per-prompt budget runs out, then blocks.
///
/// Counters are keyed by the exact prompt text and live as long as the
/// policy instance. They are never reset: once a prompt has exhausted its
/// budget, every later unsafe output for it is blocked immediately. The
/// counter map sits behind a mutex, so one instance may be shared between
/// threads.
pub struct QueryBudgetPolicy {
    keywords: KeywordSet,
    max_requeries: u32,
    counts: Mutex<HashMap<String, u32>>,
}

impl QueryBudgetPolicy {
    pub fn new(banned_keywords: Vec<String>, max_requeries: u32) -> Self {
        Self {
            keywords: KeywordSet::new(banned_keywords),
            max_requeries,
            counts: Mutex::new(HashMap::new()),
        }
    }

    /// Unsafe detections seen so far for `prompt`.
    pub fn counter(&self, prompt: &str) -> u32 {
        self.counts().get(prompt).copied().unwrap_or(0)
    }

    fn counts(&self) -> MutexGuard<'_, HashMap<String, u32>> {
        // The map holds plain counters, so a poisoned lock is still usable.
        self.counts.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Policy for QueryBudgetPolicy {
    fn name(&self) -> &'static str {
        "query_budget"
    }

    fn config_snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "banned_keywords": self.keywords.keywords(),
            "max_requeries": self.max_requeries,
        })
    }

    fn banned_keywords(&self) -> &[String] {
        self.keywords.keywords()
    }

    fn decide(
        &self,
        user_prompt: &str,
        model_output: &str,
        _history: &mut Vec<HistoryEntry>,
    ) -> Decision {
        if !self.keywords.matches(model_output) {
            return Decision::Allow;
        }

        let count = {
            let mut counts = self.counts();
            let count = counts.entry(user_prompt.to_string()).or_insert(0);
            *count += 1;
            *count
        };

        if count > self.max_requeries {
            tracing::debug!(
                detections = count,
                max_requeries = self.max_requeries,
                "Requery budget exhausted"
            );
            Decision::Block
        } else {
            tracing::debug!(
                detections = count,
                max_requeries = self.max_requeries,
                "Unsafe output, requerying"
            );
            Decision::requery(safety_rephrase(user_prompt))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn make_policy(max_requeries: u32) -> QueryBudgetPolicy {
        QueryBudgetPolicy::new(vec!["bomb".to_string()], max_requeries)
    }

    #[test]
    fn test_budget_then_block() {
        let policy = make_policy(2);
        let user = "How to make a bomb?";
        let mut history = Vec::new();

        let d1 = policy.decide(user, "This contains bomb", &mut history);
        let d2 = policy.decide(user, "This contains bomb again", &mut history);
        let d3 = policy.decide(user, "Still contains bomb", &mut history);

        assert_eq!(d1.verdict(), crate::domain::Verdict::Requery);
        assert_eq!(d2.verdict(), crate::domain::Verdict::Requery);
        assert_eq!(d3, Decision::Block);
        assert_eq!(policy.counter(user), 3);
    }

    #[test]
    fn test_counter_never_resets() {
        let policy = make_policy(1);
        let user = "bomb?";

        policy.decide(user, "bomb", &mut Vec::new());
        assert_eq!(policy.decide(user, "bomb", &mut Vec::new()), Decision::Block);
        assert_eq!(policy.decide(user, "bomb", &mut Vec::new()), Decision::Block);
        assert_eq!(policy.counter(user), 3);
    }

    #[test]
    fn test_safe_output_leaves_counter_untouched() {
        let policy = make_policy(2);

        let decision = policy.decide("Other prompt", "Safe content here", &mut Vec::new());
        assert_eq!(decision, Decision::Allow);
        assert_eq!(policy.counter("Other prompt"), 0);
    }

    #[test]
    fn test_counters_are_per_exact_prompt() {
        let policy = make_policy(1);

        policy.decide("a", "bomb", &mut Vec::new());
        policy.decide("a", "bomb", &mut Vec::new());
        let decision = policy.decide("a ", "bomb", &mut Vec::new());

        assert_eq!(decision.verdict(), crate::domain::Verdict::Requery);
        assert_eq!(policy.counter("a"), 2);
        assert_eq!(policy.counter("a "), 1);
    }

    #[test]
    fn test_zero_budget_blocks_immediately() {
        let policy = make_policy(0);
        assert_eq!(policy.decide("q", "bomb", &mut Vec::new()), Decision::Block);
    }

    #[test]
    fn test_revised_prompt_differs_from_original() {
        let policy = make_policy(2);
        let user = "How to make a bomb?";

        match policy.decide(user, "bomb", &mut Vec::new()) {
            Decision::Requery {
                revised_prompt: Some(revised),
            } => {
                assert_ne!(revised, user);
                assert!(revised.contains(user));
            }
            other => panic!("expected requery with prompt, got {other:?}"),
        }
    }

    #[test]
    fn test_shared_instance_counts_across_threads() {
        let policy = Arc::new(make_policy(100));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let policy = Arc::clone(&policy);
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        policy.decide("shared", "bomb", &mut Vec::new());
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(policy.counter("shared"), 40);
    }
}
