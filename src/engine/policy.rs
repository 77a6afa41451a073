//! Policy contract and factory.
//!
//! A policy judges each raw model output and answers with a [`Decision`].
//! The set of policies is closed; [`PolicyKind`] names them and
//! [`build_policy`] is the only way configuration turns into a policy.

use serde::Serialize;

use crate::config::SafetyConfig;
use crate::domain::{Decision, HistoryEntry};
use crate::engine::{
    HistoryAwarePolicy, KeywordFilterPolicy, NoOpPolicy, QueryBudgetPolicy, RedactPolicy,
};
use crate::error::{WrapperError, WrapperResult};

/// Trait for safety policy implementations.
///
/// `history` is the caller's conversation window. Implementations may append
/// to it and truncate it in place, and callers must expect it to have changed
/// after every call.
///
/// Implementations that return REQUERY must eventually stop doing so for any
/// fixed prompt; the runner does not bound the loop on their behalf unless a
/// hard cap is configured.
pub trait Policy: Send + Sync {
    /// Canonical policy name, as written to the audit log.
    fn name(&self) -> &'static str;

    /// Parameters this policy was built with.
    fn config_snapshot(&self) -> serde_json::Value;

    /// Keywords this policy screens for.
    fn banned_keywords(&self) -> &[String] {
        &[]
    }

    /// Judge one model output produced for `user_prompt`.
    fn decide(
        &self,
        user_prompt: &str,
        model_output: &str,
        history: &mut Vec<HistoryEntry>,
    ) -> Decision;
}

/// Immutable parameters shared by all policies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyConfig {
    pub banned_keywords: Vec<String>,
    pub history_limit: usize,
    pub max_requeries: u32,
}

impl PolicyConfig {
    /// Reject values no policy can work with.
    pub fn validate(&self) -> WrapperResult<()> {
        if self.banned_keywords.iter().any(|kw| kw.trim().is_empty()) {
            return Err(WrapperError::Config(
                "banned_keywords must not contain empty entries".to_string(),
            ));
        }
        Ok(())
    }
}

impl From<&SafetyConfig> for PolicyConfig {
    fn from(config: &SafetyConfig) -> Self {
        Self {
            banned_keywords: config.banned_keywords.clone(),
            history_limit: config.history_limit,
            max_requeries: config.max_requeries,
        }
    }
}

/// The closed set of available policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    NoOp,
    KeywordFilter,
    HistoryAware,
    QueryBudget,
    Redact,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 5] = [
        PolicyKind::NoOp,
        PolicyKind::KeywordFilter,
        PolicyKind::HistoryAware,
        PolicyKind::QueryBudget,
        PolicyKind::Redact,
    ];
}

impl std::fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyKind::NoOp => write!(f, "no_op"),
            PolicyKind::KeywordFilter => write!(f, "keyword_filter"),
            PolicyKind::HistoryAware => write!(f, "history_based"),
            PolicyKind::QueryBudget => write!(f, "query_budget"),
            PolicyKind::Redact => write!(f, "redact"),
        }
    }
}

impl std::str::FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "no_op" | "noop" | "baseline" => Ok(PolicyKind::NoOp),
            "keyword_filter" | "keyword" => Ok(PolicyKind::KeywordFilter),
            "history_based" | "history_aware" | "history" => Ok(PolicyKind::HistoryAware),
            "query_budget" => Ok(PolicyKind::QueryBudget),
            "redact" => Ok(PolicyKind::Redact),
            _ => Err(format!(
                "Unknown policy: {}. Use no_op, keyword_filter, history_based, query_budget or redact",
                s
            )),
        }
    }
}

/// Build a policy instance from its kind and parameters.
pub fn build_policy(kind: PolicyKind, config: &PolicyConfig) -> WrapperResult<Box<dyn Policy>> {
    config.validate()?;

    let policy: Box<dyn Policy> = match kind {
        PolicyKind::NoOp => Box::new(NoOpPolicy),
        PolicyKind::KeywordFilter => {
            Box::new(KeywordFilterPolicy::new(config.banned_keywords.clone()))
        }
        PolicyKind::HistoryAware => Box::new(HistoryAwarePolicy::new(
            config.banned_keywords.clone(),
            config.history_limit,
        )?),
        PolicyKind::QueryBudget => Box::new(QueryBudgetPolicy::new(
            config.banned_keywords.clone(),
            config.max_requeries,
        )),
        PolicyKind::Redact => Box::new(RedactPolicy::new(config.banned_keywords.clone())),
    };

    tracing::debug!(policy = policy.name(), "Policy constructed");
    Ok(policy)
}

/// Parse a policy name and build it.
pub fn build_policy_by_name(name: &str, config: &PolicyConfig) -> WrapperResult<Box<dyn Policy>> {
    let kind = name.parse::<PolicyKind>().map_err(WrapperError::Config)?;
    build_policy(kind, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config() -> PolicyConfig {
        PolicyConfig {
            banned_keywords: vec!["bomb".to_string()],
            history_limit: 3,
            max_requeries: 2,
        }
    }

    #[test]
    fn test_policy_kind_aliases() {
        assert_eq!("baseline".parse::<PolicyKind>(), Ok(PolicyKind::NoOp));
        assert_eq!("keyword".parse::<PolicyKind>(), Ok(PolicyKind::KeywordFilter));
        assert_eq!("history".parse::<PolicyKind>(), Ok(PolicyKind::HistoryAware));
        assert_eq!("Query_Budget".parse::<PolicyKind>(), Ok(PolicyKind::QueryBudget));
    }

    #[test]
    fn test_policy_kind_display_round_trips() {
        for kind in PolicyKind::ALL {
            assert_eq!(kind.to_string().parse::<PolicyKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_build_every_policy() {
        for kind in PolicyKind::ALL {
            let policy = build_policy(kind, &make_config()).unwrap();
            assert_eq!(policy.name(), kind.to_string());
        }
    }

    #[test]
    fn test_unknown_policy_is_config_error() {
        let result = build_policy_by_name("sentiment", &make_config());
        assert!(matches!(result, Err(WrapperError::Config(_))));
    }

    #[test]
    fn test_empty_keyword_rejected() {
        let mut config = make_config();
        config.banned_keywords.push("  ".to_string());

        let result = build_policy(PolicyKind::KeywordFilter, &config);
        assert!(matches!(result, Err(WrapperError::Config(_))));
    }

    #[test]
    fn test_policy_config_from_safety_config() {
        let safety = SafetyConfig::default();
        let config = PolicyConfig::from(&safety);
        assert_eq!(config.banned_keywords, safety.banned_keywords);
        assert_eq!(config.history_limit, safety.history_limit);
        assert_eq!(config.max_requeries, safety.max_requeries);
    }
}
