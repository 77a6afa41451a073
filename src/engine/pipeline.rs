//! Pipeline - one configured wrapper session.
//!
//! Bundles a policy instance, a generator and a runner with the session's
//! history window. The window is seeded from the history log when the
//! pipeline is built and then lives in memory for the session.

use std::sync::{Arc, Mutex};

use crate::config::Config;
use crate::domain::{HistoryEntry, RunOutcome};
use crate::engine::{
    build_generator, build_policy_by_name, Generator, Policy, PolicyConfig, Runner, RunnerSettings,
};
use crate::error::{WrapperError, WrapperResult};
use crate::storage::{AuditSink, HistoryLog, JsonlAuditLog, JsonlHistoryLog};

/// A ready-to-run wrapper session.
pub struct Pipeline {
    policy: Box<dyn Policy>,
    generator: Box<dyn Generator>,
    runner: Runner,
    history: Mutex<Vec<HistoryEntry>>,
}

impl Pipeline {
    /// Assemble a pipeline from parts, seeding the window from `history_log`.
    pub fn new(
        policy: Box<dyn Policy>,
        generator: Box<dyn Generator>,
        settings: RunnerSettings,
        history_log: Arc<dyn HistoryLog>,
        audit: Arc<dyn AuditSink>,
    ) -> WrapperResult<Self> {
        let history = history_log.load()?;

        tracing::info!(
            policy = policy.name(),
            model = %generator.model_id(),
            history_entries = history.len(),
            "Pipeline ready"
        );

        Ok(Self {
            policy,
            generator,
            runner: Runner::new(settings, history_log, audit),
            history: Mutex::new(history),
        })
    }

    /// Build a pipeline from configuration, with JSONL logs.
    ///
    /// Every configuration problem surfaces here, before any generation call.
    pub fn from_config(config: &Config) -> WrapperResult<Self> {
        if config.safety.safe_refusal.is_empty() {
            return Err(WrapperError::Config(
                "safety.safe_refusal must not be empty".to_string(),
            ));
        }

        let policy =
            build_policy_by_name(&config.safety.policy, &PolicyConfig::from(&config.safety))?;
        let generator = build_generator(&config.model)?;
        let settings = RunnerSettings {
            safe_refusal: config.safety.safe_refusal.clone(),
            max_rounds: config.safety.max_rounds,
        };

        Self::new(
            policy,
            generator,
            settings,
            Arc::new(JsonlHistoryLog::new(&config.storage.history_file)),
            Arc::new(JsonlAuditLog::new(&config.storage.log_file)),
        )
    }

    /// Run one prompt.
    ///
    /// The session window stays locked for the whole run, so runs through one
    /// pipeline never overlap.
    pub fn run(&self, prompt: &str) -> WrapperResult<RunOutcome> {
        let mut history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        self.runner
            .run(prompt, self.policy.as_ref(), self.generator.as_ref(), &mut history)
    }

    pub fn policy(&self) -> &dyn Policy {
        self.policy.as_ref()
    }

    pub fn model_id(&self) -> &str {
        self.generator.model_id()
    }

    pub fn safe_refusal(&self) -> &str {
        &self.runner.settings().safe_refusal
    }

    /// Keywords the active policy screens for; empty for the baseline.
    pub fn banned_keywords(&self) -> &[String] {
        self.policy.banned_keywords()
    }

    /// Copy of the current session window.
    pub fn history_snapshot(&self) -> Vec<HistoryEntry> {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
