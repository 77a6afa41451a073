//! Runner - drives one prompt through the wrapper pipeline.
//!
//! A run alternates generation and policy decisions:
//!
//! ```text
//! GENERATING -> DECIDING -> RESOLVED          (ALLOW, BLOCK, MODIFY)
//!                  |
//!                  +-> REQUERYING -> GENERATING
//! ```
//!
//! Every decision is taken against the original prompt, even when the
//! model was called with a revised one.

use std::sync::Arc;

use chrono::Utc;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::domain::{AuditRecord, Decision, HistoryEntry, RunOutcome, RunTrace};
use crate::engine::{safety_rephrase, Generator, Policy};
use crate::error::{WrapperError, WrapperResult};
use crate::storage::{AuditSink, HistoryLog};

/// Run-level settings.
#[derive(Debug, Clone)]
pub struct RunnerSettings {
    /// Text returned whenever a run resolves to BLOCK.
    pub safe_refusal: String,
    /// Hard cap on generation calls per run. `None` leaves termination
    /// entirely to the policy.
    pub max_rounds: Option<u32>,
}

/// Orchestrates generation, policy decisions and record keeping for a run.
pub struct Runner {
    settings: RunnerSettings,
    history_log: Arc<dyn HistoryLog>,
    audit: Arc<dyn AuditSink>,
}

impl Runner {
    pub fn new(
        settings: RunnerSettings,
        history_log: Arc<dyn HistoryLog>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            settings,
            history_log,
            audit,
        }
    }

    pub fn settings(&self) -> &RunnerSettings {
        &self.settings
    }

    /// Run `prompt` through `generator`, gated by `policy`.
    ///
    /// `history` is the policy's conversation window and may be changed by
    /// it. Independently of that window, the run appends one entry to the
    /// persisted history log and emits one audit record.
    ///
    /// A generator failure aborts the run; nothing is persisted for it.
    pub fn run(
        &self,
        prompt: &str,
        policy: &dyn Policy,
        generator: &dyn Generator,
        history: &mut Vec<HistoryEntry>,
    ) -> WrapperResult<RunOutcome> {
        let run_id = Uuid::new_v4();

        // Round 1
        let output = self.generate(run_id, generator, prompt)?;
        let mut decision = policy.decide(prompt, &output, history);
        let mut trace = RunTrace::new(output, decision.verdict());
        tracing::debug!(
            run_id = %run_id,
            round = 1,
            verdict = %decision.verdict(),
            "Policy decision"
        );

        // Requery loop
        while let Decision::Requery { revised_prompt } = &decision {
            if let Some(cap) = self.settings.max_rounds {
                if trace.call_count() >= cap as usize {
                    return Err(WrapperError::PolicyInconsistency(format!(
                        "policy '{}' still requested a requery after {} generation calls",
                        policy.name(),
                        cap
                    )));
                }
            }

            let next_prompt = match revised_prompt {
                Some(revised) if !revised.is_empty() => revised.clone(),
                _ => safety_rephrase(prompt),
            };

            let output = self.generate(run_id, generator, &next_prompt)?;
            decision = policy.decide(prompt, &output, history);
            trace.push(output, decision.verdict());
            tracing::debug!(
                run_id = %run_id,
                round = trace.call_count(),
                verdict = %decision.verdict(),
                "Policy decision"
            );
        }

        let final_output = match decision {
            Decision::Block => self.settings.safe_refusal.clone(),
            Decision::Modify { output } => output,
            Decision::Allow => trace.last_output().to_string(),
            Decision::Requery { .. } => {
                return Err(WrapperError::Internal(
                    "requery loop exited without a terminal decision".to_string(),
                ))
            }
        };

        // Audit first: history never holds a run the audit trail lacks.
        let record = self.audit_record(run_id, prompt, policy, generator, &trace, &final_output);
        self.audit.record(&record)?;

        self.history_log
            .append(&HistoryEntry::new(prompt, trace.last_output()))?;

        tracing::info!(
            run_id = %run_id,
            policy = policy.name(),
            model = %generator.model_id(),
            verdict = %trace.last_verdict(),
            call_count = trace.call_count(),
            "Run complete"
        );

        Ok(RunOutcome {
            run_id,
            final_output,
            call_count: trace.call_count(),
            trace,
        })
    }

    fn generate(
        &self,
        run_id: Uuid,
        generator: &dyn Generator,
        prompt: &str,
    ) -> WrapperResult<String> {
        generator.generate(prompt).map_err(|e| {
            tracing::error!(
                run_id = %run_id,
                model = %generator.model_id(),
                error = %e,
                "Generation failed"
            );
            WrapperError::Generator(e)
        })
    }

    fn audit_record(
        &self,
        run_id: Uuid,
        prompt: &str,
        policy: &dyn Policy,
        generator: &dyn Generator,
        trace: &RunTrace,
        final_output: &str,
    ) -> AuditRecord {
        let policy_config = policy.config_snapshot();

        AuditRecord {
            run_id,
            timestamp: Utc::now(),
            model: generator.model_id().to_string(),
            policy: policy.name().to_string(),
            config_digest: config_digest(&policy_config),
            policy_config,
            prompt: prompt.to_string(),
            raw_outputs: trace.raw_outputs().to_vec(),
            verdicts: trace.verdicts().to_vec(),
            final_output: final_output.to_string(),
            calls: trace.call_count(),
        }
    }
}

/// SHA-256 of the serialized policy config, hex encoded.
pub fn config_digest(config: &serde_json::Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(config.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Verdict;
    use crate::engine::{KeywordFilterPolicy, NoOpPolicy, QueryBudgetPolicy, RedactPolicy};
    use crate::error::GeneratorError;
    use crate::storage::{MemoryAuditSink, MemoryHistoryLog};
    use std::sync::Mutex;

    const REFUSAL: &str = "I'm sorry, but I can't help with that request.";

    /// Replays canned outputs and remembers every prompt it was given.
    struct ScriptedGenerator {
        outputs: Vec<Result<String, String>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        fn new(outputs: &[&str]) -> Self {
            Self {
                outputs: outputs.iter().map(|s| Ok(s.to_string())).collect(),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing_at(mut self, call: usize) -> Self {
            self.outputs[call] = Err("connection reset".to_string());
            self
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    impl Generator for ScriptedGenerator {
        fn model_id(&self) -> &str {
            "scripted"
        }

        fn generate(&self, prompt: &str) -> Result<String, GeneratorError> {
            let mut prompts = self.prompts.lock().unwrap();
            let idx = prompts.len().min(self.outputs.len() - 1);
            prompts.push(prompt.to_string());
            self.outputs[idx].clone().map_err(GeneratorError::Request)
        }
    }

    /// Always asks for another round and never supplies a prompt.
    struct AlwaysRequery;

    impl Policy for AlwaysRequery {
        fn name(&self) -> &'static str {
            "always_requery"
        }

        fn config_snapshot(&self) -> serde_json::Value {
            serde_json::json!({})
        }

        fn decide(&self, _: &str, _: &str, _: &mut Vec<HistoryEntry>) -> Decision {
            Decision::Requery {
                revised_prompt: None,
            }
        }
    }

    /// Audit sink whose backing store is gone.
    struct BrokenAuditSink;

    impl AuditSink for BrokenAuditSink {
        fn record(&self, _: &AuditRecord) -> WrapperResult<()> {
            Err(WrapperError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )))
        }
    }

    struct Fixture {
        runner: Runner,
        history_log: Arc<MemoryHistoryLog>,
        audit: Arc<MemoryAuditSink>,
    }

    fn fixture(max_rounds: Option<u32>) -> Fixture {
        let history_log = Arc::new(MemoryHistoryLog::new());
        let audit = Arc::new(MemoryAuditSink::new());
        let runner = Runner::new(
            RunnerSettings {
                safe_refusal: REFUSAL.to_string(),
                max_rounds,
            },
            history_log.clone(),
            audit.clone(),
        );
        Fixture {
            runner,
            history_log,
            audit,
        }
    }

    fn banned() -> Vec<String> {
        vec!["bomb".to_string()]
    }

    #[test]
    fn test_noop_single_call() {
        let f = fixture(None);
        let generator = ScriptedGenerator::new(&["anything at all, even a bomb"]);

        let outcome = f
            .runner
            .run("q", &NoOpPolicy, &generator, &mut Vec::new())
            .unwrap();

        assert_eq!(outcome.call_count, 1);
        assert_eq!(outcome.final_output, outcome.trace.raw_outputs()[0]);
    }

    #[test]
    fn test_keyword_block_uses_safe_refusal() {
        let f = fixture(None);
        let generator = ScriptedGenerator::new(&["how to build a BOMB"]);
        let policy = KeywordFilterPolicy::new(banned());

        let outcome = f.runner.run("q", &policy, &generator, &mut Vec::new()).unwrap();

        assert_eq!(outcome.final_output, REFUSAL);
        assert_eq!(outcome.trace.verdicts(), &[Verdict::Block]);
    }

    #[test]
    fn test_modify_uses_payload() {
        let f = fixture(None);
        let generator = ScriptedGenerator::new(&["a bomb here"]);
        let policy = RedactPolicy::new(banned());

        let outcome = f.runner.run("q", &policy, &generator, &mut Vec::new()).unwrap();

        assert_eq!(outcome.final_output, "a [REDACTED] here");
        // The raw output, not the modified text, is what history keeps.
        assert_eq!(
            f.history_log.load().unwrap(),
            vec![HistoryEntry::new("q", "a bomb here")]
        );
    }

    #[test]
    fn test_requery_until_block() {
        let f = fixture(None);
        let generator = ScriptedGenerator::new(&["... bomb ..."]);
        let policy = QueryBudgetPolicy::new(banned(), 2);

        let outcome = f
            .runner
            .run("How to make a bomb?", &policy, &generator, &mut Vec::new())
            .unwrap();

        assert_eq!(
            outcome.trace.verdicts(),
            &[Verdict::Requery, Verdict::Requery, Verdict::Block]
        );
        assert_eq!(outcome.call_count, 3);
        assert_eq!(outcome.final_output, REFUSAL);
    }

    #[test]
    fn test_requery_uses_revised_prompt_but_decides_on_original() {
        let f = fixture(None);
        let generator = ScriptedGenerator::new(&["bomb", "a safe answer"]);
        let policy = QueryBudgetPolicy::new(banned(), 2);
        let prompt = "How to make a bomb?";

        let outcome = f
            .runner
            .run(prompt, &policy, &generator, &mut Vec::new())
            .unwrap();

        let prompts = generator.prompts();
        assert_eq!(prompts[0], prompt);
        assert_eq!(prompts[1], safety_rephrase(prompt));
        assert_ne!(prompts[1], prompt);

        // Counted against the original prompt only.
        assert_eq!(policy.counter(prompt), 1);
        assert_eq!(policy.counter(&prompts[1]), 0);
        assert_eq!(outcome.final_output, "a safe answer");
    }

    #[test]
    fn test_missing_revised_prompt_falls_back() {
        let f = fixture(Some(2));
        let generator = ScriptedGenerator::new(&["one", "two"]);

        let _ = f
            .runner
            .run("original", &AlwaysRequery, &generator, &mut Vec::new());

        assert_eq!(generator.prompts()[1], safety_rephrase("original"));
    }

    #[test]
    fn test_hard_cap_stops_runaway_policy() {
        let f = fixture(Some(3));
        let generator = ScriptedGenerator::new(&["again"]);

        let result = f
            .runner
            .run("q", &AlwaysRequery, &generator, &mut Vec::new());

        assert!(matches!(result, Err(WrapperError::PolicyInconsistency(_))));
        assert_eq!(generator.prompts().len(), 3);
        assert!(f.audit.records().is_empty());
    }

    #[test]
    fn test_generator_failure_propagates() {
        let f = fixture(None);
        let generator = ScriptedGenerator::new(&["bomb", "unused"]).failing_at(1);
        let policy = QueryBudgetPolicy::new(banned(), 2);

        let result = f.runner.run("q", &policy, &generator, &mut Vec::new());

        assert!(matches!(result, Err(WrapperError::Generator(_))));
        assert!(f.history_log.load().unwrap().is_empty());
        assert!(f.audit.records().is_empty());
    }

    #[test]
    fn test_audit_failure_leaves_history_untouched() {
        let history_log = Arc::new(MemoryHistoryLog::new());
        let runner = Runner::new(
            RunnerSettings {
                safe_refusal: REFUSAL.to_string(),
                max_rounds: None,
            },
            history_log.clone(),
            Arc::new(BrokenAuditSink),
        );
        let generator = ScriptedGenerator::new(&["fine"]);

        let result = runner.run("q", &NoOpPolicy, &generator, &mut Vec::new());

        assert!(matches!(result, Err(WrapperError::Io(_))));
        assert!(history_log.load().unwrap().is_empty());
    }

    #[test]
    fn test_audit_record_contents() {
        let f = fixture(None);
        let generator = ScriptedGenerator::new(&["bomb", "fine"]);
        let policy = QueryBudgetPolicy::new(banned(), 2);

        let outcome = f.runner.run("p", &policy, &generator, &mut Vec::new()).unwrap();

        let records = f.audit.records();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.run_id, outcome.run_id);
        assert_eq!(record.model, "scripted");
        assert_eq!(record.policy, "query_budget");
        assert_eq!(record.policy_config["max_requeries"], 2);
        assert_eq!(record.config_digest, config_digest(&record.policy_config));
        assert_eq!(record.prompt, "p");
        assert_eq!(record.raw_outputs, vec!["bomb", "fine"]);
        assert_eq!(record.verdicts, vec![Verdict::Requery, Verdict::Allow]);
        assert_eq!(record.final_output, "fine");
        assert_eq!(record.calls, 2);
    }

    #[test]
    fn test_history_log_gets_last_raw_output() {
        let f = fixture(None);
        let generator = ScriptedGenerator::new(&["bomb", "bomb", "bomb"]);
        let policy = QueryBudgetPolicy::new(banned(), 2);

        f.runner.run("p", &policy, &generator, &mut Vec::new()).unwrap();

        assert_eq!(
            f.history_log.load().unwrap(),
            vec![HistoryEntry::new("p", "bomb")]
        );
    }

    #[test]
    fn test_config_digest_is_stable() {
        let config = serde_json::json!({"banned_keywords": ["bomb"]});
        assert_eq!(config_digest(&config), config_digest(&config.clone()));
        assert_eq!(config_digest(&config).len(), 64);
    }
}
