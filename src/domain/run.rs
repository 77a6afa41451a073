//! Run-level domain types.
//!
//! A run is one pass of a prompt through the pipeline: one or more
//! generation rounds, each judged by the policy, ending in a resolved output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Verdict;

/// Everything the model produced during one run, and how each round was judged.
///
/// Always holds at least one round, and exactly one verdict per raw output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunTrace {
    raw_outputs: Vec<String>,
    verdicts: Vec<Verdict>,
}

impl RunTrace {
    /// Start a trace from the first generation round.
    pub fn new(raw_output: String, verdict: Verdict) -> Self {
        Self {
            raw_outputs: vec![raw_output],
            verdicts: vec![verdict],
        }
    }

    /// Record another generation round.
    pub fn push(&mut self, raw_output: String, verdict: Verdict) {
        self.raw_outputs.push(raw_output);
        self.verdicts.push(verdict);
    }

    pub fn raw_outputs(&self) -> &[String] {
        &self.raw_outputs
    }

    pub fn verdicts(&self) -> &[Verdict] {
        &self.verdicts
    }

    /// Output of the most recent generation round.
    pub fn last_output(&self) -> &str {
        // A trace is never empty.
        self.raw_outputs.last().map(String::as_str).unwrap_or_default()
    }

    /// Verdict of the most recent generation round.
    pub fn last_verdict(&self) -> Verdict {
        self.verdicts.last().copied().unwrap_or(Verdict::Block)
    }

    /// Number of generation calls made.
    pub fn call_count(&self) -> usize {
        self.raw_outputs.len()
    }
}

/// What a completed run hands back to its caller.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    /// Identifier shared with the audit record of this run.
    pub run_id: Uuid,
    /// The resolved output shown to the user.
    pub final_output: String,
    /// Number of generation calls made.
    pub call_count: usize,
    /// Per-round outputs and verdicts.
    pub trace: RunTrace,
}

/// One line of the audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub run_id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Identifier of the generator's model.
    pub model: String,
    /// Name of the policy that judged the run.
    pub policy: String,
    /// Policy parameters at the time of the run.
    pub policy_config: serde_json::Value,
    /// SHA-256 of `policy_config`, hex encoded.
    pub config_digest: String,
    pub prompt: String,
    pub raw_outputs: Vec<String>,
    pub verdicts: Vec<Verdict>,
    pub final_output: String,
    pub calls: usize,
}
