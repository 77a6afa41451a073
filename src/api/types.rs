//! API request and response types.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use wrapper_core::domain::{BatchItem, BatchMetrics, PromptRecord, RunOutcome, Verdict};

// ==================== Runs ====================

/// Request to run one prompt through the wrapper.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RunRequest {
    /// The user prompt.
    pub prompt: String,
}

/// Result of a single run.
#[derive(Debug, Serialize, ToSchema)]
pub struct RunResponse {
    /// Identifier of the run's audit record.
    pub run_id: Uuid,
    /// Output shown to the user.
    pub final_output: String,
    /// Number of generation calls made.
    pub call_count: usize,
    /// Raw model output of each round.
    pub raw_outputs: Vec<String>,
    /// Policy verdict of each round.
    pub verdicts: Vec<Verdict>,
}

impl From<RunOutcome> for RunResponse {
    fn from(outcome: RunOutcome) -> Self {
        Self {
            run_id: outcome.run_id,
            raw_outputs: outcome.trace.raw_outputs().to_vec(),
            verdicts: outcome.trace.verdicts().to_vec(),
            final_output: outcome.final_output,
            call_count: outcome.call_count,
        }
    }
}

// ==================== Batch ====================

/// Request to run a labelled prompt set.
#[derive(Debug, Deserialize, ToSchema)]
pub struct BatchRequest {
    pub prompts: Vec<PromptRecord>,
}

/// Per-prompt results and aggregate metrics.
#[derive(Debug, Serialize, ToSchema)]
pub struct BatchResponse {
    pub items: Vec<BatchItem>,
    pub metrics: BatchMetrics,
}

// ==================== Policy ====================

/// Active wrapper configuration.
#[derive(Debug, Serialize, ToSchema)]
pub struct PolicyResponse {
    /// Policy name.
    pub policy: String,
    /// Policy parameters.
    #[schema(value_type = Object)]
    pub config: serde_json::Value,
    /// Generator model identifier.
    pub model: String,
    /// Text returned for blocked runs.
    pub safe_refusal: String,
}

// ==================== Health ====================

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
    /// Active policy.
    pub policy: String,
    /// Timestamp.
    pub timestamp: String,
}
