//! HTTP request handlers.

use axum::{extract::State, Json};

use wrapper_core::engine::{batch_metrics, run_batch};
use wrapper_core::error::{WrapperError, WrapperResult};

use crate::api::types::*;
use crate::AppState;

/// Pipeline runs block on the session lock and on the model, so they go to
/// the blocking pool; a panicked or cancelled run surfaces here.
fn join_error(e: tokio::task::JoinError) -> WrapperError {
    WrapperError::Internal(format!("pipeline task failed: {}", e))
}

/// Run a prompt through the wrapper pipeline.
///
/// POST /v1/runs
#[utoipa::path(
    post,
    path = "/v1/runs",
    request_body = RunRequest,
    responses(
        (status = 200, description = "Run complete", body = RunResponse),
        (status = 400, description = "Invalid request"),
        (status = 502, description = "Generator failure"),
        (status = 500, description = "Internal error")
    ),
    tag = "runs"
)]
pub async fn create_run(
    State(state): State<AppState>,
    Json(request): Json<RunRequest>,
) -> WrapperResult<Json<RunResponse>> {
    if request.prompt.trim().is_empty() {
        return Err(WrapperError::BadRequest("prompt must not be empty".to_string()));
    }

    tracing::info!(
        prompt_len = request.prompt.len(),
        policy = state.pipeline.policy().name(),
        "Running prompt"
    );

    let pipeline = state.pipeline.clone();
    let outcome = tokio::task::spawn_blocking(move || pipeline.run(&request.prompt))
        .await
        .map_err(join_error)??;

    Ok(Json(RunResponse::from(outcome)))
}

/// Run a labelled prompt set and summarise the results.
///
/// POST /v1/batch
#[utoipa::path(
    post,
    path = "/v1/batch",
    request_body = BatchRequest,
    responses(
        (status = 200, description = "Batch complete", body = BatchResponse),
        (status = 400, description = "Invalid request"),
        (status = 502, description = "Generator failure"),
        (status = 500, description = "Internal error")
    ),
    tag = "runs"
)]
pub async fn create_batch(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> WrapperResult<Json<BatchResponse>> {
    if request.prompts.is_empty() {
        return Err(WrapperError::BadRequest("prompts must not be empty".to_string()));
    }

    let pipeline = state.pipeline.clone();
    let (items, metrics) = tokio::task::spawn_blocking(move || {
        let items = run_batch(&pipeline, &request.prompts)?;
        let metrics = batch_metrics(&pipeline, &items);
        Ok::<_, WrapperError>((items, metrics))
    })
    .await
    .map_err(join_error)??;

    tracing::info!(
        total = metrics.total,
        blocked = metrics.blocked,
        avg_calls = metrics.avg_calls,
        "Batch evaluated"
    );

    Ok(Json(BatchResponse { items, metrics }))
}

/// Describe the active policy.
///
/// GET /v1/policy
#[utoipa::path(
    get,
    path = "/v1/policy",
    responses(
        (status = 200, description = "Active policy", body = PolicyResponse)
    ),
    tag = "policy"
)]
pub async fn get_policy(State(state): State<AppState>) -> Json<PolicyResponse> {
    let policy = state.pipeline.policy();

    Json(PolicyResponse {
        policy: policy.name().to_string(),
        config: policy.config_snapshot(),
        model: state.pipeline.model_id().to_string(),
        safe_refusal: state.pipeline.safe_refusal().to_string(),
    })
}

/// Health check endpoint.
///
/// GET /v1/health
#[utoipa::path(
    get,
    path = "/v1/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        policy: state.pipeline.policy().name().to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
