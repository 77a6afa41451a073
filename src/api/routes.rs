//! Route definitions for the API.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::handlers;
use crate::AppState;

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::create_run,
        handlers::create_batch,
        handlers::get_policy,
        handlers::health_check,
    ),
    components(schemas(
        crate::api::types::RunRequest,
        crate::api::types::RunResponse,
        crate::api::types::BatchRequest,
        crate::api::types::BatchResponse,
        crate::api::types::PolicyResponse,
        crate::api::types::HealthResponse,
        wrapper_core::domain::Verdict,
        wrapper_core::domain::PromptRecord,
        wrapper_core::domain::BatchItem,
        wrapper_core::domain::BatchMetrics,
    )),
    tags(
        (name = "runs", description = "Wrapper pipeline runs"),
        (name = "policy", description = "Active policy configuration"),
        (name = "health", description = "Health and status endpoints")
    ),
    info(
        title = "Wrapper Core API",
        version = "0.1.0",
        description = "Safety wrappers around a black-box text generator",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

/// Build the API router.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Pipeline runs
        .route("/v1/runs", post(handlers::create_run))
        .route("/v1/batch", post(handlers::create_batch))
        // Introspection
        .route("/v1/policy", get(handlers::get_policy))
        .route("/v1/health", get(handlers::health_check))
        .with_state(state)
        // OpenAPI docs
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
