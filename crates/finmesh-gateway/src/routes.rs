//! Gateway API router.

use crate::process::{Pipeline, ProcessRequest};
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use finmesh_config::SecurityConfig;
use finmesh_http::{apply_middleware, health_route, ApiResult};
use finmesh_types::MergedResponse;
use std::sync::Arc;

async fn process_handler(
    State(pipeline): State<Arc<Pipeline>>,
    Json(request): Json<ProcessRequest>,
) -> ApiResult<Json<MergedResponse>> {
    Ok(Json(pipeline.process(request).await?))
}

/// Build the gateway app with the standard middleware stack.
pub fn build_router(pipeline: Arc<Pipeline>, security: &SecurityConfig) -> Router {
    let api = Router::new()
        .route("/api/v1/process", post(process_handler))
        .with_state(pipeline);
    apply_middleware(api.merge(health_route("orchestrator")), security)
}
