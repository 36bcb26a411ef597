//! Shared HTTP surface for finmesh services.
//!
//! Every service mounts the same middleware stack, in request order:
//! CORS, request tracing, API-key authentication, per-IP rate limiting.
//! `/health` bypasses auth and rate limiting and reports the service name.

pub mod auth;
pub mod error;
pub mod rate_limit;

pub use auth::ApiKeyAuth;
pub use error::{ApiError, ApiResult, ErrorResponse};
pub use rate_limit::RateLimiter;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method};
use axum::routing::get;
use axum::{middleware, Json, Router};
use finmesh_config::SecurityConfig;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Health payload returned by every service.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}

/// Build the `/health` route for a service.
pub fn health_route(service: &'static str) -> Router {
    Router::new().route(
        "/health",
        get(move || async move {
            Json(HealthResponse {
                status: "healthy",
                service,
            })
        }),
    )
}

/// Permissive CORS with the platform's allowed methods and headers.
/// Preflight requests short-circuit inside the layer and never reach the
/// auth or rate-limit stages.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            CONTENT_TYPE,
            HeaderName::from_static("x-api-key"),
            AUTHORIZATION,
        ])
}

/// Apply the standard middleware stack to a service router.
///
/// Layers are added innermost-first so the request passes CORS, then
/// tracing, then auth, then the rate limiter.
pub fn apply_middleware(router: Router, security: &SecurityConfig) -> Router {
    let auth = Arc::new(ApiKeyAuth::new(
        &security.api_key_header,
        security.api_key.clone(),
    ));
    let limiter = Arc::new(RateLimiter::new(security.rate_limit_rps));

    router
        .layer(middleware::from_fn_with_state(
            limiter,
            rate_limit::shed_excess,
        ))
        .layer(middleware::from_fn_with_state(auth, auth::require_api_key))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
}
