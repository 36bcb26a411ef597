//! Controller API router.

use crate::handlers;
use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use finmesh_config::SecurityConfig;
use finmesh_http::{apply_middleware, health_route};

/// Build the controller app with the standard middleware stack.
pub fn build_router(state: AppState, security: &SecurityConfig) -> Router {
    let api = Router::new()
        // Tasks
        .route("/submit-task", post(handlers::submit_task))
        .route("/get-result/:task_id", get(handlers::get_result))
        // Agents
        .route("/register-agent", post(handlers::register_agent))
        .route("/agent/:agent_id", get(handlers::get_agent))
        .route("/agents", get(handlers::list_agents))
        // Sessions
        .route("/create-session", post(handlers::create_session))
        .route("/get-session/:session_id", get(handlers::get_session))
        // Rules
        .route("/rules/upload", post(handlers::upload_rules))
        .route("/rules", get(handlers::list_rules));

    let router = Router::new()
        .nest("/api/v1", api)
        .with_state(state)
        .merge(health_route("task-controller"));

    apply_middleware(router, security)
}
