//! Agent host: HTTP surface and controller self-registration.

use crate::runtime::{default_capabilities, Agent};
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use finmesh_config::{AgentIdentityConfig, ControllerConfig, SecurityConfig};
use finmesh_http::{apply_middleware, health_route};
use finmesh_types::{AgentKind, AgentRequest, AgentResponse};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Stable service label for health reporting.
pub fn service_label(kind: AgentKind) -> &'static str {
    match kind {
        AgentKind::Banking => "banking-agent",
        AgentKind::Fraud => "fraud-agent",
        AgentKind::Guardrail => "guardrail-agent",
        AgentKind::Clearance => "clearance-agent",
        AgentKind::Scoring => "scoring-agent",
        AgentKind::Payment => "payment-agent",
        AgentKind::Trade => "trade-agent",
        AgentKind::Auth => "auth-agent",
    }
}

/// Default listen port per agent kind.
pub fn default_port(kind: AgentKind) -> u16 {
    match kind {
        AgentKind::Banking => 8001,
        AgentKind::Fraud => 8002,
        AgentKind::Guardrail => 8003,
        AgentKind::Clearance => 8004,
        AgentKind::Scoring => 8005,
        _ => 8009,
    }
}

async fn process_handler(
    State(agent): State<Arc<dyn Agent>>,
    Json(request): Json<AgentRequest>,
) -> Json<AgentResponse> {
    Json(agent.process(&request).await)
}

/// Build the agent's HTTP app with the standard middleware stack.
pub fn build_router(agent: Arc<dyn Agent>, security: &SecurityConfig) -> Router {
    let kind = agent.kind();
    let api = Router::new()
        .route("/api/v1/process", post(process_handler))
        .with_state(agent);
    apply_middleware(api.merge(health_route(service_label(kind))), security)
}

/// Register this agent with the task controller: up to three attempts with
/// exponential backoff. Startup continues regardless of the outcome.
pub async fn register_with_controller(
    controller: &ControllerConfig,
    identity: &AgentIdentityConfig,
    kind: AgentKind,
) -> Option<String> {
    let client = match reqwest::Client::builder().timeout(controller.timeout()).build() {
        Ok(client) => client,
        Err(err) => {
            warn!(error = %err, "could not build registration client");
            return None;
        }
    };
    let url = format!(
        "{}/api/v1/register-agent",
        controller.base_url.trim_end_matches('/')
    );
    let payload = json!({
        "name": identity.name,
        "agent_type": kind.as_str(),
        "endpoint": identity.endpoint,
        "capabilities": default_capabilities(kind),
    });

    let mut backoff = Duration::from_secs(2);
    for attempt in 1..=3u32 {
        let outcome = client
            .post(&url)
            .header("X-API-Key", &controller.api_key)
            .json(&payload)
            .send()
            .await;
        match outcome {
            Ok(response) if response.status().is_success() => {
                let body: Value = response.json().await.unwrap_or(Value::Null);
                let agent_id = body
                    .get("agent_id")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                info!(agent_id = agent_id.as_deref().unwrap_or("?"), "registered with task controller");
                return agent_id;
            }
            Ok(response) => {
                warn!(attempt, status = response.status().as_u16(), "registration rejected");
            }
            Err(err) => {
                warn!(attempt, error = %err, "registration attempt failed");
            }
        }
        if attempt < 3 {
            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }
    }
    warn!("agent registration failed after 3 attempts, continuing unregistered");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guardrail::GuardrailAgent;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn security() -> SecurityConfig {
        SecurityConfig {
            api_key_header: "X-API-Key".to_string(),
            api_key: None,
            jwt_secret: None,
            rate_limit_rps: 50,
        }
    }

    #[tokio::test]
    async fn health_names_the_agent_kind() {
        let router = build_router(Arc::new(GuardrailAgent::new()), &security());
        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), 4096).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["service"], "guardrail-agent");
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn process_requires_api_key() {
        let router = build_router(Arc::new(GuardrailAgent::new()), &security());
        let response = router
            .oneshot(
                Request::post("/api/v1/process")
                    .header("content-type", "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
