//! Agent invocation over HTTP with an in-process fallback.
//!
//! When the remote agent cannot be reached (or returns garbage), the
//! controller processes the request with the in-process implementation of
//! the same agent kind, with collaborators disabled. The fallback response
//! is indistinguishable in shape and semantics from a live mock-mode agent,
//! so development and test flows keep moving.

use finmesh_agents::clients::{BankingClient, MlClient};
use finmesh_agents::{build_agent, Agent, AgentDeps};
use finmesh_config::{BankingConfig, MlConfig};
use finmesh_types::{AgentKind, AgentRegistration, AgentRequest, AgentResponse};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("agent call failed: {0}")]
    Transport(String),

    #[error("agent returned {0}")]
    Status(u16),

    #[error("agent response unparseable: {0}")]
    Parse(String),

    #[error("no in-process fallback for agent kind {0}")]
    NoFallback(AgentKind),
}

pub struct AgentInvoker {
    client: reqwest::Client,
    api_key: String,
    fallbacks: RwLock<HashMap<AgentKind, Arc<dyn Agent>>>,
}

impl AgentInvoker {
    pub fn new(api_key: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client construction cannot fail with static options");
        Self {
            client,
            api_key,
            fallbacks: RwLock::new(HashMap::new()),
        }
    }

    /// Invoke the registered agent; on any transport, status or parse
    /// failure, fall back to the in-process implementation of that kind.
    pub async fn invoke(
        &self,
        registration: &AgentRegistration,
        request: &AgentRequest,
    ) -> Result<AgentResponse, InvokeError> {
        match self.invoke_remote(registration, request).await {
            Ok(response) => Ok(response),
            Err(err) => {
                warn!(
                    agent_id = %registration.agent_id,
                    endpoint = %registration.endpoint,
                    error = %err,
                    "agent unreachable, using in-process fallback"
                );
                self.invoke_fallback(registration.agent_type, request).await
            }
        }
    }

    async fn invoke_remote(
        &self,
        registration: &AgentRegistration,
        request: &AgentRequest,
    ) -> Result<AgentResponse, InvokeError> {
        let url = format!(
            "{}/api/v1/process",
            registration.endpoint.trim_end_matches('/')
        );
        let response = self
            .client
            .post(&url)
            .header("X-API-Key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| InvokeError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(InvokeError::Status(status.as_u16()));
        }
        response
            .json()
            .await
            .map_err(|e| InvokeError::Parse(e.to_string()))
    }

    async fn invoke_fallback(
        &self,
        kind: AgentKind,
        request: &AgentRequest,
    ) -> Result<AgentResponse, InvokeError> {
        let agent = self.fallback_agent(kind)?;
        Ok(agent.process(request).await)
    }

    fn fallback_agent(&self, kind: AgentKind) -> Result<Arc<dyn Agent>, InvokeError> {
        {
            let fallbacks = self.fallbacks.read().expect("fallback lock poisoned");
            if let Some(agent) = fallbacks.get(&kind) {
                return Ok(agent.clone());
            }
        }
        let deps = AgentDeps {
            ml: Arc::new(MlClient::new(MlConfig {
                enabled: false,
                base_url: String::new(),
                api_key: None,
            })),
            banking: Arc::new(BankingClient::new(BankingConfig {
                enabled: false,
                base_url: String::new(),
                api_key: None,
            })),
        };
        let agent = build_agent(kind, deps).map_err(|_| InvokeError::NoFallback(kind))?;
        let mut fallbacks = self.fallbacks.write().expect("fallback lock poisoned");
        Ok(fallbacks.entry(kind).or_insert(agent).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finmesh_types::{AgentId, InputContext, SessionId, Verdict};
    use serde_json::json;

    fn registration(kind: AgentKind) -> AgentRegistration {
        // Unroutable port: every remote call fails and exercises the fallback.
        AgentRegistration::new("test", kind, "http://127.0.0.1:1", vec![])
    }

    fn request(intent: &str, data: serde_json::Value, context: serde_json::Value) -> AgentRequest {
        let serde_json::Value::Object(data) = data else { unreachable!() };
        let serde_json::Value::Object(context) = context else { unreachable!() };
        AgentRequest::new(
            AgentId::generate(),
            intent,
            InputContext {
                user_id: "U10001".to_string(),
                session_id: SessionId::generate(),
                channel: "MB".to_string(),
                intent: intent.to_string(),
                data,
                context,
            },
        )
    }

    #[tokio::test]
    async fn unreachable_banking_agent_falls_back_in_process() {
        let invoker = AgentInvoker::new("dev-key".to_string(), Duration::from_millis(500));
        let response = invoker
            .invoke(
                &registration(AgentKind::Banking),
                &request("CHECK_BALANCE", json!({}), json!({})),
            )
            .await
            .unwrap();
        assert_eq!(response.status, Verdict::Approved);
        assert!(response.result.contains_key("balance"));
    }

    #[tokio::test]
    async fn fallback_guardrail_evaluates_real_checks() {
        let invoker = AgentInvoker::new("dev-key".to_string(), Duration::from_millis(500));
        let response = invoker
            .invoke(
                &registration(AgentKind::Guardrail),
                &request(
                    "TRANSFER_NEFT",
                    json!({"amount": 250_000}),
                    json!({"beneficiary_age_days": 30}),
                ),
            )
            .await
            .unwrap();
        assert_eq!(response.status, Verdict::Rejected);
    }

    #[tokio::test]
    async fn unsupported_kind_has_no_fallback() {
        let invoker = AgentInvoker::new("dev-key".to_string(), Duration::from_millis(500));
        let err = invoker
            .invoke(
                &registration(AgentKind::Payment),
                &request("PAY", json!({}), json!({})),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, InvokeError::NoFallback(AgentKind::Payment)));
    }
}
