//! Agent registry: typed capability advertisements with durable-fallback
//! persistence.
//!
//! Agents register on boot and are looked up by id or kind during routing.
//! Registrations are only mutated by health updates after creation.

use finmesh_store::{FallbackMap, RemoteKv};
use finmesh_types::{AgentHealth, AgentId, AgentKind, AgentRegistration};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("agent {0} not found")]
    NotFound(AgentId),
}

/// Registry of live agents, keyed by generated agent id.
pub struct AgentRegistry {
    agents: FallbackMap<AgentRegistration>,
}

impl AgentRegistry {
    pub async fn connect(remote: Option<Arc<dyn RemoteKv>>) -> Self {
        Self {
            agents: FallbackMap::connect("agent", remote, None).await,
        }
    }

    pub fn in_memory() -> Self {
        Self {
            agents: FallbackMap::in_memory("agent"),
        }
    }

    /// Store a new registration and return it with its generated id.
    pub async fn register(
        &self,
        name: impl Into<String>,
        agent_type: AgentKind,
        endpoint: impl Into<String>,
        capabilities: Vec<String>,
    ) -> AgentRegistration {
        let registration = AgentRegistration::new(name, agent_type, endpoint, capabilities);
        info!(
            agent_id = %registration.agent_id,
            agent_type = %registration.agent_type,
            endpoint = %registration.endpoint,
            "agent registered"
        );
        self.agents
            .put(registration.agent_id.as_str(), registration.clone())
            .await;
        registration
    }

    pub async fn get(&self, agent_id: &AgentId) -> Result<AgentRegistration, RegistryError> {
        self.agents
            .get(agent_id.as_str())
            .await
            .ok_or_else(|| RegistryError::NotFound(agent_id.clone()))
    }

    pub fn list(&self) -> Vec<AgentRegistration> {
        self.agents.values()
    }

    /// All agents of a kind, healthy ones first.
    pub fn find_by_kind(&self, kind: AgentKind) -> Vec<AgentRegistration> {
        let mut found: Vec<_> = self
            .agents
            .values()
            .into_iter()
            .filter(|agent| agent.agent_type == kind)
            .collect();
        found.sort_by_key(|agent| agent.status != AgentHealth::Healthy);
        found
    }

    /// First agent of a kind, preferring healthy ones.
    pub fn first_of_kind(&self, kind: AgentKind) -> Option<AgentRegistration> {
        self.find_by_kind(kind).into_iter().next()
    }

    /// Update an agent's observed health.
    pub async fn update_health(
        &self,
        agent_id: &AgentId,
        status: AgentHealth,
    ) -> Result<(), RegistryError> {
        self.agents
            .update(agent_id.as_str(), |agent| {
                agent.status = status;
                agent.last_health_at = chrono::Utc::now();
            })
            .await
            .ok_or_else(|| RegistryError::NotFound(agent_id.clone()))
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_then_lookup_by_id_and_kind() {
        let registry = AgentRegistry::in_memory();
        let registered = registry
            .register(
                "banking-agent",
                AgentKind::Banking,
                "http://localhost:8001",
                vec!["CHECK_BALANCE".to_string()],
            )
            .await;

        let fetched = registry.get(&registered.agent_id).await.unwrap();
        assert_eq!(fetched.name, "banking-agent");
        assert_eq!(fetched.status, AgentHealth::Healthy);

        let by_kind = registry.find_by_kind(AgentKind::Banking);
        assert_eq!(by_kind.len(), 1);
        assert!(registry.find_by_kind(AgentKind::Fraud).is_empty());
    }

    #[tokio::test]
    async fn healthy_agents_sort_first() {
        let registry = AgentRegistry::in_memory();
        let sick = registry
            .register("g1", AgentKind::Guardrail, "http://localhost:8003", vec![])
            .await;
        registry
            .register("g2", AgentKind::Guardrail, "http://localhost:8013", vec![])
            .await;
        registry
            .update_health(&sick.agent_id, AgentHealth::Unhealthy)
            .await
            .unwrap();

        let first = registry.first_of_kind(AgentKind::Guardrail).unwrap();
        assert_eq!(first.name, "g2");
    }

    #[tokio::test]
    async fn unknown_agent_is_not_found() {
        let registry = AgentRegistry::in_memory();
        assert!(registry.get(&AgentId::generate()).await.is_err());
    }
}
