//! Shared application state for the controller.

use crate::invoke::AgentInvoker;
use crate::orchestrate::Orchestrator;
use finmesh_registry::AgentRegistry;
use finmesh_router::ContextRouter;
use finmesh_rules::RuleEngine;
use finmesh_state::{SessionManager, TaskManager};
use finmesh_store::RemoteKv;
use std::sync::Arc;
use std::time::Duration;

/// Handles owned by the service for its lifetime and shared with handlers
/// by reference.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub sessions: Arc<SessionManager>,
    pub tasks: Arc<TaskManager>,
    pub registry: Arc<AgentRegistry>,
    pub rules: Arc<RuleEngine>,
}

impl AppState {
    /// Wire the controller components, optionally backed by a remote KV.
    pub async fn build(
        remote: Option<Arc<dyn RemoteKv>>,
        agent_api_key: String,
        agent_timeout: Duration,
    ) -> Self {
        let sessions = Arc::new(SessionManager::connect(remote.clone()).await);
        let tasks = Arc::new(TaskManager::connect(remote.clone()).await);
        let registry = Arc::new(AgentRegistry::connect(remote).await);
        let rules = Arc::new(RuleEngine::with_defaults());
        let router = Arc::new(ContextRouter::new(rules.clone(), registry.clone()));
        let invoker = Arc::new(AgentInvoker::new(agent_api_key, agent_timeout));

        let orchestrator = Arc::new(Orchestrator {
            sessions: sessions.clone(),
            tasks: tasks.clone(),
            registry: registry.clone(),
            router,
            invoker,
        });

        Self {
            orchestrator,
            sessions,
            tasks,
            registry,
            rules,
        }
    }
}
