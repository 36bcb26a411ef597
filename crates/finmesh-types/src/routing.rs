//! Routing context and decisions.

use crate::agent::AgentKind;
use crate::context::RiskLevel;
use crate::ids::AgentId;
use crate::value::DataMap;
use serde::{Deserialize, Serialize};

/// Inputs the router and rule engine evaluate against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingContext {
    pub user_id: String,
    pub channel: String,
    pub intent: String,
    pub amount: f64,
    pub risk_level: RiskLevel,
    pub user_profile: DataMap,
    pub device_info: DataMap,
    pub metadata: DataMap,
}

/// Ephemeral output of the router.
///
/// An empty `agent_id` with confidence 0 means no agent could be resolved;
/// the caller must mark the task failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub agent_id: Option<AgentId>,
    pub agent_type: AgentKind,
    pub confidence: f64,
    pub reason: String,
    pub context: RoutingContext,
}

impl RoutingDecision {
    pub fn unroutable(context: RoutingContext, reason: impl Into<String>) -> Self {
        Self {
            agent_id: None,
            agent_type: AgentKind::Banking,
            confidence: 0.0,
            reason: reason.into(),
            context,
        }
    }
}
