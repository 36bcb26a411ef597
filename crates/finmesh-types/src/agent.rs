//! Agent registrations and the uniform mesh request/response contract.

use crate::ids::{AgentId, RequestId, SessionId};
use crate::value::DataMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Functional classification of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentKind {
    Banking,
    Fraud,
    Guardrail,
    Clearance,
    Scoring,
    Payment,
    Trade,
    Auth,
}

impl AgentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Banking => "BANKING",
            Self::Fraud => "FRAUD",
            Self::Guardrail => "GUARDRAIL",
            Self::Clearance => "CLEARANCE",
            Self::Scoring => "SCORING",
            Self::Payment => "PAYMENT",
            Self::Trade => "TRADE",
            Self::Auth => "AUTH",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BANKING" => Ok(Self::Banking),
            "FRAUD" => Ok(Self::Fraud),
            "GUARDRAIL" => Ok(Self::Guardrail),
            "CLEARANCE" => Ok(Self::Clearance),
            "SCORING" => Ok(Self::Scoring),
            "PAYMENT" => Ok(Self::Payment),
            "TRADE" => Ok(Self::Trade),
            "AUTH" => Ok(Self::Auth),
            other => Err(format!("unknown agent kind '{other}'")),
        }
    }
}

/// Agent liveness as observed by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentHealth {
    Healthy,
    Degraded,
    Unhealthy,
}

/// A typed capability advertisement stored by the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRegistration {
    pub agent_id: AgentId,
    pub name: String,
    pub agent_type: AgentKind,
    pub endpoint: String,
    pub capabilities: Vec<String>,
    pub status: AgentHealth,
    pub rules: DataMap,
    pub metadata: DataMap,
    pub registered_at: DateTime<Utc>,
    pub last_health_at: DateTime<Utc>,
}

impl AgentRegistration {
    pub fn new(
        name: impl Into<String>,
        agent_type: AgentKind,
        endpoint: impl Into<String>,
        capabilities: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            agent_id: AgentId::generate(),
            name: name.into(),
            agent_type,
            endpoint: endpoint.into(),
            capabilities,
            status: AgentHealth::Healthy,
            rules: DataMap::new(),
            metadata: DataMap::new(),
            registered_at: now,
            last_health_at: now,
        }
    }
}

/// Context payload handed to an agent with each request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputContext {
    pub user_id: String,
    pub session_id: SessionId,
    pub channel: String,
    pub intent: String,
    #[serde(default)]
    pub data: DataMap,
    #[serde(default)]
    pub context: DataMap,
}

/// Uniform request accepted by every agent's `/process` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRequest {
    pub agent_id: AgentId,
    pub task: String,
    pub input_context: InputContext,
    pub session_id: SessionId,
    pub request_id: RequestId,
    pub timestamp: DateTime<Utc>,
}

impl AgentRequest {
    pub fn new(agent_id: AgentId, task: impl Into<String>, input_context: InputContext) -> Self {
        let session_id = input_context.session_id.clone();
        Self {
            agent_id,
            task: task.into(),
            input_context,
            session_id,
            request_id: RequestId::generate(),
            timestamp: Utc::now(),
        }
    }
}

/// Verdict carried in an agent response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Approved,
    Rejected,
    Pending,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Pending => "PENDING",
        }
    }
}

/// Uniform response returned by every agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    pub agent_id: AgentId,
    pub agent_type: AgentKind,
    pub status: Verdict,
    pub result: DataMap,
    pub risk_score: f64,
    pub explanation: String,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
    pub request_id: RequestId,
}

impl AgentResponse {
    pub fn new(request: &AgentRequest, agent_type: AgentKind, status: Verdict) -> Self {
        Self {
            agent_id: request.agent_id.clone(),
            agent_type,
            status,
            result: DataMap::new(),
            risk_score: 0.0,
            explanation: String::new(),
            confidence: 1.0,
            timestamp: Utc::now(),
            request_id: request.request_id.clone(),
        }
    }

    pub fn with_result(mut self, result: DataMap) -> Self {
        self.result = result;
        self
    }

    pub fn with_risk(mut self, risk_score: f64) -> Self {
        self.risk_score = risk_score.clamp(0.0, 1.0);
        self
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = explanation.into();
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }
}
