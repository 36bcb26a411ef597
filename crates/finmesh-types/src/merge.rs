//! Merged verdicts produced by the orchestrator.

use crate::agent::AgentResponse;
use crate::value::DataMap;
use serde::{Deserialize, Serialize};

/// Final status after combining agent responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MergedStatus {
    Approved,
    Rejected,
    Pending,
    Conflict,
}

impl MergedStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Pending => "PENDING",
            Self::Conflict => "CONFLICT",
        }
    }
}

/// The orchestrator's combined answer for one user request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedResponse {
    pub status: MergedStatus,
    pub final_result: DataMap,
    pub risk_score: f64,
    pub explanation: String,
    pub agent_responses: Vec<AgentResponse>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub conflicts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
}
