//! Agent capability trait and construction.
//!
//! Each agent process hosts exactly one kind, selected at startup. All
//! kinds expose the same `process` capability over the uniform mesh
//! contract.

use crate::clients::{BankingClient, MlClient};
use crate::{banking, clearance, fraud, guardrail, scoring};
use async_trait::async_trait;
use finmesh_types::{AgentKind, AgentRequest, AgentResponse};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentBuildError {
    #[error("agent kind {0} has no host implementation")]
    Unsupported(AgentKind),
}

/// The uniform processing capability.
#[async_trait]
pub trait Agent: Send + Sync {
    fn kind(&self) -> AgentKind;

    /// Process one request. Agents never fail the call; collaborator
    /// failures are absorbed into deterministic fallbacks and the response
    /// carries the verdict.
    async fn process(&self, request: &AgentRequest) -> AgentResponse;
}

/// Collaborators shared by the agent implementations.
#[derive(Clone)]
pub struct AgentDeps {
    pub ml: Arc<MlClient>,
    pub banking: Arc<BankingClient>,
}

/// Construct the agent implementation for a kind.
pub fn build_agent(kind: AgentKind, deps: AgentDeps) -> Result<Arc<dyn Agent>, AgentBuildError> {
    match kind {
        AgentKind::Banking => Ok(Arc::new(banking::BankingAgent::new(deps.banking))),
        AgentKind::Fraud => Ok(Arc::new(fraud::FraudAgent::new(deps.ml))),
        AgentKind::Guardrail => Ok(Arc::new(guardrail::GuardrailAgent::new())),
        AgentKind::Clearance => Ok(Arc::new(clearance::ClearanceAgent::new())),
        AgentKind::Scoring => Ok(Arc::new(scoring::ScoringAgent::new(deps.ml))),
        other => Err(AgentBuildError::Unsupported(other)),
    }
}

/// Default capability tags advertised at registration for a kind.
pub fn default_capabilities(kind: AgentKind) -> Vec<String> {
    let labels: &[&str] = match kind {
        AgentKind::Banking => &[
            "TRANSFER_NEFT",
            "TRANSFER_RTGS",
            "TRANSFER_IMPS",
            "TRANSFER_UPI",
            "CHECK_BALANCE",
            "GET_STATEMENT",
            "ADD_BENEFICIARY",
        ],
        AgentKind::Fraud => &["FRAUD_CHECK", "RISK_ASSESSMENT"],
        AgentKind::Guardrail => &["TRANSFER_NEFT", "TRANSFER_RTGS", "ADD_BENEFICIARY"],
        AgentKind::Clearance => &["APPLY_LOAN", "LOAN_APPROVAL"],
        AgentKind::Scoring => &["CREDIT_SCORE", "RISK_ASSESSMENT"],
        _ => &[],
    };
    labels.iter().map(|label| label.to_string()).collect()
}
