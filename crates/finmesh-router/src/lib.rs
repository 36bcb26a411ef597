//! Context router: decides which agent kind handles a task and resolves a
//! concrete agent from the registry.
//!
//! The decision pipeline is rule engine first, intent-based fallback second,
//! registry resolution last. A rule-engine error is treated as "no decision"
//! so a bad uploaded rule can never stall routing.

use finmesh_registry::AgentRegistry;
use finmesh_rules::RuleEngine;
use finmesh_types::{
    map_bool, map_f64, AgentKind, DataMap, IntentLabel, RiskLevel, RoutingContext, RoutingDecision,
    Session, Task,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct ContextRouter {
    rules: Arc<RuleEngine>,
    registry: Arc<AgentRegistry>,
}

impl ContextRouter {
    pub fn new(rules: Arc<RuleEngine>, registry: Arc<AgentRegistry>) -> Self {
        Self { rules, registry }
    }

    /// Build the routing context from the task and its session.
    ///
    /// Risk level is derived purely from the amount; profile and device info
    /// are lifted from the task context when the channel supplied them.
    pub fn build_context(&self, task: &Task, session: &Session) -> RoutingContext {
        let amount = map_f64(&task.data, "amount").unwrap_or(0.0);
        let user_profile = lift_object(&task.context, "user_profile");
        let device_info = lift_object(&task.context, "device_info");

        let mut metadata = DataMap::new();
        metadata.insert("channel".to_string(), Value::from(session.channel.clone()));
        for (key, value) in &task.context {
            if key != "user_profile" && key != "device_info" {
                metadata.insert(key.clone(), value.clone());
            }
        }

        RoutingContext {
            user_id: task.user_id.clone(),
            channel: task.channel.clone(),
            intent: task.intent.clone(),
            amount,
            risk_level: RiskLevel::from_amount(amount),
            user_profile,
            device_info,
            metadata,
        }
    }

    /// Full routing pipeline for one task.
    pub fn route(&self, task: &Task, session: &Session) -> RoutingDecision {
        let context = self.build_context(task, session);

        let (kind, confidence, reason) = match self.rules.evaluate(&context) {
            Ok(Some(decision)) => {
                debug!(key = %decision.key, agent_type = %decision.agent_type, "routed by rule");
                (decision.agent_type, decision.confidence, decision.reason)
            }
            Ok(None) => self.intent_fallback(&context),
            Err(err) => {
                warn!(error = %err, "rule engine failed, using intent fallback");
                self.intent_fallback(&context)
            }
        };

        self.resolve(kind, confidence, reason, context)
    }

    /// Intent-based default routing applied when no rule matched.
    fn intent_fallback(&self, context: &RoutingContext) -> (AgentKind, f64, String) {
        let label = IntentLabel::classify(&context.intent);
        let high_risk = context.risk_level == RiskLevel::High;

        if label.is_transfer() {
            let beneficiary_known = context
                .metadata
                .get("beneficiary_age_days")
                .map(|v| !v.is_null())
                .unwrap_or(false);
            if high_risk || !beneficiary_known {
                return (
                    AgentKind::Guardrail,
                    0.8,
                    "transfer needs limit and beneficiary checks".to_string(),
                );
            }
            let suspicious = map_bool(&context.metadata, "suspicious_pattern").unwrap_or(false);
            if suspicious {
                return (
                    AgentKind::Fraud,
                    0.8,
                    "suspicious pattern flagged on transfer".to_string(),
                );
            }
            return (AgentKind::Banking, 0.8, "standard transfer".to_string());
        }

        let (kind, reason) = match label {
            IntentLabel::CheckBalance | IntentLabel::GetStatement => {
                (AgentKind::Banking, "account inquiry")
            }
            IntentLabel::AddBeneficiary => (AgentKind::Guardrail, "beneficiary management"),
            IntentLabel::ApplyLoan => (AgentKind::Clearance, "loan application"),
            IntentLabel::CreditScore => (AgentKind::Scoring, "score inquiry"),
            _ => match context.intent.to_ascii_uppercase().as_str() {
                "VIEW_ACCOUNT" => (AgentKind::Banking, "account inquiry"),
                "MANAGE_BENEFICIARY" => (AgentKind::Guardrail, "beneficiary management"),
                "LOAN_APPROVAL" => (AgentKind::Clearance, "loan application"),
                "RISK_ASSESSMENT" => (AgentKind::Scoring, "risk inquiry"),
                _ => (AgentKind::Banking, "default banking route"),
            },
        };
        (kind, 0.7, reason.to_string())
    }

    /// Resolve the chosen kind to a concrete agent, falling back to any
    /// Banking agent, else producing an empty decision.
    fn resolve(
        &self,
        kind: AgentKind,
        confidence: f64,
        reason: String,
        context: RoutingContext,
    ) -> RoutingDecision {
        if let Some(agent) = self.registry.first_of_kind(kind) {
            return RoutingDecision {
                agent_id: Some(agent.agent_id),
                agent_type: kind,
                confidence,
                reason,
                context,
            };
        }
        warn!(agent_type = %kind, "no agent of desired kind registered, trying banking fallback");
        if let Some(agent) = self.registry.first_of_kind(AgentKind::Banking) {
            return RoutingDecision {
                agent_id: Some(agent.agent_id),
                agent_type: AgentKind::Banking,
                confidence: confidence.min(0.5),
                reason: format!("{reason} (no {kind} agent, banking fallback)"),
                context,
            };
        }
        RoutingDecision::unroutable(context, "no agent available")
    }
}

fn lift_object(map: &DataMap, key: &str) -> DataMap {
    match map.get(key) {
        Some(Value::Object(object)) => object.clone(),
        _ => DataMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use finmesh_types::SessionId;
    use serde_json::json;

    fn task_with(intent: &str, data: Value, context: Value) -> (Task, Session) {
        let session = Session::new("U10001", "MB", Duration::hours(1));
        let Value::Object(data) = data else { unreachable!() };
        let Value::Object(context) = context else { unreachable!() };
        let task = Task::new(
            session.session_id.clone(),
            "U10001",
            "MB",
            intent,
            data,
            context,
        );
        (task, session)
    }

    async fn router_with_agents(kinds: &[AgentKind]) -> (ContextRouter, Arc<AgentRegistry>) {
        let registry = Arc::new(AgentRegistry::in_memory());
        for kind in kinds {
            registry
                .register(
                    format!("{}-agent", kind.as_str().to_ascii_lowercase()),
                    *kind,
                    "http://localhost:9999",
                    vec![],
                )
                .await;
        }
        (
            ContextRouter::new(Arc::new(RuleEngine::with_defaults()), registry.clone()),
            registry,
        )
    }

    #[tokio::test]
    async fn default_rule_sends_neft_to_guardrail() {
        let (router, _) =
            router_with_agents(&[AgentKind::Banking, AgentKind::Guardrail]).await;
        let (task, session) = task_with(
            "TRANSFER_NEFT",
            json!({"amount": 50_000, "to_account": "XXXX4321"}),
            json!({"beneficiary_age_days": 30}),
        );
        let decision = router.route(&task, &session);
        assert_eq!(decision.agent_type, AgentKind::Guardrail);
        assert!(decision.agent_id.is_some());
    }

    #[tokio::test]
    async fn balance_routes_to_banking() {
        let (router, _) = router_with_agents(&[AgentKind::Banking]).await;
        let (task, session) = task_with("CHECK_BALANCE", json!({}), json!({}));
        let decision = router.route(&task, &session);
        assert_eq!(decision.agent_type, AgentKind::Banking);
    }

    #[tokio::test]
    async fn unknown_beneficiary_forces_guardrail_for_upi() {
        // TRANSFER_UPI has no default rule; fallback applies the override.
        let (router, _) =
            router_with_agents(&[AgentKind::Banking, AgentKind::Guardrail]).await;
        let (task, session) = task_with(
            "TRANSFER_UPI",
            json!({"amount": 1_000}),
            json!({}),
        );
        let decision = router.route(&task, &session);
        assert_eq!(decision.agent_type, AgentKind::Guardrail);
    }

    #[tokio::test]
    async fn known_beneficiary_low_risk_upi_goes_to_banking() {
        let (router, _) =
            router_with_agents(&[AgentKind::Banking, AgentKind::Guardrail]).await;
        let (task, session) = task_with(
            "TRANSFER_UPI",
            json!({"amount": 1_000}),
            json!({"beneficiary_age_days": 45}),
        );
        let decision = router.route(&task, &session);
        assert_eq!(decision.agent_type, AgentKind::Banking);
    }

    #[tokio::test]
    async fn missing_kind_falls_back_to_banking_agent() {
        let (router, registry) = router_with_agents(&[AgentKind::Banking]).await;
        let (task, session) = task_with("APPLY_LOAN", json!({"amount": 200_000}), json!({}));
        let decision = router.route(&task, &session);
        assert_eq!(decision.agent_type, AgentKind::Banking);
        let resolved = decision.agent_id.expect("fell back to banking");
        assert!(registry.get(&resolved).await.is_ok());
    }

    #[tokio::test]
    async fn empty_registry_yields_unroutable_decision() {
        let (router, _) = router_with_agents(&[]).await;
        let (task, session) = task_with("CHECK_BALANCE", json!({}), json!({}));
        let decision = router.route(&task, &session);
        assert!(decision.agent_id.is_none());
        assert_eq!(decision.confidence, 0.0);
    }

    #[tokio::test]
    async fn risk_level_derives_from_amount() {
        let (router, _) = router_with_agents(&[AgentKind::Banking]).await;
        let (task, session) = task_with(
            "TRANSFER_NEFT",
            json!({"amount": 250_000}),
            json!({}),
        );
        let context = router.build_context(&task, &session);
        assert_eq!(context.risk_level, RiskLevel::High);
    }
}
