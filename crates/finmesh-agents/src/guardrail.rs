//! Guardrail agent: deterministic limit, KYC and beneficiary checks.
//!
//! The check battery is fixed; any single failure rejects the request. The
//! risk score is the failed fraction, and the result carries both the
//! per-check outcomes and the `all_passed` flag the orchestrator inspects
//! for transfer chaining.

use crate::runtime::Agent;
use async_trait::async_trait;
use finmesh_types::{
    map_f64, map_str, AgentKind, AgentRequest, AgentResponse, DataMap, Verdict,
};
use serde_json::{json, Value};

/// Daily aggregate limit across transactions.
const DAILY_LIMIT: f64 = 200_000.0;

/// Single transaction limit.
const SINGLE_TXN_LIMIT: f64 = 100_000.0;

/// Daily transaction count ceiling.
const VELOCITY_LIMIT: f64 = 10.0;

/// Below this amount, beneficiary age is not checked.
const SMALL_AMOUNT: f64 = 10_000.0;

pub struct GuardrailAgent;

impl GuardrailAgent {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GuardrailAgent {
    fn default() -> Self {
        Self::new()
    }
}

struct Check {
    name: &'static str,
    passed: bool,
    detail: String,
}

fn run_checks(data: &DataMap, context: &DataMap) -> Vec<Check> {
    let amount = map_f64(data, "amount").unwrap_or(0.0);
    let mut checks = Vec::with_capacity(7);

    let daily_total = match map_f64(context, "daily_transaction_amount") {
        Some(existing) => existing + amount,
        None => amount,
    };
    checks.push(Check {
        name: "daily_limit",
        passed: daily_total <= DAILY_LIMIT,
        detail: format!("daily total {daily_total} against limit {DAILY_LIMIT}"),
    });

    checks.push(Check {
        name: "single_transaction_limit",
        passed: amount <= SINGLE_TXN_LIMIT,
        detail: format!("amount {amount} against limit {SINGLE_TXN_LIMIT}"),
    });

    let velocity = map_f64(context, "transaction_count_24h").unwrap_or(0.0);
    checks.push(Check {
        name: "velocity",
        passed: velocity < VELOCITY_LIMIT,
        detail: format!("{velocity} transactions in 24h"),
    });

    let kyc_ok = map_str(context, "kyc_status")
        .map(|status| status.eq_ignore_ascii_case("VERIFIED"))
        .unwrap_or(true);
    checks.push(Check {
        name: "kyc_verified",
        passed: kyc_ok,
        detail: "KYC status".to_string(),
    });

    let account_ok = map_str(context, "account_status")
        .map(|status| status.eq_ignore_ascii_case("ACTIVE"))
        .unwrap_or(true);
    checks.push(Check {
        name: "account_active",
        passed: account_ok,
        detail: "account status".to_string(),
    });

    // Blacklist feed integration is out of scope; the check is present so
    // the battery shape matches production.
    checks.push(Check {
        name: "rbi_blacklist",
        passed: true,
        detail: "not blacklisted".to_string(),
    });

    let beneficiary_ok = if amount < SMALL_AMOUNT {
        true
    } else {
        matches!(
            map_f64(context, "beneficiary_age_days").or_else(|| map_f64(data, "beneficiary_age_days")),
            Some(age) if age >= 1.0
        )
    };
    checks.push(Check {
        name: "beneficiary_age",
        passed: beneficiary_ok,
        detail: "beneficiary cooling period".to_string(),
    });

    checks
}

#[async_trait]
impl Agent for GuardrailAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Guardrail
    }

    async fn process(&self, request: &AgentRequest) -> AgentResponse {
        let checks = run_checks(&request.input_context.data, &request.input_context.context);

        let failed: Vec<&Check> = checks.iter().filter(|check| !check.passed).collect();
        let all_passed = failed.is_empty();
        let risk = failed.len() as f64 / checks.len() as f64;

        let mut outcomes = DataMap::new();
        for check in &checks {
            outcomes.insert(check.name.to_string(), Value::Bool(check.passed));
        }
        let failed_names: Vec<&str> = failed.iter().map(|check| check.name).collect();

        let mut result = DataMap::new();
        result.insert("checks".to_string(), Value::Object(outcomes));
        result.insert("all_passed".to_string(), Value::Bool(all_passed));
        result.insert("failed_checks".to_string(), json!(failed_names));
        result.insert(
            "status".to_string(),
            Value::from(if all_passed { "APPROVED" } else { "REJECTED" }),
        );

        let (verdict, explanation) = if all_passed {
            (Verdict::Approved, "all guardrail checks passed".to_string())
        } else {
            (
                Verdict::Rejected,
                format!("guardrail checks failed: {}", failed_names.join(", ")),
            )
        };

        AgentResponse::new(request, AgentKind::Guardrail, verdict)
            .with_result(result)
            .with_risk(risk)
            .with_confidence(0.95)
            .with_explanation(explanation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finmesh_types::{AgentId, InputContext, SessionId};

    fn request(data: Value, context: Value) -> AgentRequest {
        let Value::Object(data) = data else { unreachable!() };
        let Value::Object(context) = context else { unreachable!() };
        AgentRequest::new(
            AgentId::generate(),
            "TRANSFER_NEFT",
            InputContext {
                user_id: "U10001".to_string(),
                session_id: SessionId::generate(),
                channel: "MB".to_string(),
                intent: "TRANSFER_NEFT".to_string(),
                data,
                context,
            },
        )
    }

    #[tokio::test]
    async fn small_amount_passes_without_beneficiary_age() {
        let response = GuardrailAgent::new()
            .process(&request(json!({"amount": 9_999}), json!({})))
            .await;
        assert_eq!(response.status, Verdict::Approved);
        assert_eq!(response.result.get("all_passed"), Some(&Value::Bool(true)));
        assert_eq!(response.risk_score, 0.0);
    }

    #[tokio::test]
    async fn larger_amount_with_unknown_beneficiary_fails() {
        let response = GuardrailAgent::new()
            .process(&request(json!({"amount": 10_001}), json!({})))
            .await;
        assert_eq!(response.status, Verdict::Rejected);
        let failed = response.result.get("failed_checks").and_then(Value::as_array).unwrap();
        assert!(failed.iter().any(|name| name == "beneficiary_age"));
    }

    #[tokio::test]
    async fn aged_beneficiary_passes_mid_size_transfer() {
        let response = GuardrailAgent::new()
            .process(&request(
                json!({"amount": 50_000}),
                json!({"beneficiary_age_days": 30}),
            ))
            .await;
        assert_eq!(response.status, Verdict::Approved);
        assert_eq!(
            response.result.get("status").and_then(Value::as_str),
            Some("APPROVED")
        );
        assert_eq!(response.confidence, 0.95);
    }

    #[tokio::test]
    async fn single_transaction_limit_rejects_large_transfer() {
        let response = GuardrailAgent::new()
            .process(&request(
                json!({"amount": 250_000}),
                json!({"beneficiary_age_days": 30}),
            ))
            .await;
        assert_eq!(response.status, Verdict::Rejected);
        let failed = response.result.get("failed_checks").and_then(Value::as_array).unwrap();
        assert!(failed.iter().any(|name| name == "single_transaction_limit"));
        assert!(failed.iter().any(|name| name == "daily_limit"));
        // Two of seven checks failed.
        assert!((response.risk_score - 2.0 / 7.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn daily_aggregate_includes_current_amount() {
        let response = GuardrailAgent::new()
            .process(&request(
                json!({"amount": 60_000}),
                json!({"daily_transaction_amount": 150_000, "beneficiary_age_days": 30}),
            ))
            .await;
        assert_eq!(response.status, Verdict::Rejected);
        let failed = response.result.get("failed_checks").and_then(Value::as_array).unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0], "daily_limit");
    }

    #[tokio::test]
    async fn unverified_kyc_rejects() {
        let response = GuardrailAgent::new()
            .process(&request(
                json!({"amount": 1_000}),
                json!({"kyc_status": "PENDING"}),
            ))
            .await;
        assert_eq!(response.status, Verdict::Rejected);
    }
}
