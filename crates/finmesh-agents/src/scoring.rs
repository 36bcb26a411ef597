//! Scoring agent: credit, fraud and unified risk scoring.
//!
//! Each sub-mode tries its ML endpoint first and falls back to the
//! deterministic rules. The fraud sub-mode shares the fraud agent's
//! indicator table so the two paths cannot drift.

use crate::clients::MlClient;
use crate::fraud::{fraud_verdict, score_indicators};
use crate::runtime::Agent;
use async_trait::async_trait;
use finmesh_types::{map_f64, map_str, AgentKind, AgentRequest, AgentResponse, DataMap, Verdict};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

/// Feature defaults applied when the unified risk payload is missing a
/// field. Matched by the ML service's own imputation table.
const RISK_FEATURE_DEFAULTS: &[(&str, f64)] = &[
    ("credit_score", 650.0),
    ("amount", 0.0),
    ("beneficiary_age_days", 30.0),
    ("transaction_count_24h", 0.0),
    ("device_risk", 0.0),
    ("location_risk", 0.0),
    ("hour", 12.0),
    ("monthly_income", 50_000.0),
    ("balance", 100_000.0),
    ("delinquencies", 0.0),
];

pub struct ScoringAgent {
    ml: Arc<MlClient>,
}

impl ScoringAgent {
    pub fn new(ml: Arc<MlClient>) -> Self {
        Self { ml }
    }

    async fn credit(&self, request: &AgentRequest) -> AgentResponse {
        let data = &request.input_context.data;
        let context = &request.input_context.context;

        let (score, source) = match self.ml.predict("/scoring/credit", &merge_features(data, context)).await
        {
            Ok(result) => match result.get("credit_score").and_then(Value::as_f64) {
                Some(score) => (score.clamp(300.0, 850.0), "ml"),
                None => (rule_credit_score(data, context), "rules"),
            },
            Err(err) => {
                warn!(error = %err, "credit prediction unavailable, using rule-based score");
                (rule_credit_score(data, context), "rules")
            }
        };
        let risk = 1.0 - score / 850.0;

        let mut result = DataMap::new();
        result.insert("score_type".to_string(), Value::from("CREDIT"));
        result.insert("credit_score".to_string(), json!(score.round()));
        result.insert("model".to_string(), Value::from(source));
        result.insert("tier".to_string(), Value::from(credit_tier(score)));

        AgentResponse::new(request, AgentKind::Scoring, Verdict::Approved)
            .with_result(result)
            .with_risk(risk)
            .with_confidence(0.85)
            .with_explanation(format!("credit score {}", score.round()))
    }

    async fn fraud(&self, request: &AgentRequest) -> AgentResponse {
        let data = &request.input_context.data;
        let context = &request.input_context.context;
        let scored = score_indicators(data, context);
        let (verdict, recommendation) = fraud_verdict(scored.score);

        let mut result = DataMap::new();
        result.insert("score_type".to_string(), Value::from("FRAUD"));
        result.insert("fraud_score".to_string(), json!(scored.score));
        result.insert("flags".to_string(), json!(scored.flags));
        result.insert("recommendation".to_string(), Value::from(recommendation));

        AgentResponse::new(request, AgentKind::Scoring, verdict)
            .with_result(result)
            .with_risk(scored.score)
            .with_confidence(0.85)
            .with_explanation(format!("fraud score {:.2}", scored.score))
    }

    async fn risk(&self, request: &AgentRequest) -> AgentResponse {
        let data = &request.input_context.data;
        let context = &request.input_context.context;

        let mut features = merge_features(data, context);
        for (key, default) in RISK_FEATURE_DEFAULTS {
            features.entry(key.to_string()).or_insert_with(|| json!(default));
        }

        let (score, source) = match self.ml.predict("/scoring/risk", &features).await {
            Ok(result) => match result.get("risk_score").and_then(Value::as_f64) {
                Some(score) => (score.clamp(0.0, 1.0), "ml"),
                None => (blended_risk(&features, data, context), "rules"),
            },
            Err(err) => {
                warn!(error = %err, "risk prediction unavailable, using blended rules");
                (blended_risk(&features, data, context), "rules")
            }
        };
        let (verdict, _) = fraud_verdict(score);

        let mut result = DataMap::new();
        result.insert("score_type".to_string(), Value::from("RISK"));
        result.insert("risk_score".to_string(), json!(score));
        result.insert("model".to_string(), Value::from(source));
        result.insert(
            "risk_level".to_string(),
            Value::from(if score > 0.7 {
                "HIGH"
            } else if score > 0.4 {
                "MEDIUM"
            } else {
                "LOW"
            }),
        );

        AgentResponse::new(request, AgentKind::Scoring, verdict)
            .with_result(result)
            .with_risk(score)
            .with_confidence(0.85)
            .with_explanation(format!("unified risk {score:.2}"))
    }
}

#[async_trait]
impl Agent for ScoringAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Scoring
    }

    async fn process(&self, request: &AgentRequest) -> AgentResponse {
        let score_type = map_str(&request.input_context.data, "score_type")
            .map(|t| t.to_ascii_uppercase())
            .unwrap_or_else(|| "RISK".to_string());
        match score_type.as_str() {
            "CREDIT" => self.credit(request).await,
            "FRAUD" => self.fraud(request).await,
            _ => self.risk(request).await,
        }
    }
}

/// Rule-based credit score: baseline 600 plus account age (≤ +50), income
/// (≤ +100), balance (≤ +50) and repaid-loan history (≤ +50), minus 20 per
/// delinquency; clipped to the bureau range 300..850.
fn rule_credit_score(data: &DataMap, context: &DataMap) -> f64 {
    let read = |key: &str| map_f64(data, key).or_else(|| map_f64(context, key));

    let mut score = 600.0;
    let account_age_days = read("account_age_days").unwrap_or(0.0);
    score += (account_age_days / 365.0 * 10.0).min(50.0);
    let income = read("monthly_income").or_else(|| read("income")).unwrap_or(0.0);
    score += (income / 10_000.0).min(100.0);
    let balance = read("balance").unwrap_or(0.0);
    score += (balance / 50_000.0 * 10.0).min(50.0);
    let repaid = read("repaid_loans").unwrap_or(0.0);
    score += (repaid * 10.0).min(50.0);
    let delinquencies = read("delinquencies").unwrap_or(0.0);
    score -= delinquencies * 20.0;

    score.clamp(300.0, 850.0)
}

fn credit_tier(score: f64) -> &'static str {
    if score >= 750.0 {
        "PRIME"
    } else if score >= 700.0 {
        "NEAR_PRIME"
    } else if score >= 600.0 {
        "SUBPRIME"
    } else {
        "DEEP_SUBPRIME"
    }
}

/// Weighted blend used when the unified ML endpoint is unavailable:
/// 0.4·credit + 0.4·fraud + 0.2·amount.
fn blended_risk(features: &DataMap, data: &DataMap, context: &DataMap) -> f64 {
    let credit_score = map_f64(features, "credit_score").unwrap_or(650.0);
    let credit_risk = (1.0 - credit_score / 850.0).clamp(0.0, 1.0);
    let fraud_risk = score_indicators(data, context).score;
    let amount = map_f64(features, "amount").unwrap_or(0.0);
    let amount_risk = (amount / 200_000.0).clamp(0.0, 1.0);
    (0.4 * credit_risk + 0.4 * fraud_risk + 0.2 * amount_risk).clamp(0.0, 1.0)
}

fn merge_features(data: &DataMap, context: &DataMap) -> DataMap {
    let mut features = DataMap::new();
    for (key, value) in context.iter().chain(data.iter()) {
        if value.is_number() || value.is_string() || value.is_boolean() {
            features.insert(key.clone(), value.clone());
        }
    }
    features
}
