//! Fraud agent: weighted-indicator scoring with an ML-first path.

use crate::clients::MlClient;
use crate::runtime::Agent;
use async_trait::async_trait;
use chrono::{Timelike, Utc};
use finmesh_types::{map_f64, AgentKind, AgentRequest, AgentResponse, DataMap, Verdict};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

/// Deterministic indicator evaluation shared with the scoring agent's
/// fraud sub-mode.
#[derive(Debug, Clone)]
pub struct IndicatorScore {
    pub score: f64,
    pub flags: Vec<String>,
}

/// Weighted indicator sum, clipped to [0, 1].
pub fn score_indicators(data: &DataMap, context: &DataMap) -> IndicatorScore {
    let mut score = 0.0;
    let mut flags = Vec::new();

    let amount = map_f64(data, "amount")
        .or_else(|| map_f64(context, "amount"))
        .unwrap_or(0.0);
    if amount > 200_000.0 {
        score += 0.4;
    } else if amount > 100_000.0 {
        score += 0.2;
    } else if amount > 50_000.0 {
        score += 0.1;
    }
    if amount > 50_000.0 {
        flags.push("HIGH_AMOUNT".to_string());
    }

    match map_f64(context, "beneficiary_age_days").or_else(|| map_f64(data, "beneficiary_age_days")) {
        Some(age) if age < 7.0 => {
            score += 0.3;
            flags.push("NEW_BENEFICIARY".to_string());
        }
        Some(_) => {}
        None => {
            score += 0.2;
            flags.push("NEW_BENEFICIARY".to_string());
        }
    }

    let hour = map_f64(context, "hour")
        .or_else(|| map_f64(context, "transaction_hour"))
        .unwrap_or_else(|| f64::from(Utc::now().hour()));
    if hour < 6.0 || hour > 23.0 {
        score += 0.15;
    }

    let device_risk = map_f64(context, "device_risk").unwrap_or(0.0).clamp(0.0, 1.0);
    score += 0.2 * device_risk;
    if device_risk > 0.5 {
        flags.push("DEVICE_ANOMALY".to_string());
    }

    let location_risk = map_f64(context, "location_risk").unwrap_or(0.0).clamp(0.0, 1.0);
    score += 0.15 * location_risk;

    let velocity = map_f64(context, "transaction_count_24h").unwrap_or(0.0);
    if velocity > 10.0 {
        score += 0.25;
        flags.push("HIGH_VELOCITY".to_string());
    } else if velocity > 5.0 {
        score += 0.1;
        flags.push("HIGH_VELOCITY".to_string());
    }

    IndicatorScore {
        score: score.clamp(0.0, 1.0),
        flags,
    }
}

/// Verdict and recommendation derived from the fraud score thresholds.
pub fn fraud_verdict(score: f64) -> (Verdict, &'static str) {
    if score > 0.7 {
        (Verdict::Rejected, "BLOCK_TRANSACTION")
    } else if score > 0.4 {
        (Verdict::Pending, "STEP_UP_AUTH")
    } else {
        (Verdict::Approved, "PROCEED")
    }
}

pub struct FraudAgent {
    ml: Arc<MlClient>,
}

impl FraudAgent {
    pub fn new(ml: Arc<MlClient>) -> Self {
        Self { ml }
    }

    async fn predicted_score(&self, data: &DataMap, context: &DataMap) -> Option<f64> {
        let mut features = DataMap::new();
        for key in [
            "amount",
            "beneficiary_age_days",
            "hour",
            "device_risk",
            "location_risk",
            "transaction_count_24h",
        ] {
            let value = map_f64(data, key).or_else(|| map_f64(context, key));
            if let Some(value) = value {
                features.insert(key.to_string(), json!(value));
            }
        }
        match self.ml.predict("/fraud/predict", &features).await {
            Ok(result) => result
                .get("fraud_score")
                .and_then(Value::as_f64)
                .map(|score| score.clamp(0.0, 1.0)),
            Err(err) => {
                warn!(error = %err, "fraud prediction unavailable, using indicator rules");
                None
            }
        }
    }
}

#[async_trait]
impl Agent for FraudAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Fraud
    }

    async fn process(&self, request: &AgentRequest) -> AgentResponse {
        let data = &request.input_context.data;
        let context = &request.input_context.context;

        let rules = score_indicators(data, context);
        let (score, source) = match self.predicted_score(data, context).await {
            Some(score) => (score, "ml"),
            None => (rules.score, "rules"),
        };
        let (verdict, recommendation) = fraud_verdict(score);

        let mut result = DataMap::new();
        result.insert("fraud_score".to_string(), json!(score));
        result.insert("flags".to_string(), json!(rules.flags));
        result.insert("recommendation".to_string(), Value::from(recommendation));
        result.insert("model".to_string(), Value::from(source));

        AgentResponse::new(request, AgentKind::Fraud, verdict)
            .with_result(result)
            .with_risk(score)
            .with_confidence(0.85)
            .with_explanation(format!(
                "fraud score {score:.2}; recommendation {recommendation}"
            ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finmesh_config::MlConfig;
    use finmesh_types::{AgentId, InputContext, SessionId};

    fn agent() -> FraudAgent {
        FraudAgent::new(Arc::new(MlClient::new(MlConfig {
            enabled: false,
            base_url: "http://localhost:9000".to_string(),
            api_key: None,
        })))
    }

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
    async fn velocity_and_new_beneficiary_force_step_up() {
        let response = agent()
            .process(&request(
                json!({"amount": 50_001}),
                json!({
                    "transaction_count_24h": 11,
                    "beneficiary_age_days": 3,
                    "hour": 12,
                }),
            ))
            .await;
        // 0.1 amount + 0.25 velocity + 0.3 new beneficiary = 0.65
        assert!(response.risk_score >= 0.65);
        assert_eq!(response.status, Verdict::Pending);
        assert_eq!(response.confidence, 0.85);
        let flags = response.result.get("flags").and_then(Value::as_array).unwrap();
        assert!(flags.iter().any(|f| f == "HIGH_VELOCITY"));
        assert!(flags.iter().any(|f| f == "NEW_BENEFICIARY"));
    }

    #[tokio::test]
    async fn very_high_amount_is_blocked() {
        let response = agent()
            .process(&request(
                json!({"amount": 200_001}),
                json!({
                    "transaction_count_24h": 11,
                    "beneficiary_age_days": 3,
                    "hour": 12,
                }),
            ))
            .await;
        assert!(response.risk_score >= 0.95);
        assert_eq!(response.status, Verdict::Rejected);
        assert_eq!(
            response.result.get("recommendation").and_then(Value::as_str),
            Some("BLOCK_TRANSACTION")
        );
    }

    #[tokio::test]
    async fn clean_daytime_transfer_proceeds() {
        let response = agent()
            .process(&request(
                json!({"amount": 5_000}),
                json!({
                    "beneficiary_age_days": 90,
                    "transaction_count_24h": 1,
                    "hour": 14,
                }),
            ))
            .await;
        assert_eq!(response.status, Verdict::Approved);
        assert!(response.risk_score < 0.4);
    }

    #[test]
    fn night_hours_add_risk() {
        let data = DataMap::new();
        let Value::Object(night) = json!({"hour": 2, "beneficiary_age_days": 90}) else {
            unreachable!()
        };
        let Value::Object(day) = json!({"hour": 14, "beneficiary_age_days": 90}) else {
            unreachable!()
        };
        let night_score = score_indicators(&data, &night).score;
        let day_score = score_indicators(&data, &day).score;
        assert!((night_score - day_score - 0.15).abs() < 1e-9);
    }

    #[test]
    fn score_is_clipped_to_one() {
        let Value::Object(data) = json!({"amount": 500_000}) else { unreachable!() };
        let Value::Object(context) = json!({
            "hour": 2,
            "device_risk": 1.0,
            "location_risk": 1.0,
            "transaction_count_24h": 50,
        }) else {
            unreachable!()
        };
        let scored = score_indicators(&data, &context);
        assert_eq!(scored.score, 1.0);
    }
}
