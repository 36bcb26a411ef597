//! Context enrichment: profile, transaction history, behavior summary and
//! risk indicators.

use chrono::{DateTime, Timelike, Utc};
use finmesh_agents::clients::BankingClient;
use finmesh_types::{
    map_f64, BehaviorSummary, DataMap, EnrichedContext, Intent, RiskIndicators, RiskLevel,
    SessionId, TransactionRecord, UserProfile,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Default history window in days.
const HISTORY_DAYS: u32 = 90;

pub struct ContextEnricher {
    banking: Arc<BankingClient>,
}

impl ContextEnricher {
    pub fn new(banking: Arc<BankingClient>) -> Self {
        Self { banking }
    }

    pub async fn enrich(
        &self,
        user_id: &str,
        session_id: SessionId,
        channel: &str,
        intent: Intent,
    ) -> EnrichedContext {
        let profile = self.profile(user_id);
        let history = self.history(user_id, HISTORY_DAYS).await;
        let behavior = summarize_behavior(&history);
        let amount = map_f64(&intent.entities, "amount").unwrap_or(0.0);
        let risk = derive_risk(amount, &behavior, &history);

        EnrichedContext {
            user_id: user_id.to_string(),
            session_id,
            channel: channel.to_string(),
            intent,
            profile,
            history,
            behavior,
            risk,
            metadata: DataMap::new(),
        }
    }

    /// Profile snapshot. The customer-record service is outside the core;
    /// the shape is the contract, the values are a development stub.
    fn profile(&self, user_id: &str) -> UserProfile {
        UserProfile {
            user_id: user_id.to_string(),
            account_age_days: 730,
            balance: 125_000.50,
            credit_score: 720,
            kyc_status: "VERIFIED".to_string(),
            account_type: "SAVINGS".to_string(),
            transaction_count: 45,
        }
    }

    async fn history(&self, user_id: &str, days: u32) -> Vec<TransactionRecord> {
        let rows = match self.banking.history(user_id, days).await {
            Ok(rows) => rows,
            Err(err) => {
                warn!(error = %err, "transaction history unavailable, enriching without it");
                return Vec::new();
            }
        };
        rows.iter().filter_map(parse_record).collect()
    }
}

fn parse_record(row: &Value) -> Option<TransactionRecord> {
    let object = row.as_object()?;
    Some(TransactionRecord {
        transaction_id: object
            .get("transaction_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        amount: map_f64(object, "amount").unwrap_or(0.0),
        transaction_type: object
            .get("transaction_type")
            .or_else(|| object.get("type"))
            .and_then(Value::as_str)
            .unwrap_or("TRANSFER")
            .to_string(),
        channel: object
            .get("channel")
            .and_then(Value::as_str)
            .unwrap_or("MB")
            .to_string(),
        beneficiary: object
            .get("beneficiary")
            .or_else(|| object.get("to_account"))
            .and_then(Value::as_str)
            .map(str::to_string),
        timestamp: object
            .get("timestamp")
            .or_else(|| object.get("date"))
            .and_then(Value::as_str)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|ts| ts.with_timezone(&Utc))
            .unwrap_or_else(Utc::now),
    })
}

/// Aggregate history into the behavior summary the router and agents read.
pub fn summarize_behavior(history: &[TransactionRecord]) -> BehaviorSummary {
    if history.is_empty() {
        return BehaviorSummary {
            peak_hours: vec![0; 24],
            ..BehaviorSummary::default()
        };
    }

    let total: f64 = history.iter().map(|record| record.amount.abs()).sum();
    let average_amount = total / history.len() as f64;

    let mut peak_hours = vec![0u32; 24];
    let mut channels: HashMap<&str, u32> = HashMap::new();
    let mut beneficiaries: HashMap<&str, u32> = HashMap::new();
    for record in history {
        peak_hours[record.timestamp.hour() as usize] += 1;
        *channels.entry(record.channel.as_str()).or_default() += 1;
        if let Some(beneficiary) = &record.beneficiary {
            *beneficiaries.entry(beneficiary.as_str()).or_default() += 1;
        }
    }

    let mut common_channels: Vec<(&str, u32)> = channels.into_iter().collect();
    common_channels.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    let mut frequent_beneficiaries: Vec<(&str, u32)> = beneficiaries
        .into_iter()
        .filter(|(_, count)| *count >= 2)
        .collect();
    frequent_beneficiaries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

    let anomaly_detected = history
        .iter()
        .any(|record| record.amount.abs() > 2.0 * average_amount);

    BehaviorSummary {
        average_amount,
        peak_hours,
        common_channels: common_channels
            .into_iter()
            .map(|(channel, _)| channel.to_string())
            .collect(),
        frequent_beneficiaries: frequent_beneficiaries
            .into_iter()
            .map(|(beneficiary, _)| beneficiary.to_string())
            .collect(),
        anomaly_detected,
    }
}

/// Risk indicators from the amount, behavior anomalies and velocity.
pub fn derive_risk(
    amount: f64,
    behavior: &BehaviorSummary,
    history: &[TransactionRecord],
) -> RiskIndicators {
    let amount_risk = (amount / 200_000.0).clamp(0.0, 1.0);
    let day_ago = Utc::now() - chrono::Duration::hours(24);
    let velocity_count = history
        .iter()
        .filter(|record| record.timestamp >= day_ago)
        .count();
    let velocity_risk = (velocity_count as f64 / 10.0).clamp(0.0, 1.0);
    let fraud_risk = if behavior.anomaly_detected { 0.5 } else { 0.1 };

    RiskIndicators {
        overall_level: RiskLevel::from_amount(amount),
        fraud_risk,
        credit_risk: 0.2,
        velocity_risk,
        amount_risk,
        device_risk: 0.0,
        location_risk: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(amount: f64, hours_ago: i64, beneficiary: Option<&str>) -> TransactionRecord {
        TransactionRecord {
            transaction_id: "t".to_string(),
            amount,
            transaction_type: "TRANSFER".to_string(),
            channel: "MB".to_string(),
            beneficiary: beneficiary.map(str::to_string),
            timestamp: Utc::now() - Duration::hours(hours_ago),
        }
    }

    #[test]
    fn behavior_flags_single_outlier() {
        let history = vec![
            record(1_000.0, 30, Some("ravi")),
            record(1_200.0, 50, Some("ravi")),
            record(900.0, 80, None),
            record(50_000.0, 10, Some("new-payee")),
        ];
        let behavior = summarize_behavior(&history);
        assert!(behavior.anomaly_detected);
        assert_eq!(behavior.frequent_beneficiaries, vec!["ravi".to_string()]);
        assert_eq!(behavior.common_channels, vec!["MB".to_string()]);
    }

    #[test]
    fn uniform_history_has_no_anomaly() {
        let history = vec![
            record(1_000.0, 30, None),
            record(1_100.0, 50, None),
            record(950.0, 70, None),
        ];
        assert!(!summarize_behavior(&history).anomaly_detected);
    }

    #[test]
    fn velocity_risk_counts_last_day_only() {
        let history = vec![
            record(100.0, 1, None),
            record(100.0, 2, None),
            record(100.0, 3, None),
            record(100.0, 200, None),
        ];
        let risk = derive_risk(10_000.0, &summarize_behavior(&history), &history);
        assert!((risk.velocity_risk - 0.3).abs() < 1e-9);
        assert_eq!(risk.overall_level, RiskLevel::Low);
    }

    #[test]
    fn high_amount_drives_overall_level() {
        let risk = derive_risk(150_000.0, &BehaviorSummary::default(), &[]);
        assert_eq!(risk.overall_level, RiskLevel::High);
        assert!((risk.amount_risk - 0.75).abs() < 1e-9);
    }
}
