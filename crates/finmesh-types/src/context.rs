//! Enriched user context consumed by the router and the agents.

use crate::ids::SessionId;
use crate::intent::Intent;
use crate::value::DataMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse risk classification used by routing rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }

    /// Level derived purely from the transaction amount.
    pub fn from_amount(amount: f64) -> Self {
        if amount > 100_000.0 {
            Self::High
        } else if amount > 50_000.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            other => Err(format!("unknown risk level '{other}'")),
        }
    }
}

/// User profile snapshot attached during enrichment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub account_age_days: u32,
    pub balance: f64,
    pub credit_score: u32,
    pub kyc_status: String,
    pub account_type: String,
    pub transaction_count: u32,
}

/// One historical transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub transaction_id: String,
    pub amount: f64,
    pub transaction_type: String,
    pub channel: String,
    pub beneficiary: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Behavioral aggregates computed from transaction history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BehaviorSummary {
    pub average_amount: f64,
    /// Hour-of-day histogram, 24 buckets.
    pub peak_hours: Vec<u32>,
    pub common_channels: Vec<String>,
    pub frequent_beneficiaries: Vec<String>,
    pub anomaly_detected: bool,
}

/// Risk sub-scores attached during enrichment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskIndicators {
    pub overall_level: RiskLevel,
    pub fraud_risk: f64,
    pub credit_risk: f64,
    pub velocity_risk: f64,
    pub amount_risk: f64,
    pub device_risk: f64,
    pub location_risk: f64,
}

impl Default for RiskIndicators {
    fn default() -> Self {
        Self {
            overall_level: RiskLevel::Low,
            fraud_risk: 0.0,
            credit_risk: 0.0,
            velocity_risk: 0.0,
            amount_risk: 0.0,
            device_risk: 0.0,
            location_risk: 0.0,
        }
    }
}

/// The payload the router and agents consume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedContext {
    pub user_id: String,
    pub session_id: SessionId,
    pub channel: String,
    pub intent: Intent,
    pub profile: UserProfile,
    pub history: Vec<TransactionRecord>,
    pub behavior: BehaviorSummary,
    pub risk: RiskIndicators,
    pub metadata: DataMap,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_level_amount_thresholds() {
        assert_eq!(RiskLevel::from_amount(50_000.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_amount(50_001.0), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_amount(100_001.0), RiskLevel::High);
    }
}
