//! Structured representation of what the user wants done.

use crate::value::DataMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of operations the platform understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentLabel {
    TransferNeft,
    TransferRtgs,
    TransferImps,
    TransferUpi,
    CheckBalance,
    GetStatement,
    AddBeneficiary,
    ApplyLoan,
    CreditScore,
    Conversational,
    Unknown,
}

impl IntentLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TransferNeft => "TRANSFER_NEFT",
            Self::TransferRtgs => "TRANSFER_RTGS",
            Self::TransferImps => "TRANSFER_IMPS",
            Self::TransferUpi => "TRANSFER_UPI",
            Self::CheckBalance => "CHECK_BALANCE",
            Self::GetStatement => "GET_STATEMENT",
            Self::AddBeneficiary => "ADD_BENEFICIARY",
            Self::ApplyLoan => "APPLY_LOAN",
            Self::CreditScore => "CREDIT_SCORE",
            Self::Conversational => "CONVERSATIONAL",
            Self::Unknown => "UNKNOWN",
        }
    }

    pub fn is_transfer(self) -> bool {
        matches!(
            self,
            Self::TransferNeft | Self::TransferRtgs | Self::TransferImps | Self::TransferUpi
        )
    }

    /// Classify a free-form intent label string; anything unrecognized maps
    /// to `Unknown` rather than failing.
    pub fn classify(label: &str) -> Self {
        label.parse().unwrap_or(Self::Unknown)
    }
}

impl fmt::Display for IntentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntentLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TRANSFER_NEFT" => Ok(Self::TransferNeft),
            "TRANSFER_RTGS" => Ok(Self::TransferRtgs),
            "TRANSFER_IMPS" => Ok(Self::TransferImps),
            "TRANSFER_UPI" => Ok(Self::TransferUpi),
            "CHECK_BALANCE" => Ok(Self::CheckBalance),
            "GET_STATEMENT" => Ok(Self::GetStatement),
            "ADD_BENEFICIARY" => Ok(Self::AddBeneficiary),
            "APPLY_LOAN" => Ok(Self::ApplyLoan),
            "CREDIT_SCORE" => Ok(Self::CreditScore),
            "CONVERSATIONAL" => Ok(Self::Conversational),
            "UNKNOWN" => Ok(Self::Unknown),
            other => Err(format!("unknown intent label '{other}'")),
        }
    }
}

/// Parsed user desire: a label, extraction confidence, and entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    pub intent_type: IntentLabel,
    pub confidence: f64,
    pub entities: DataMap,
    pub original_text: String,
}

impl Intent {
    pub fn new(intent_type: IntentLabel, confidence: f64, original_text: impl Into<String>) -> Self {
        Self {
            intent_type,
            confidence: confidence.clamp(0.0, 1.0),
            entities: DataMap::new(),
            original_text: original_text.into(),
        }
    }

    pub fn with_entities(mut self, entities: DataMap) -> Self {
        self.entities = entities;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_labels_are_transfers() {
        assert!(IntentLabel::TransferNeft.is_transfer());
        assert!(IntentLabel::TransferUpi.is_transfer());
        assert!(!IntentLabel::CheckBalance.is_transfer());
    }

    #[test]
    fn classify_never_fails() {
        assert_eq!(IntentLabel::classify("TRANSFER_IMPS"), IntentLabel::TransferImps);
        assert_eq!(IntentLabel::classify("MYSTERY_OP"), IntentLabel::Unknown);
    }
}
