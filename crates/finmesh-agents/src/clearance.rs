//! Clearance agent: loan decision engine.
//!
//! Deterministic credit-tier gating plus standard EMI amortization. MANUAL
//! outcomes surface as Pending verdicts with the review conditions listed
//! in the result.

use crate::runtime::Agent;
use async_trait::async_trait;
use finmesh_types::{
    map_f64, map_str, AgentKind, AgentRequest, AgentResponse, DataMap, Verdict,
};
use serde_json::{json, Value};

/// Loan kind caps and tenure multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoanKind {
    Home,
    Auto,
    Personal,
}

impl LoanKind {
    fn parse(raw: Option<String>) -> Self {
        match raw.as_deref().map(str::to_ascii_uppercase).as_deref() {
            Some("HOME") | Some("HOME_LOAN") => Self::Home,
            Some("AUTO") | Some("CAR") | Some("VEHICLE") => Self::Auto,
            _ => Self::Personal,
        }
    }

    fn cap(self) -> f64 {
        match self {
            Self::Home => 5_000_000.0,
            Self::Auto => 2_000_000.0,
            Self::Personal => 1_000_000.0,
        }
    }

    /// Income multiplier backbone; scaled further by credit tier.
    fn income_multiplier(self) -> f64 {
        match self {
            Self::Home => 60.0,
            Self::Auto => 36.0,
            Self::Personal => 24.0,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Home => "HOME",
            Self::Auto => "AUTO",
            Self::Personal => "PERSONAL",
        }
    }
}

/// Annual interest rate for a credit tier.
fn interest_rate(credit_score: f64) -> f64 {
    if credit_score >= 750.0 {
        7.5
    } else if credit_score >= 700.0 {
        8.5
    } else {
        10.0
    }
}

/// Standard amortization: P·r·(1+r)ⁿ / ((1+r)ⁿ − 1) with monthly r.
pub fn monthly_emi(principal: f64, annual_rate_pct: f64, tenure_months: u32) -> f64 {
    if tenure_months == 0 {
        return principal;
    }
    let r = annual_rate_pct / 12.0 / 100.0;
    if r == 0.0 {
        return principal / f64::from(tenure_months);
    }
    let factor = (1.0 + r).powi(tenure_months as i32);
    principal * r * factor / (factor - 1.0)
}

pub struct ClearanceAgent;

impl ClearanceAgent {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ClearanceAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for ClearanceAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Clearance
    }

    async fn process(&self, request: &AgentRequest) -> AgentResponse {
        let data = &request.input_context.data;
        let context = &request.input_context.context;

        let requested = map_f64(data, "loan_amount")
            .or_else(|| map_f64(data, "amount"))
            .unwrap_or(0.0);
        if requested <= 0.0 {
            return AgentResponse::new(request, AgentKind::Clearance, Verdict::Rejected)
                .with_risk(0.0)
                .with_explanation("loan amount must be a positive number");
        }
        let income = map_f64(data, "monthly_income")
            .or_else(|| map_f64(data, "income"))
            .or_else(|| map_f64(context, "monthly_income"))
            .unwrap_or(0.0);
        let credit_score = map_f64(context, "credit_score")
            .or_else(|| map_f64(data, "credit_score"))
            .unwrap_or(650.0);
        let tenure_months = map_f64(data, "tenure_months").unwrap_or(60.0).max(1.0) as u32;
        let kind = LoanKind::parse(map_str(data, "loan_type"));

        let risk = (1.0 - credit_score / 850.0).clamp(0.0, 1.0);

        if credit_score < 600.0 {
            let mut result = DataMap::new();
            result.insert("decision".to_string(), Value::from("REJECTED"));
            result.insert("credit_score".to_string(), json!(credit_score));
            return AgentResponse::new(request, AgentKind::Clearance, Verdict::Rejected)
                .with_result(result)
                .with_risk(risk)
                .with_confidence(0.9)
                .with_explanation(format!("credit score {credit_score} is below the 600 floor"));
        }

        let mut conditions: Vec<&str> = Vec::new();
        if credit_score < 700.0 {
            conditions.push("SUBPRIME_CREDIT_TIER");
        }

        let rate = interest_rate(credit_score);
        // Tier scaling: stronger scores unlock a larger income multiple.
        let tier_scale = if credit_score >= 750.0 {
            1.2
        } else if credit_score >= 700.0 {
            1.0
        } else {
            0.8
        };
        let eligible = (income * kind.income_multiplier() * tier_scale).min(kind.cap());
        let approved_amount = requested.min(eligible);

        let emi = monthly_emi(approved_amount, rate, tenure_months);
        let emi_ratio = if income > 0.0 { emi / income } else { 1.0 };

        if emi_ratio > 0.5 {
            let mut result = DataMap::new();
            result.insert("decision".to_string(), Value::from("REJECTED"));
            result.insert("emi".to_string(), json!(round2(emi)));
            result.insert("emi_ratio".to_string(), json!(round2(emi_ratio)));
            return AgentResponse::new(request, AgentKind::Clearance, Verdict::Rejected)
                .with_result(result)
                .with_risk(risk.max(0.6))
                .with_confidence(0.9)
                .with_explanation(format!(
                    "EMI {:.0} would consume {:.0}% of monthly income",
                    emi,
                    emi_ratio * 100.0
                ));
        }
        if emi_ratio > 0.4 {
            conditions.push("HIGH_EMI_RATIO");
        }

        let manual = !conditions.is_empty();
        let decision = if manual { "MANUAL" } else { "APPROVED" };

        let mut result = DataMap::new();
        result.insert("decision".to_string(), Value::from(decision));
        result.insert("loan_type".to_string(), Value::from(kind.as_str()));
        result.insert("requested_amount".to_string(), json!(requested));
        result.insert("approved_amount".to_string(), json!(round2(approved_amount)));
        result.insert("interest_rate".to_string(), json!(rate));
        result.insert("tenure_months".to_string(), json!(tenure_months));
        result.insert("emi".to_string(), json!(round2(emi)));
        result.insert("emi_ratio".to_string(), json!(round2(emi_ratio)));
        result.insert("conditions".to_string(), json!(conditions));

        let verdict = if manual { Verdict::Pending } else { Verdict::Approved };
        let explanation = if manual {
            format!("loan referred for manual review: {}", conditions.join(", "))
        } else {
            format!("loan approved at {rate}% for {tenure_months} months")
        };

        AgentResponse::new(request, AgentKind::Clearance, verdict)
            .with_result(result)
            .with_risk(risk)
            .with_confidence(0.9)
            .with_explanation(explanation)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
