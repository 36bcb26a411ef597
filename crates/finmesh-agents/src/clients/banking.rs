//! Banking-integrations service client.
//!
//! Covers balance, statement, transfer and beneficiary operations plus the
//! data-warehouse history read. 200 and 201 both count as success (the
//! create endpoints return 201). Failures surface as errors; agents answer
//! them with deterministic mock responses of identical shape.

use finmesh_config::BankingConfig;
use finmesh_types::DataMap;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BankingError {
    #[error("banking integrations are disabled")]
    Disabled,

    #[error("banking request failed: {0}")]
    Request(String),

    #[error("banking service returned {0}")]
    Status(u16),

    #[error("banking response was not an object")]
    InvalidBody,
}

pub struct BankingClient {
    config: BankingConfig,
    client: reqwest::Client,
}

impl BankingClient {
    pub fn new(config: BankingConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client construction cannot fail with static options");
        Self { config, client }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub async fn balance(&self, user_id: &str, account: Option<&str>) -> Result<DataMap, BankingError> {
        let mut payload = DataMap::new();
        payload.insert("user_id".to_string(), Value::from(user_id));
        if let Some(account) = account {
            payload.insert("account_number".to_string(), Value::from(account));
        }
        self.post("/balance", &payload).await
    }

    pub async fn statement(&self, user_id: &str, days: u32) -> Result<DataMap, BankingError> {
        let mut payload = DataMap::new();
        payload.insert("user_id".to_string(), Value::from(user_id));
        payload.insert("days".to_string(), Value::from(days));
        self.post("/statement", &payload).await
    }

    pub async fn transfer(&self, payload: &DataMap) -> Result<DataMap, BankingError> {
        self.post("/transfer", payload).await
    }

    pub async fn add_beneficiary(&self, payload: &DataMap) -> Result<DataMap, BankingError> {
        self.post("/beneficiary", payload).await
    }

    /// Read up to `days` of transaction history from the warehouse.
    pub async fn history(&self, user_id: &str, days: u32) -> Result<Vec<Value>, BankingError> {
        if !self.config.enabled {
            return Err(BankingError::Disabled);
        }
        let url = format!(
            "{}/api/v1/dwh/history/{}?days={}",
            self.config.base_url.trim_end_matches('/'),
            user_id,
            days
        );
        let mut request = self.client.get(&url);
        if let Some(api_key) = &self.config.api_key {
            request = request.header("X-API-Key", api_key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| BankingError::Request(e.to_string()))?;
        let status = response.status().as_u16();
        if status != 200 && status != 201 {
            return Err(BankingError::Status(status));
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| BankingError::Request(e.to_string()))?;
        match body {
            Value::Array(rows) => Ok(rows),
            Value::Object(mut object) => match object.remove("transactions") {
                Some(Value::Array(rows)) => Ok(rows),
                _ => Err(BankingError::InvalidBody),
            },
            _ => Err(BankingError::InvalidBody),
        }
    }

    async fn post(&self, path: &str, payload: &DataMap) -> Result<DataMap, BankingError> {
        if !self.config.enabled {
            return Err(BankingError::Disabled);
        }
        let url = format!("{}/api/v1{}", self.config.base_url.trim_end_matches('/'), path);
        let mut request = self.client.post(&url).json(payload);
        if let Some(api_key) = &self.config.api_key {
            request = request.header("X-API-Key", api_key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| BankingError::Request(e.to_string()))?;
        let status = response.status().as_u16();
        if status != 200 && status != 201 {
            return Err(BankingError::Status(status));
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| BankingError::Request(e.to_string()))?;
        match body {
            Value::Object(map) => Ok(map),
            _ => Err(BankingError::InvalidBody),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_client_fails_fast() {
        let client = BankingClient::new(BankingConfig {
            enabled: false,
            base_url: "http://localhost:7000".to_string(),
            api_key: None,
        });
        assert!(matches!(
            client.balance("U1", None).await,
            Err(BankingError::Disabled)
        ));
        assert!(matches!(client.history("U1", 90).await, Err(BankingError::Disabled)));
    }
}
