//! ML prediction service client.
//!
//! Each call posts a JSON feature payload and expects the numeric outputs
//! inside the response's `result` object. Any transport error, non-2xx
//! status or missing field is a failure; callers fall back to their
//! deterministic rules.

use finmesh_config::MlConfig;
use finmesh_types::DataMap;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MlError {
    #[error("ML predictions are disabled")]
    Disabled,

    #[error("ML request failed: {0}")]
    Request(String),

    #[error("ML service returned {0}")]
    Status(u16),

    #[error("ML response missing result object")]
    MissingResult,
}

pub struct MlClient {
    config: MlConfig,
    client: reqwest::Client,
}

impl MlClient {
    pub fn new(config: MlConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client construction cannot fail with static options");
        Self { config, client }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// POST features to `/api/v1{path}` and return the `result` object.
    pub async fn predict(&self, path: &str, features: &DataMap) -> Result<Value, MlError> {
        if !self.config.enabled {
            return Err(MlError::Disabled);
        }
        let url = format!(
            "{}/api/v1{}",
            self.config.base_url.trim_end_matches('/'),
            path
        );
        let mut request = self.client.post(&url).json(features);
        if let Some(api_key) = &self.config.api_key {
            request = request.header("X-API-Key", api_key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| MlError::Request(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(MlError::Status(status.as_u16()));
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| MlError::Request(e.to_string()))?;
        body.get("result").cloned().ok_or(MlError::MissingResult)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_client_fails_fast() {
        let client = MlClient::new(MlConfig {
            enabled: false,
            base_url: "http://localhost:9000".to_string(),
            api_key: None,
        });
        assert!(matches!(
            client.predict("/fraud/predict", &DataMap::new()).await,
            Err(MlError::Disabled)
        ));
    }
}
