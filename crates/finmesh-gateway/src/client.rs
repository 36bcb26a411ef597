//! Task controller client: submit and poll.

use finmesh_config::{ControllerConfig, PollConfig};
use finmesh_types::DataMap;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("controller request failed: {0}")]
    Request(String),

    #[error("controller returned {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Debug, Deserialize)]
pub struct SubmitAck {
    pub task_id: String,
    pub session_id: String,
    pub status: String,
}

/// One observation of a task's result endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskResultView {
    pub task_id: String,
    pub status: String,
    #[serde(default)]
    pub result: Option<DataMap>,
    #[serde(default)]
    pub risk_score: Option<f64>,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub error: String,
}

impl TaskResultView {
    pub fn is_terminal(&self) -> bool {
        !matches!(self.status.as_str(), "PENDING" | "PROCESSING")
    }
}

pub struct ControllerClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    poll: PollConfig,
}

impl ControllerClient {
    pub fn new(config: &ControllerConfig, poll: PollConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .expect("reqwest client construction cannot fail with static options");
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            poll,
        }
    }

    pub async fn submit_task(
        &self,
        session_id: Option<&str>,
        user_id: &str,
        channel: &str,
        intent: &str,
        data: DataMap,
        context: DataMap,
    ) -> Result<SubmitAck, ControllerError> {
        let payload = json!({
            "session_id": session_id,
            "user_id": user_id,
            "channel": channel,
            "intent": intent,
            "data": data,
            "context": context,
        });
        let response = self
            .client
            .post(format!("{}/api/v1/submit-task", self.base_url))
            .header("X-API-Key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ControllerError::Request(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ControllerError::Status {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json()
            .await
            .map_err(|e| ControllerError::Request(e.to_string()))
    }

    /// Poll the result endpoint on the configured cadence, returning the
    /// last observation even if the task is still processing.
    pub async fn poll_result(&self, task_id: &str) -> Result<TaskResultView, ControllerError> {
        let mut last = self.get_result(task_id).await?;
        for attempt in 0..self.poll.retries {
            if last.is_terminal() {
                return Ok(last);
            }
            debug!(task_id, attempt, status = %last.status, "task still running");
            tokio::time::sleep(self.poll.interval()).await;
            last = self.get_result(task_id).await?;
        }
        Ok(last)
    }

    async fn get_result(&self, task_id: &str) -> Result<TaskResultView, ControllerError> {
        let response = self
            .client
            .get(format!("{}/api/v1/get-result/{task_id}", self.base_url))
            .header("X-API-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| ControllerError::Request(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ControllerError::Status {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json()
            .await
            .map_err(|e| ControllerError::Request(e.to_string()))
    }
}
