//! Task lifecycle: one unit of orchestrated work owned by the controller.

use crate::ids::{AgentId, SessionId, TaskId};
use crate::value::DataMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Task processing state.
///
/// Transitions are monotonic: `Processing` may only follow `Pending`, and a
/// terminal state may only follow `Processing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Rejected,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Rejected)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Rejected => "REJECTED",
        }
    }
}

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("invalid status transition: {from:?} -> {to:?}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },

    #[error("task must be assigned an agent before processing")]
    Unassigned,
}

/// One asynchronously-executed operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    pub session_id: SessionId,
    pub user_id: String,
    pub channel: String,
    pub intent: String,
    pub status: TaskStatus,
    pub data: DataMap,
    pub context: DataMap,
    pub agent_id: Option<AgentId>,
    pub result: Option<DataMap>,
    pub risk_score: Option<f64>,
    pub explanation: String,
    pub error: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(
        session_id: SessionId,
        user_id: impl Into<String>,
        channel: impl Into<String>,
        intent: impl Into<String>,
        data: DataMap,
        context: DataMap,
    ) -> Self {
        let now = Utc::now();
        Self {
            task_id: TaskId::generate(),
            session_id,
            user_id: user_id.into(),
            channel: channel.into(),
            intent: intent.into(),
            status: TaskStatus::Pending,
            data,
            context,
            agent_id: None,
            result: None,
            risk_score: None,
            explanation: String::new(),
            error: String::new(),
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Assign the executing agent and move to `Processing`.
    pub fn start_processing(&mut self, agent_id: AgentId) -> Result<(), TaskError> {
        if self.status != TaskStatus::Pending {
            return Err(TaskError::InvalidTransition {
                from: self.status,
                to: TaskStatus::Processing,
            });
        }
        self.agent_id = Some(agent_id);
        self.status = TaskStatus::Processing;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Record a terminal outcome. `completed_at` is set exactly here.
    pub fn finish(
        &mut self,
        status: TaskStatus,
        result: Option<DataMap>,
        risk_score: Option<f64>,
        explanation: impl Into<String>,
    ) -> Result<(), TaskError> {
        if !status.is_terminal() {
            return Err(TaskError::InvalidTransition {
                from: self.status,
                to: status,
            });
        }
        // Failed is also reachable straight from Pending when routing finds
        // no agent before the task ever starts processing.
        let reachable = self.status == TaskStatus::Processing
            || (self.status == TaskStatus::Pending && status == TaskStatus::Failed);
        if !reachable {
            return Err(TaskError::InvalidTransition {
                from: self.status,
                to: status,
            });
        }
        let now = Utc::now();
        self.status = status;
        self.result = result;
        self.risk_score = risk_score;
        self.explanation = explanation.into();
        self.updated_at = now;
        self.completed_at = Some(now);
        Ok(())
    }

    /// Record a failure, preserving the error text.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), TaskError> {
        let error = error.into();
        self.finish(TaskStatus::Failed, None, None, error.clone())?;
        self.error = error;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_task() -> Task {
        Task::new(
            SessionId::generate(),
            "U10001",
            "MB",
            "CHECK_BALANCE",
            DataMap::new(),
            DataMap::new(),
        )
    }

    #[test]
    fn lifecycle_pending_processing_completed() {
        let mut task = pending_task();
        task.start_processing(AgentId::generate()).unwrap();
        assert_eq!(task.status, TaskStatus::Processing);
        task.finish(TaskStatus::Completed, Some(DataMap::new()), Some(0.1), "done")
            .unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        let completed = task.completed_at.expect("terminal task has completed_at");
        assert!(completed >= task.created_at);
    }

    #[test]
    fn completion_requires_processing() {
        let mut task = pending_task();
        let err = task
            .finish(TaskStatus::Completed, None, None, "early")
            .unwrap_err();
        assert!(matches!(err, TaskError::InvalidTransition { .. }));
    }

    #[test]
    fn failure_allowed_before_assignment() {
        let mut task = pending_task();
        task.fail("No agent available").unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.error, "No agent available");
        assert!(task.completed_at.is_some());
    }

    #[test]
    fn processing_twice_is_rejected() {
        let mut task = pending_task();
        task.start_processing(AgentId::generate()).unwrap();
        assert!(task.start_processing(AgentId::generate()).is_err());
    }
}
