//! Task lifecycle management on the durable-fallback store.
//!
//! The background worker is the only writer for a given task id, so status
//! transitions are totally ordered; the guards here are the backstop that
//! turns an ordering bug into an error instead of silent corruption.

use finmesh_store::{FallbackMap, RemoteKv, TASK_REMOTE_TTL};
use finmesh_types::{AgentId, DataMap, Task, TaskError, TaskId, TaskStatus};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum TaskManagerError {
    #[error("task {0} not found")]
    NotFound(TaskId),

    #[error(transparent)]
    Lifecycle(#[from] TaskError),
}

/// Owns the canonical task map.
pub struct TaskManager {
    tasks: FallbackMap<Task>,
}

impl TaskManager {
    pub async fn connect(remote: Option<Arc<dyn RemoteKv>>) -> Self {
        Self {
            tasks: FallbackMap::connect("task", remote, Some(TASK_REMOTE_TTL)).await,
        }
    }

    pub fn in_memory() -> Self {
        Self {
            tasks: FallbackMap::in_memory("task"),
        }
    }

    /// Persist a new task in `Pending`.
    pub async fn create(&self, task: Task) -> Task {
        info!(task_id = %task.task_id, intent = %task.intent, "task created");
        self.tasks.put(task.task_id.as_str(), task.clone()).await;
        task
    }

    pub async fn get(&self, task_id: &TaskId) -> Result<Task, TaskManagerError> {
        self.tasks
            .get(task_id.as_str())
            .await
            .ok_or_else(|| TaskManagerError::NotFound(task_id.clone()))
    }

    /// Assign an agent and move the task to `Processing`.
    pub async fn start_processing(
        &self,
        task_id: &TaskId,
        agent_id: AgentId,
    ) -> Result<(), TaskManagerError> {
        self.apply(task_id, |task| task.start_processing(agent_id))
            .await
    }

    /// Record a successful or rejected outcome with `completed_at` set.
    pub async fn finish(
        &self,
        task_id: &TaskId,
        status: TaskStatus,
        result: DataMap,
        risk_score: f64,
        explanation: String,
    ) -> Result<(), TaskManagerError> {
        self.apply(task_id, |task| {
            task.finish(status, Some(result), Some(risk_score), explanation)
        })
        .await
    }

    /// Mark the task failed, preserving the error text.
    pub async fn fail(&self, task_id: &TaskId, error: String) -> Result<(), TaskManagerError> {
        self.apply(task_id, |task| task.fail(error)).await
    }

    async fn apply(
        &self,
        task_id: &TaskId,
        mutate: impl FnOnce(&mut Task) -> Result<(), TaskError>,
    ) -> Result<(), TaskManagerError> {
        let outcome = self
            .tasks
            .update(task_id.as_str(), mutate)
            .await
            .ok_or_else(|| TaskManagerError::NotFound(task_id.clone()))?;
        outcome.map_err(TaskManagerError::from)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finmesh_types::SessionId;

    fn new_task() -> Task {
        Task::new(
            SessionId::generate(),
            "U10001",
            "MB",
            "TRANSFER_NEFT",
            DataMap::new(),
            DataMap::new(),
        )
    }

    #[tokio::test]
    async fn full_lifecycle_is_observable() {
        let manager = TaskManager::in_memory();
        let task = manager.create(new_task()).await;

        manager
            .start_processing(&task.task_id, AgentId::generate())
            .await
            .unwrap();
        let observed = manager.get(&task.task_id).await.unwrap();
        assert_eq!(observed.status, TaskStatus::Processing);
        assert!(observed.agent_id.is_some());

        manager
            .finish(
                &task.task_id,
                TaskStatus::Completed,
                DataMap::new(),
                0.1,
                "balance returned".to_string(),
            )
            .await
            .unwrap();
        let done = manager.get(&task.task_id).await.unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
        assert!(done.completed_at.unwrap() >= done.created_at);
    }

    #[tokio::test]
    async fn terminal_states_are_final() {
        let manager = TaskManager::in_memory();
        let task = manager.create(new_task()).await;
        manager.fail(&task.task_id, "No agent available".to_string()).await.unwrap();

        let err = manager
            .start_processing(&task.task_id, AgentId::generate())
            .await
            .unwrap_err();
        assert!(matches!(err, TaskManagerError::Lifecycle(_)));
        let observed = manager.get(&task.task_id).await.unwrap();
        assert_eq!(observed.status, TaskStatus::Failed);
        assert_eq!(observed.error, "No agent available");
    }

    #[tokio::test]
    async fn unknown_task_is_not_found() {
        let manager = TaskManager::in_memory();
        assert!(manager.get(&TaskId::generate()).await.is_err());
    }
}
