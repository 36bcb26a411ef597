//! Task orchestration: the linear pipeline
//! route → execute → (maybe) execute-next → persist.
//!
//! Submission returns as soon as the task is persisted in `Pending`; a
//! spawned worker performs routing, agent invocation and transfer chaining.
//! Any failure after task creation moves the task to `Failed` with the
//! error preserved.

use crate::invoke::AgentInvoker;
use finmesh_registry::AgentRegistry;
use finmesh_router::ContextRouter;
use finmesh_state::{SessionManager, TaskManager};
use finmesh_types::{
    map_bool, map_str, AgentKind, AgentRequest, AgentResponse, InputContext, IntentLabel, Session,
    Task, TaskId, TaskStatus, Verdict,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct Orchestrator {
    pub sessions: Arc<SessionManager>,
    pub tasks: Arc<TaskManager>,
    pub registry: Arc<AgentRegistry>,
    pub router: Arc<ContextRouter>,
    pub invoker: Arc<AgentInvoker>,
}

impl Orchestrator {
    /// Accept a request: resolve the session, persist the task in
    /// `Pending`, and hand execution to a background worker. Returns the
    /// created task together with its session.
    pub async fn submit(self: &Arc<Self>, mut task: Task) -> (Task, Session) {
        let session = self
            .sessions
            .resolve(
                Some(task.session_id.clone()).filter(|id| !id.as_str().is_empty()),
                &task.user_id,
                &task.channel,
            )
            .await;
        task.session_id = session.session_id.clone();
        let task = self.tasks.create(task).await;

        // Best-effort history append; a session raced to expiry must not
        // block the task.
        if let Err(err) = self
            .sessions
            .record_task(&session.session_id, task.task_id.clone())
            .await
        {
            warn!(error = %err, "could not append task to session history");
        }

        let orchestrator = Arc::clone(self);
        let task_id = task.task_id.clone();
        tokio::spawn(async move {
            orchestrator.execute(task_id).await;
        });

        (task, session)
    }

    /// Background execution for one task. Never panics the worker; every
    /// failure path lands in task state.
    async fn execute(&self, task_id: TaskId) {
        if let Err(err) = self.try_execute(&task_id).await {
            error!(task_id = %task_id, error = %err, "task execution failed");
            if let Err(persist_err) = self.tasks.fail(&task_id, err).await {
                error!(task_id = %task_id, error = %persist_err, "could not persist task failure");
            }
        }
    }

    async fn try_execute(&self, task_id: &TaskId) -> Result<(), String> {
        let task = self
            .tasks
            .get(task_id)
            .await
            .map_err(|err| err.to_string())?;
        let session = self
            .sessions
            .get(&task.session_id)
            .await
            .unwrap_or_else(|_| {
                // The session may have expired between submission and
                // execution; routing only needs its channel.
                Session::new(task.user_id.clone(), task.channel.clone(), chrono::Duration::hours(1))
            });

        let decision = self.router.route(&task, &session);
        let Some(agent_id) = decision.agent_id.clone() else {
            return Err("No agent available".to_string());
        };

        self.tasks
            .start_processing(task_id, agent_id.clone())
            .await
            .map_err(|err| err.to_string())?;

        let registration = self
            .registry
            .get(&agent_id)
            .await
            .map_err(|err| err.to_string())?;

        let request = AgentRequest::new(
            agent_id,
            task.intent.clone(),
            InputContext {
                user_id: task.user_id.clone(),
                session_id: task.session_id.clone(),
                channel: task.channel.clone(),
                intent: task.intent.clone(),
                data: task.data.clone(),
                context: task.context.clone(),
            },
        );

        let mut response = self
            .invoker
            .invoke(&registration, &request)
            .await
            .map_err(|err| err.to_string())?;

        // Transfer chaining: a Guardrail approval hands the same request to
        // a Banking agent, whose response replaces the Guardrail's.
        let intent = IntentLabel::classify(&task.intent);
        if intent.is_transfer()
            && registration.agent_type == AgentKind::Guardrail
            && guardrail_approved(&response)
        {
            match self.registry.first_of_kind(AgentKind::Banking) {
                Some(banking) => {
                    info!(task_id = %task_id, banking_agent = %banking.agent_id, "guardrail approved, chaining to banking");
                    let mut chained = request.clone();
                    chained.agent_id = banking.agent_id.clone();
                    response = self
                        .invoker
                        .invoke(&banking, &chained)
                        .await
                        .map_err(|err| err.to_string())?;
                }
                None => {
                    warn!(task_id = %task_id, "guardrail approved but no banking agent registered");
                }
            }
        }

        self.persist_outcome(task_id, response).await
    }

    async fn persist_outcome(
        &self,
        task_id: &TaskId,
        response: AgentResponse,
    ) -> Result<(), String> {
        let mut result = response.result.clone();
        result.insert(
            "status".to_string(),
            Value::from(response.status.as_str()),
        );
        result.insert(
            "agent_type".to_string(),
            Value::from(response.agent_type.as_str()),
        );
        result.insert(
            "agent_id".to_string(),
            Value::from(response.agent_id.to_string()),
        );
        result.insert("confidence".to_string(), Value::from(response.confidence));

        let status = match response.status {
            Verdict::Rejected => TaskStatus::Rejected,
            Verdict::Approved | Verdict::Pending => TaskStatus::Completed,
        };
        self.tasks
            .finish(
                task_id,
                status,
                result,
                response.risk_score,
                response.explanation,
            )
            .await
            .map_err(|err| err.to_string())
    }
}

/// Either co-existing approval signal clears the chaining gate.
fn guardrail_approved(response: &AgentResponse) -> bool {
    let by_status = map_str(&response.result, "status")
        .map(|status| status.eq_ignore_ascii_case("APPROVED"))
        .unwrap_or(false);
    let by_flag = map_bool(&response.result, "all_passed").unwrap_or(false);
    by_status || by_flag
}
