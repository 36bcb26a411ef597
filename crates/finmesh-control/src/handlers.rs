//! Controller HTTP handlers.

use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use finmesh_http::{ApiError, ApiResult};
use finmesh_types::{
    AgentHealth, AgentKind, AgentRegistration, DataMap, SessionId, Task, TaskId, TaskStatus,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

// ── tasks ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SubmitTaskRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    pub user_id: String,
    pub channel: String,
    pub intent: String,
    #[serde(default)]
    pub data: DataMap,
    #[serde(default)]
    pub context: DataMap,
}

#[derive(Debug, Serialize)]
pub struct SubmitTaskResponse {
    pub task_id: String,
    pub session_id: String,
    pub status: &'static str,
    pub message: &'static str,
    pub created_at: DateTime<Utc>,
}

pub async fn submit_task(
    State(state): State<AppState>,
    Json(request): Json<SubmitTaskRequest>,
) -> ApiResult<(StatusCode, Json<SubmitTaskResponse>)> {
    if request.user_id.trim().is_empty() {
        return Err(ApiError::BadRequest("user_id is required".to_string()));
    }
    if request.intent.trim().is_empty() {
        return Err(ApiError::BadRequest("intent is required".to_string()));
    }
    let channel = if request.channel.trim().is_empty() {
        "MB".to_string()
    } else {
        request.channel
    };

    let task = Task::new(
        SessionId::new(request.session_id.unwrap_or_default()),
        request.user_id,
        channel,
        request.intent.trim().to_ascii_uppercase(),
        request.data,
        request.context,
    );
    let (task, session) = state.orchestrator.submit(task).await;

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitTaskResponse {
            task_id: task.task_id.to_string(),
            session_id: session.session_id.to_string(),
            status: "PENDING",
            message: "task accepted for asynchronous processing",
            created_at: task.created_at,
        }),
    ))
}

#[derive(Debug, Serialize)]
pub struct TaskResultResponse {
    pub task_id: String,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<DataMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<f64>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub explanation: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

pub async fn get_result(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<TaskResultResponse>> {
    let task = state
        .tasks
        .get(&TaskId::new(task_id))
        .await
        .map_err(|err| ApiError::NotFound(err.to_string()))?;

    Ok(Json(TaskResultResponse {
        task_id: task.task_id.to_string(),
        status: task.status,
        result: task.result,
        risk_score: task.risk_score,
        explanation: task.explanation,
        error: task.error,
        completed_at: task.completed_at,
    }))
}

// ── agents ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterAgentRequest {
    pub name: String,
    #[serde(alias = "type")]
    pub agent_type: String,
    pub endpoint: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterAgentResponse {
    pub agent_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub agent_type: AgentKind,
    pub status: AgentHealth,
    pub registered_at: DateTime<Utc>,
    pub message: &'static str,
}

pub async fn register_agent(
    State(state): State<AppState>,
    Json(request): Json<RegisterAgentRequest>,
) -> ApiResult<(StatusCode, Json<RegisterAgentResponse>)> {
    if request.name.trim().is_empty() || request.endpoint.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "name and endpoint are required".to_string(),
        ));
    }
    let agent_type: AgentKind = request
        .agent_type
        .parse()
        .map_err(ApiError::BadRequest)?;

    let registration = state
        .registry
        .register(request.name, agent_type, request.endpoint, request.capabilities)
        .await;

    Ok((
        StatusCode::CREATED,
        Json(RegisterAgentResponse {
            agent_id: registration.agent_id.to_string(),
            name: registration.name,
            agent_type: registration.agent_type,
            status: registration.status,
            registered_at: registration.registered_at,
            message: "agent registered",
        }),
    ))
}

pub async fn get_agent(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
) -> ApiResult<Json<AgentRegistration>> {
    state
        .registry
        .get(&finmesh_types::AgentId::new(agent_id))
        .await
        .map(Json)
        .map_err(|err| ApiError::NotFound(err.to_string()))
}

#[derive(Debug, Deserialize)]
pub struct ListAgentsQuery {
    #[serde(rename = "type")]
    pub agent_type: Option<String>,
}

pub async fn list_agents(
    State(state): State<AppState>,
    Query(query): Query<ListAgentsQuery>,
) -> ApiResult<Json<Vec<AgentRegistration>>> {
    let agents = match query.agent_type {
        Some(raw) => {
            let kind: AgentKind = raw
                .parse()
                .map_err(ApiError::BadRequest)?;
            state.registry.find_by_kind(kind)
        }
        None => state.registry.list(),
    };
    Ok(Json(agents))
}

// ── sessions ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub user_id: String,
    pub channel: String,
    #[serde(default)]
    pub context: DataMap,
}

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub user_id: String,
    pub channel: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> ApiResult<(StatusCode, Json<CreateSessionResponse>)> {
    if request.user_id.trim().is_empty() {
        return Err(ApiError::BadRequest("user_id is required".to_string()));
    }
    let session = state
        .sessions
        .create(request.user_id, request.channel, request.context)
        .await;
    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id: session.session_id.to_string(),
            user_id: session.user_id,
            channel: session.channel,
            created_at: session.created_at,
            expires_at: session.expires_at,
        }),
    ))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<finmesh_types::Session>> {
    state
        .sessions
        .get(&SessionId::new(session_id))
        .await
        .map(Json)
        .map_err(|err| ApiError::NotFound(err.to_string()))
}

// ── rules ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct UploadRulesResponse {
    pub merged: usize,
}

pub async fn upload_rules(
    State(state): State<AppState>,
    Json(rules): Json<HashMap<String, Value>>,
) -> ApiResult<Json<UploadRulesResponse>> {
    let merged = state
        .rules
        .upload(rules)
        .map_err(|err| ApiError::BadRequest(err.to_string()))?;
    Ok(Json(UploadRulesResponse { merged }))
}

pub async fn list_rules(
    State(state): State<AppState>,
) -> Json<HashMap<String, finmesh_rules::RoutingRule>> {
    Json(state.rules.snapshot())
}
