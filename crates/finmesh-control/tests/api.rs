//! Controller HTTP surface tests: submit/poll flows, registration,
//! sessions, rules and the auth boundary.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use finmesh_config::SecurityConfig;
use finmesh_control::{build_router, AppState};
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;

fn security() -> SecurityConfig {
    SecurityConfig {
        api_key_header: "X-API-Key".to_string(),
        api_key: None,
        jwt_secret: None,
        rate_limit_rps: 100,
    }
}

async fn test_app() -> (axum::Router, AppState) {
    let state = AppState::build(None, "dev-key".to_string(), Duration::from_millis(300)).await;
    (build_router(state.clone(), &security()), state)
}

async fn call(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1 << 20).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post(path: &str, body: Value) -> Request<Body> {
    Request::post(path)
        .header("content-type", "application/json")
        .header("X-API-Key", "dev-key")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(path: &str) -> Request<Body> {
    Request::get(path)
        .header("X-API-Key", "dev-key")
        .body(Body::empty())
        .unwrap()
}

async fn register_agent(app: &axum::Router, name: &str, kind: &str) -> String {
    let (status, body) = call(
        app,
        post(
            "/api/v1/register-agent",
            json!({
                "name": name,
                "agent_type": kind,
                // Unroutable endpoint: execution exercises the in-process fallback.
                "endpoint": "http://127.0.0.1:1",
                "capabilities": [],
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["agent_id"].as_str().unwrap().to_string()
}

async fn poll_result(app: &axum::Router, task_id: &str) -> Value {
    for _ in 0..50 {
        let (status, body) = call(app, get(&format!("/api/v1/get-result/{task_id}"))).await;
        assert_eq!(status, StatusCode::OK);
        let state = body["status"].as_str().unwrap().to_string();
        if state != "PENDING" && state != "PROCESSING" {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("task never reached a terminal status");
}

#[tokio::test]
async fn submit_task_returns_202_and_completes() {
    let (app, _) = test_app().await;
    register_agent(&app, "banking", "BANKING").await;

    let (status, body) = call(
        &app,
        post(
            "/api/v1/submit-task",
            json!({"user_id": "U10001", "channel": "MB", "intent": "CHECK_BALANCE", "data": {}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "PENDING");
    let task_id = body["task_id"].as_str().unwrap();

    let result = poll_result(&app, task_id).await;
    assert_eq!(result["status"], "COMPLETED");
    assert!(result["result"]["balance"].is_number());
    assert_eq!(result["result"]["currency"], "INR");
    assert!(result["risk_score"].as_f64().unwrap() <= 0.1);
    assert_eq!(result["result"]["status"], "APPROVED");
}

#[tokio::test]
async fn transfer_chains_through_guardrail_to_banking() {
    let (app, _) = test_app().await;
    register_agent(&app, "banking", "BANKING").await;
    register_agent(&app, "guardrail", "GUARDRAIL").await;

    let (status, body) = call(
        &app,
        post(
            "/api/v1/submit-task",
            json!({
                "user_id": "U10001",
                "channel": "MB",
                "intent": "TRANSFER_NEFT",
                "data": {"amount": 50_000, "to_account": "XXXX4321"},
                "context": {"beneficiary_age_days": 30},
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let result = poll_result(&app, body["task_id"].as_str().unwrap()).await;
    assert_eq!(result["status"], "COMPLETED");
    assert_eq!(result["result"]["agent_type"], "BANKING");
    assert!(result["result"]["transaction_id"].is_string());
}

#[tokio::test]
async fn oversized_transfer_is_rejected_by_guardrail() {
    let (app, _) = test_app().await;
    register_agent(&app, "banking", "BANKING").await;
    register_agent(&app, "guardrail", "GUARDRAIL").await;

    let (_, body) = call(
        &app,
        post(
            "/api/v1/submit-task",
            json!({
                "user_id": "U10001",
                "channel": "MB",
                "intent": "TRANSFER_NEFT",
                "data": {"amount": 250_000, "to_account": "XXXX4321"},
                "context": {"beneficiary_age_days": 30},
            }),
        ),
    )
    .await;

    let result = poll_result(&app, body["task_id"].as_str().unwrap()).await;
    assert_eq!(result["status"], "REJECTED");
    assert_eq!(result["result"]["agent_type"], "GUARDRAIL");
    assert!(result["result"]["transaction_id"].is_null());
}

#[tokio::test]
async fn uploaded_rule_overrides_intent_fallback() {
    let (app, _) = test_app().await;
    register_agent(&app, "banking", "BANKING").await;
    register_agent(&app, "scoring", "SCORING").await;

    let (status, body) = call(
        &app,
        post(
            "/api/v1/rules/upload",
            json!({"intent:TRANSFER_IMPS": {"agent_type": "SCORING", "confidence": 0.95}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["merged"], 1);

    let (_, body) = call(
        &app,
        post(
            "/api/v1/submit-task",
            json!({
                "user_id": "U10001",
                "channel": "MB",
                "intent": "TRANSFER_IMPS",
                "data": {"amount": 1_000, "score_type": "RISK"},
                "context": {"beneficiary_age_days": 30},
            }),
        ),
    )
    .await;
    let result = poll_result(&app, body["task_id"].as_str().unwrap()).await;
    assert_eq!(result["result"]["agent_type"], "SCORING");
}

#[tokio::test]
async fn session_round_trip_and_task_history() {
    let (app, state) = test_app().await;
    register_agent(&app, "banking", "BANKING").await;

    let (status, session) = call(
        &app,
        post(
            "/api/v1/create-session",
            json!({"user_id": "U10001", "channel": "MB"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let session_id = session["session_id"].as_str().unwrap();

    let (status, fetched) = call(&app, get(&format!("/api/v1/get-session/{session_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["user_id"], "U10001");
    assert_eq!(fetched["task_history"].as_array().unwrap().len(), 0);

    let (_, task) = call(
        &app,
        post(
            "/api/v1/submit-task",
            json!({
                "session_id": session_id,
                "user_id": "U10001",
                "channel": "MB",
                "intent": "CHECK_BALANCE",
                "data": {},
            }),
        ),
    )
    .await;
    assert_eq!(task["session_id"].as_str().unwrap(), session_id);
    poll_result(&app, task["task_id"].as_str().unwrap()).await;

    let (_, fetched) = call(&app, get(&format!("/api/v1/get-session/{session_id}"))).await;
    let history = fetched["task_history"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].as_str().unwrap(), task["task_id"].as_str().unwrap());
    assert_eq!(state.sessions.len(), 1);
}

#[tokio::test]
async fn registered_agent_is_listed_and_fetchable() {
    let (app, _) = test_app().await;
    let agent_id = register_agent(&app, "fraud", "FRAUD").await;

    let (status, agent) = call(&app, get(&format!("/api/v1/agent/{agent_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(agent["agent_type"], "FRAUD");

    let (_, all) = call(&app, get("/api/v1/agents")).await;
    assert_eq!(all.as_array().unwrap().len(), 1);
    let (_, filtered) = call(&app, get("/api/v1/agents?type=BANKING")).await;
    assert_eq!(filtered.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn unknown_ids_return_404() {
    let (app, _) = test_app().await;
    let (status, _) = call(&app, get("/api/v1/get-result/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, get("/api/v1/get-session/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, get("/api/v1/agent/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_api_key_is_401_except_health() {
    let (app, _) = test_app().await;
    let (status, _) = call(
        &app,
        Request::get("/api/v1/agents").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(&app, Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "task-controller");
}

#[tokio::test]
async fn malformed_submit_is_400() {
    let (app, _) = test_app().await;
    let (status, _) = call(
        &app,
        post(
            "/api/v1/submit-task",
            json!({"user_id": "", "channel": "MB", "intent": "CHECK_BALANCE"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
