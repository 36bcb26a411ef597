//! The gateway pipeline: parse → enrich → submit → poll → merge, with RAG
//! persistence of both turns and direct handling of conversational and
//! unknown intents (no task is created for those).

use crate::client::{ControllerClient, TaskResultView};
use crate::enrich::ContextEnricher;
use crate::intent::{InputType, IntentParser, ParseError};
use crate::merge::merge_responses;
use finmesh_http::ApiError;
use finmesh_llm::LlmClient;
use finmesh_memory::{augment_prompt, ConversationBuffer, MemoryStore, DEFAULT_TOP_K};
use finmesh_types::{
    map_str, AgentId, AgentKind, AgentResponse, DataMap, Intent, IntentLabel, MergedResponse,
    MergedStatus, RequestId, SessionId, Verdict,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// Retrieval relevance below which unknown input is treated as having no
/// matching context.
const UNKNOWN_CONTEXT_THRESHOLD: f32 = 0.35;

/// Documents a user may accumulate before history is compressed.
const SUMMARIZE_KEEP_RECENT: usize = 10;

const CAPABILITIES: &str = "I can help with: money transfers (NEFT, RTGS, IMPS, UPI), \
     balance inquiry, account statements, adding beneficiaries, loan \
     applications, and credit score checks.";

const ASSISTANT_PROMPT: &str = "You are a banking assistant. Answer briefly and only \
     about the user's banking needs. Never invent account data that is not in the \
     provided context.";

#[derive(Debug, Deserialize)]
pub struct ProcessRequest {
    pub user_id: String,
    pub channel: String,
    pub input: Value,
    pub input_type: InputType,
    #[serde(default)]
    pub session_id: Option<String>,
}

pub struct Pipeline {
    pub parser: IntentParser,
    pub enricher: ContextEnricher,
    pub controller: ControllerClient,
    pub memory: Arc<MemoryStore>,
    pub conversation: Arc<ConversationBuffer>,
    pub llm: Option<Arc<LlmClient>>,
}

impl Pipeline {
    /// Process one user request end to end.
    pub async fn process(&self, request: ProcessRequest) -> Result<MergedResponse, ApiError> {
        if request.user_id.trim().is_empty() {
            return Err(ApiError::BadRequest("user_id is required".to_string()));
        }
        let input_text = match &request.input {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };

        let intent = self
            .parser
            .parse(&request.input, request.input_type)
            .await
            .map_err(|err: ParseError| ApiError::BadRequest(err.to_string()))?;
        info!(
            user_id = %request.user_id,
            intent = %intent.intent_type,
            confidence = intent.confidence,
            "intent resolved"
        );

        match intent.intent_type {
            IntentLabel::Conversational => {
                self.converse(&request, &input_text, None).await
            }
            IntentLabel::Unknown => self.handle_unknown(&request, &input_text).await,
            _ => self.run_task(&request, &input_text, intent).await,
        }
    }

    /// Unknown intent: answer from memory when something relevant exists,
    /// otherwise reject with the capability list. No task is created.
    async fn handle_unknown(
        &self,
        request: &ProcessRequest,
        input_text: &str,
    ) -> Result<MergedResponse, ApiError> {
        let recalled = self
            .memory
            .retrieve(&request.user_id, input_text, DEFAULT_TOP_K)
            .await;
        let best = recalled.first().map(|doc| doc.relevance).unwrap_or(0.0);
        if best >= UNKNOWN_CONTEXT_THRESHOLD {
            return self.converse(request, input_text, Some(recalled)).await;
        }

        let session_id = self.session_for(request);
        let explanation = format!("I could not understand that request. {CAPABILITIES}");
        self.remember_turns(&request.user_id, &session_id, input_text, &explanation)
            .await;

        let mut final_result = DataMap::new();
        final_result.insert("session_id".to_string(), Value::from(session_id.to_string()));
        Ok(MergedResponse {
            status: MergedStatus::Rejected,
            final_result,
            risk_score: 0.0,
            explanation,
            agent_responses: Vec::new(),
            conflicts: Vec::new(),
            resolved_by: Some("intent-parser".to_string()),
        })
    }

    /// Conversational path: RAG-augmented reply when the LLM is available,
    /// a static capability reply otherwise.
    async fn converse(
        &self,
        request: &ProcessRequest,
        input_text: &str,
        recalled: Option<Vec<finmesh_memory::Document>>,
    ) -> Result<MergedResponse, ApiError> {
        let session_id = self.session_for(request);

        let mut documents = match recalled {
            Some(documents) => documents,
            None => {
                self.memory
                    .retrieve(&request.user_id, input_text, DEFAULT_TOP_K)
                    .await
            }
        };
        documents.extend(self.memory.search_knowledge(input_text, DEFAULT_TOP_K).await);

        let reply = match &self.llm {
            Some(llm) => {
                let system = augment_prompt(ASSISTANT_PROMPT, &documents);
                match llm.complete(Some(&system), input_text).await {
                    Ok(reply) => reply,
                    Err(err) => {
                        warn!(error = %err, "conversational completion failed, using static reply");
                        CAPABILITIES.to_string()
                    }
                }
            }
            None => CAPABILITIES.to_string(),
        };

        self.conversation.append(&session_id, "user", input_text);
        self.conversation.append(&session_id, "assistant", &reply);
        self.remember_turns(&request.user_id, &session_id, input_text, &reply)
            .await;

        let mut final_result = DataMap::new();
        final_result.insert("reply".to_string(), Value::from(reply.clone()));
        final_result.insert("session_id".to_string(), Value::from(session_id.to_string()));
        Ok(MergedResponse {
            status: MergedStatus::Approved,
            final_result,
            risk_score: 0.0,
            explanation: reply,
            agent_responses: Vec::new(),
            conflicts: Vec::new(),
            resolved_by: Some("conversation".to_string()),
        })
    }

    /// Operational path: enrich, hand to the task controller, poll, merge.
    async fn run_task(
        &self,
        request: &ProcessRequest,
        input_text: &str,
        intent: Intent,
    ) -> Result<MergedResponse, ApiError> {
        let enriched = self
            .enricher
            .enrich(
                &request.user_id,
                self.session_for(request),
                &request.channel,
                intent,
            )
            .await;

        let data = enriched.intent.entities.clone();
        let mut context = DataMap::new();
        context.insert(
            "user_profile".to_string(),
            serde_json::to_value(&enriched.profile)
                .map_err(|e| ApiError::Internal(e.to_string()))?,
        );
        context.insert(
            "risk_level".to_string(),
            Value::from(enriched.risk.overall_level.as_str()),
        );
        context.insert(
            "transaction_count_24h".to_string(),
            json!((enriched.risk.velocity_risk * 10.0).round()),
        );
        if enriched.behavior.anomaly_detected {
            context.insert("suspicious_pattern".to_string(), Value::Bool(true));
        }
        // A destination the user pays regularly is treated as established.
        if let Some(to_account) = map_str(&data, "to_account") {
            if enriched
                .behavior
                .frequent_beneficiaries
                .iter()
                .any(|known| known.eq_ignore_ascii_case(&to_account))
            {
                context.insert("beneficiary_age_days".to_string(), json!(90));
            }
        }

        let ack = self
            .controller
            .submit_task(
                request.session_id.as_deref(),
                &request.user_id,
                &request.channel,
                enriched.intent.intent_type.as_str(),
                data,
                context,
            )
            .await
            .map_err(|err| ApiError::Internal(err.to_string()))?;

        let session_id = SessionId::new(ack.session_id.clone());
        let observed = self
            .controller
            .poll_result(&ack.task_id)
            .await
            .map_err(|err| ApiError::Internal(err.to_string()))?;

        let mut merged = self.merge_observation(&enriched.intent, observed);
        merged
            .final_result
            .insert("session_id".to_string(), Value::from(ack.session_id));
        merged
            .final_result
            .entry("task_id".to_string())
            .or_insert(Value::from(ack.task_id));

        self.conversation.append(&session_id, "user", input_text);
        self.conversation
            .append(&session_id, "assistant", &merged.explanation);
        self.remember_turns(&request.user_id, &session_id, input_text, &merged.explanation)
            .await;
        if enriched.intent.intent_type.is_transfer() && merged.status == MergedStatus::Approved {
            self.memory
                .store_transaction(&request.user_id, &merged.final_result)
                .await;
        }
        self.memory
            .summarize_history(&request.user_id, SUMMARIZE_KEEP_RECENT)
            .await;

        Ok(merged)
    }

    /// Convert the controller's task observation into merged-response form.
    fn merge_observation(&self, intent: &Intent, observed: TaskResultView) -> MergedResponse {
        match observed.status.as_str() {
            "FAILED" => MergedResponse {
                status: MergedStatus::Rejected,
                final_result: DataMap::new(),
                risk_score: 0.0,
                explanation: if observed.error.is_empty() {
                    "task execution failed".to_string()
                } else {
                    observed.error
                },
                agent_responses: Vec::new(),
                conflicts: Vec::new(),
                resolved_by: Some("task-controller".to_string()),
            },
            "PENDING" | "PROCESSING" => MergedResponse {
                status: MergedStatus::Pending,
                final_result: DataMap::new(),
                risk_score: 0.0,
                explanation: format!(
                    "{} is still processing; retrieve the result with task id {}",
                    intent.intent_type, observed.task_id
                ),
                agent_responses: Vec::new(),
                conflicts: Vec::new(),
                resolved_by: Some("task-controller".to_string()),
            },
            _ => {
                let result = observed.result.unwrap_or_default();
                let verdict = match map_str(&result, "status").as_deref() {
                    Some("REJECTED") => Verdict::Rejected,
                    Some("PENDING") => Verdict::Pending,
                    _ => {
                        if observed.status == "REJECTED" {
                            Verdict::Rejected
                        } else {
                            Verdict::Approved
                        }
                    }
                };
                let agent_type = map_str(&result, "agent_type")
                    .and_then(|kind| kind.parse::<AgentKind>().ok())
                    .unwrap_or(AgentKind::Banking);
                let agent_id = map_str(&result, "agent_id")
                    .map(|id| AgentId::new(id))
                    .unwrap_or_else(AgentId::generate);
                let confidence = result
                    .get("confidence")
                    .and_then(Value::as_f64)
                    .unwrap_or(0.9);

                let response = AgentResponse {
                    agent_id,
                    agent_type,
                    status: verdict,
                    result,
                    risk_score: observed.risk_score.unwrap_or(0.0),
                    explanation: observed.explanation,
                    confidence,
                    timestamp: chrono::Utc::now(),
                    request_id: RequestId::new(observed.task_id),
                };
                merge_responses(vec![response])
            }
        }
    }

    fn session_for(&self, request: &ProcessRequest) -> SessionId {
        request
            .session_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .map(SessionId::new)
            .unwrap_or_else(SessionId::generate)
    }

    async fn remember_turns(
        &self,
        user_id: &str,
        session_id: &SessionId,
        user_text: &str,
        assistant_text: &str,
    ) {
        self.memory
            .store_conversation(user_id, Some(session_id.clone()), "user", user_text)
            .await;
        self.memory
            .store_conversation(user_id, Some(session_id.clone()), "assistant", assistant_text)
            .await;
    }
}
