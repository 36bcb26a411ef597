//! Response merging: combine agent verdicts into one answer.

use finmesh_types::{AgentResponse, DataMap, MergedResponse, MergedStatus, Verdict};

/// Risk spread above which responses are considered in conflict.
const RISK_SPREAD_LIMIT: f64 = 0.3;

/// Merge one or more agent responses into the final verdict.
pub fn merge_responses(responses: Vec<AgentResponse>) -> MergedResponse {
    if responses.is_empty() {
        return MergedResponse {
            status: MergedStatus::Pending,
            final_result: DataMap::new(),
            risk_score: 0.0,
            explanation: "no agent responses to merge".to_string(),
            agent_responses: Vec::new(),
            conflicts: Vec::new(),
            resolved_by: None,
        };
    }

    if responses.len() == 1 {
        let only = &responses[0];
        return MergedResponse {
            status: verdict_status(only.status),
            final_result: only.result.clone(),
            risk_score: only.risk_score,
            explanation: only.explanation.clone(),
            resolved_by: Some(format!("{} ({})", only.agent_id, only.agent_type)),
            conflicts: Vec::new(),
            agent_responses: responses,
        };
    }

    let conflicts = detect_conflicts(&responses);

    let status = if responses.iter().any(|r| r.status == Verdict::Rejected) {
        MergedStatus::Rejected
    } else if !conflicts.is_empty() {
        MergedStatus::Conflict
    } else {
        majority_status(&responses)
    };

    // Union of result maps; on collision a confident (> 0.8) later response
    // wins, otherwise the earlier value is preserved.
    let mut final_result = DataMap::new();
    for response in &responses {
        for (key, value) in &response.result {
            match final_result.get(key) {
                Some(_) if response.confidence > 0.8 => {
                    final_result.insert(key.clone(), value.clone());
                }
                Some(_) => {}
                None => {
                    final_result.insert(key.clone(), value.clone());
                }
            }
        }
    }

    let risk_score =
        responses.iter().map(|r| r.risk_score).sum::<f64>() / responses.len() as f64;

    let explanation = responses
        .iter()
        .map(|r| format!("{}: {}", r.agent_type, r.explanation))
        .collect::<Vec<_>>()
        .join("; ");

    let resolved_by = resolver(&responses);

    MergedResponse {
        status,
        final_result,
        risk_score,
        explanation,
        agent_responses: responses,
        conflicts,
        resolved_by: Some(resolved_by),
    }
}

fn verdict_status(verdict: Verdict) -> MergedStatus {
    match verdict {
        Verdict::Approved => MergedStatus::Approved,
        Verdict::Rejected => MergedStatus::Rejected,
        Verdict::Pending => MergedStatus::Pending,
    }
}

fn detect_conflicts(responses: &[AgentResponse]) -> Vec<String> {
    let mut conflicts = Vec::new();

    let first = responses[0].status;
    if responses.iter().any(|r| r.status != first) {
        let statuses = responses
            .iter()
            .map(|r| format!("{}={}", r.agent_type, r.status.as_str()))
            .collect::<Vec<_>>()
            .join(", ");
        conflicts.push(format!("status mismatch: {statuses}"));
    }

    let max = responses.iter().map(|r| r.risk_score).fold(f64::MIN, f64::max);
    let min = responses.iter().map(|r| r.risk_score).fold(f64::MAX, f64::min);
    if max - min > RISK_SPREAD_LIMIT {
        conflicts.push(format!(
            "risk mismatch: spread {:.2} exceeds {RISK_SPREAD_LIMIT}",
            max - min
        ));
    }

    conflicts
}

fn majority_status(responses: &[AgentResponse]) -> MergedStatus {
    let approved = responses.iter().filter(|r| r.status == Verdict::Approved).count();
    let pending = responses.iter().filter(|r| r.status == Verdict::Pending).count();
    if approved > pending {
        MergedStatus::Approved
    } else {
        MergedStatus::Pending
    }
}

/// A confident rejection is named "most restrictive"; otherwise the
/// highest-confidence agent resolves.
fn resolver(responses: &[AgentResponse]) -> String {
    if let Some(rejector) = responses
        .iter()
        .filter(|r| r.status == Verdict::Rejected && r.confidence > 0.7)
        .max_by(|a, b| a.confidence.partial_cmp(&b.confidence).unwrap_or(std::cmp::Ordering::Equal))
    {
        return format!(
            "{} ({}) most restrictive",
            rejector.agent_id, rejector.agent_type
        );
    }
    let best = responses
        .iter()
        .max_by(|a, b| a.confidence.partial_cmp(&b.confidence).unwrap_or(std::cmp::Ordering::Equal))
        .expect("responses is non-empty");
    format!("{} ({}) highest confidence", best.agent_id, best.agent_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use finmesh_types::{AgentId, AgentKind, AgentRequest, InputContext, SessionId};
    use serde_json::json;

    fn response(
        kind: AgentKind,
        status: Verdict,
        risk: f64,
        confidence: f64,
        result: serde_json::Value,
    ) -> AgentResponse {
        let serde_json::Value::Object(result) = result else { unreachable!() };
        let request = AgentRequest::new(
            AgentId::generate(),
            "TRANSFER_NEFT",
            InputContext {
                user_id: "U1".to_string(),
                session_id: SessionId::generate(),
                channel: "MB".to_string(),
                intent: "TRANSFER_NEFT".to_string(),
                data: DataMap::new(),
                context: DataMap::new(),
            },
        );
        AgentResponse::new(&request, kind, status)
            .with_result(result)
            .with_risk(risk)
            .with_confidence(confidence)
    }

    #[test]
    fn single_response_passes_through() {
        let merged = merge_responses(vec![response(
            AgentKind::Banking,
            Verdict::Approved,
            0.1,
            0.9,
            json!({"transaction_id": "TXN1"}),
        )]);
        assert_eq!(merged.status, MergedStatus::Approved);
        assert_eq!(merged.risk_score, 0.1);
        assert!(merged.conflicts.is_empty());
    }

    #[test]
    fn any_rejection_rejects_the_merge() {
        let merged = merge_responses(vec![
            response(AgentKind::Banking, Verdict::Approved, 0.1, 0.9, json!({})),
            response(AgentKind::Guardrail, Verdict::Rejected, 0.3, 0.95, json!({})),
        ]);
        assert_eq!(merged.status, MergedStatus::Rejected);
        assert!(merged.resolved_by.unwrap().contains("most restrictive"));
        // Status mismatch is still reported.
        assert_eq!(merged.conflicts.len(), 1);
    }

    #[test]
    fn wide_risk_spread_is_a_conflict() {
        let merged = merge_responses(vec![
            response(AgentKind::Banking, Verdict::Approved, 0.05, 0.6, json!({})),
            response(AgentKind::Fraud, Verdict::Approved, 0.6, 0.6, json!({})),
        ]);
        assert_eq!(merged.status, MergedStatus::Conflict);
        assert!(merged.conflicts[0].contains("risk mismatch"));
        assert!((merged.risk_score - 0.325).abs() < 1e-9);
    }

    #[test]
    fn confident_later_response_wins_collisions() {
        let merged = merge_responses(vec![
            response(AgentKind::Fraud, Verdict::Approved, 0.2, 0.6, json!({"score": 1})),
            response(AgentKind::Scoring, Verdict::Approved, 0.25, 0.85, json!({"score": 2})),
        ]);
        assert_eq!(merged.final_result.get("score"), Some(&json!(2)));
    }

    #[test]
    fn low_confidence_collision_preserves_earlier_value() {
        let merged = merge_responses(vec![
            response(AgentKind::Fraud, Verdict::Approved, 0.2, 0.6, json!({"score": 1})),
            response(AgentKind::Scoring, Verdict::Approved, 0.25, 0.7, json!({"score": 2})),
        ]);
        assert_eq!(merged.final_result.get("score"), Some(&json!(1)));
    }

    #[test]
    fn agreeing_approvals_stay_approved() {
        let merged = merge_responses(vec![
            response(AgentKind::Banking, Verdict::Approved, 0.1, 0.9, json!({})),
            response(AgentKind::Fraud, Verdict::Approved, 0.2, 0.85, json!({})),
        ]);
        assert_eq!(merged.status, MergedStatus::Approved);
        assert!(merged.resolved_by.unwrap().contains("highest confidence"));
    }
}
