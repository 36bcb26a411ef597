//! Keyed routing-rule engine.
//!
//! Rules are hints of the form `intent:<LABEL>`, `channel:<TAG>`, or
//! `risk:<LEVEL>` mapping to an agent kind. Lookup precedence is intent,
//! then channel, then risk. Uploaded rule sets merge key-by-key with
//! last-write-wins; the engine is seeded with defaults so it is never empty.

use finmesh_types::{AgentKind, RoutingContext};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("rule '{key}' is not an object with an agent_type field")]
    InvalidRule { key: String },

    #[error("rule '{key}' names unknown agent type '{agent_type}'")]
    UnknownAgentType { key: String, agent_type: String },

    #[error("rule lock poisoned")]
    LockPoisoned,
}

/// One routing hint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingRule {
    pub agent_type: AgentKind,
    #[serde(default)]
    pub reason: String,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_confidence() -> f64 {
    0.9
}

/// Decision snapshot returned from a rule lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDecision {
    pub key: String,
    pub agent_type: AgentKind,
    pub reason: String,
    pub confidence: f64,
}

/// In-process rule engine guarded by an RW lock.
pub struct RuleEngine {
    rules: RwLock<HashMap<String, RoutingRule>>,
}

impl RuleEngine {
    /// Engine seeded with the platform default rule set.
    pub fn with_defaults() -> Self {
        let engine = Self {
            rules: RwLock::new(HashMap::new()),
        };
        {
            let mut rules = engine.rules.write().expect("rule lock poisoned");
            for (key, kind, reason) in [
                ("intent:TRANSFER_NEFT", AgentKind::Guardrail, "NEFT transfers pass limit checks first"),
                ("intent:TRANSFER_RTGS", AgentKind::Guardrail, "RTGS transfers pass limit checks first"),
                ("risk:HIGH", AgentKind::Fraud, "high-risk requests are fraud-screened"),
                ("intent:APPLY_LOAN", AgentKind::Clearance, "loan applications go to clearance"),
            ] {
                rules.insert(
                    key.to_string(),
                    RoutingRule {
                        agent_type: kind,
                        reason: reason.to_string(),
                        confidence: 0.9,
                    },
                );
            }
        }
        engine
    }

    /// Empty engine, used by tests that want full control of the rule set.
    pub fn empty() -> Self {
        Self {
            rules: RwLock::new(HashMap::new()),
        }
    }

    /// Evaluate routing rules for a context. The read lock is held only for
    /// the lookups; the returned decision is a snapshot.
    pub fn evaluate(&self, context: &RoutingContext) -> Result<Option<RuleDecision>, RuleError> {
        let keys = [
            format!("intent:{}", context.intent),
            format!("channel:{}", context.channel),
            format!("risk:{}", context.risk_level),
        ];
        let rules = self.rules.read().map_err(|_| RuleError::LockPoisoned)?;
        for key in keys {
            if let Some(rule) = rules.get(&key) {
                debug!(key, agent_type = %rule.agent_type, "routing rule matched");
                return Ok(Some(RuleDecision {
                    key,
                    agent_type: rule.agent_type,
                    reason: rule.reason.clone(),
                    confidence: rule.confidence,
                }));
            }
        }
        Ok(None)
    }

    /// Merge an uploaded rule set key-by-key, last write wins.
    ///
    /// Every value must be an object carrying `agent_type`; the first
    /// malformed entry aborts the upload without touching the running set.
    pub fn upload(&self, raw: HashMap<String, Value>) -> Result<usize, RuleError> {
        let mut parsed = Vec::with_capacity(raw.len());
        for (key, value) in raw {
            let Value::Object(fields) = &value else {
                return Err(RuleError::InvalidRule { key });
            };
            let Some(agent_type) = fields.get("agent_type").and_then(Value::as_str) else {
                return Err(RuleError::InvalidRule { key });
            };
            let agent_type: AgentKind =
                agent_type
                    .parse()
                    .map_err(|_| RuleError::UnknownAgentType {
                        key: key.clone(),
                        agent_type: agent_type.to_string(),
                    })?;
            let reason = fields
                .get("reason")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let confidence = fields
                .get("confidence")
                .and_then(Value::as_f64)
                .unwrap_or_else(default_confidence);
            parsed.push((
                key,
                RoutingRule {
                    agent_type,
                    reason,
                    confidence,
                },
            ));
        }

        let mut rules = self.rules.write().map_err(|_| RuleError::LockPoisoned)?;
        let count = parsed.len();
        for (key, rule) in parsed {
            rules.insert(key, rule);
        }
        Ok(count)
    }

    /// Snapshot of the active rule set.
    pub fn snapshot(&self) -> HashMap<String, RoutingRule> {
        self.rules.read().expect("rule lock poisoned").clone()
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}
