//! Core data model shared by every finmesh service.
//!
//! Open-vocabulary payloads (`data`, `context`, `result`, metadata) are kept
//! as JSON object maps rather than narrow records so agents and channels can
//! extend them without cross-service lockstep upgrades.

pub mod agent;
pub mod context;
pub mod ids;
pub mod intent;
pub mod merge;
pub mod routing;
pub mod session;
pub mod task;
pub mod value;

pub use agent::{
    AgentHealth, AgentKind, AgentRegistration, AgentRequest, AgentResponse, InputContext, Verdict,
};
pub use context::{
    BehaviorSummary, EnrichedContext, RiskIndicators, RiskLevel, TransactionRecord, UserProfile,
};
pub use ids::{AgentId, RequestId, SessionId, TaskId};
pub use intent::{Intent, IntentLabel};
pub use merge::{MergedResponse, MergedStatus};
pub use routing::{RoutingContext, RoutingDecision};
pub use session::Session;
pub use task::{Task, TaskError, TaskStatus};
pub use value::{map_bool, map_f64, map_str, map_u32, DataMap};
