//! Task/session controller: owns the canonical task and session lifecycle,
//! routes tasks to agents, invokes them over HTTP with in-process
//! fallbacks, and chains a Banking execution after Guardrail approval for
//! transfer intents.

pub mod handlers;
pub mod invoke;
pub mod orchestrate;
pub mod routes;
pub mod state;

pub use invoke::{AgentInvoker, InvokeError};
pub use orchestrate::Orchestrator;
pub use routes::build_router;
pub use state::AppState;
