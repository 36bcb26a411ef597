//! Intent & context orchestrator: the platform's conversational skin.
//!
//! Parses natural-language or structured input, enriches it with profile
//! and behavioral context, hands operational intents to the task
//! controller, merges the outcome, and persists every turn in the
//! retrieval-augmented memory.

pub mod client;
pub mod enrich;
pub mod intent;
pub mod merge;
pub mod process;
pub mod routes;

pub use client::{ControllerClient, ControllerError, TaskResultView};
pub use enrich::ContextEnricher;
pub use intent::{InputType, IntentParser, ParseError};
pub use merge::merge_responses;
pub use process::{Pipeline, ProcessRequest};
pub use routes::build_router;
