//! The finmesh agent mesh: specialist processing agents behind a uniform
//! request/response contract.
//!
//! Each process hosts one agent kind, selected at startup. Agents consult
//! the ML prediction and banking-integrations collaborators where
//! configured and always carry deterministic fallbacks, so a verdict is
//! produced in every environment.

pub mod banking;
pub mod clearance;
pub mod clients;
pub mod fraud;
pub mod guardrail;
pub mod runtime;
pub mod scoring;
pub mod service;

pub use clients::{BankingClient, BankingError, MlClient, MlError};
pub use runtime::{build_agent, default_capabilities, Agent, AgentBuildError, AgentDeps};
pub use service::{build_router, default_port, register_with_controller, service_label};
