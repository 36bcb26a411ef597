//! Durable-fallback storage discipline shared by every stateful component.
//!
//! The in-memory map is authoritative; an optional remote KV store receives
//! best-effort write-through and serves as a read-through cache. The
//! platform keeps operating identically with or without the remote.

pub mod error;
pub mod fallback;
pub mod remote;

pub use error::{StoreError, StoreResult};
pub use fallback::FallbackMap;
pub use remote::{InMemoryRemoteKv, RemoteKv};

use std::time::Duration;

/// Remote TTL applied to session entries.
pub const SESSION_REMOTE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Remote TTL applied to task entries.
pub const TASK_REMOTE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
