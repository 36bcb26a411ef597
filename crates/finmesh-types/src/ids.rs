//! Strongly-typed identifiers for finmesh entities.
//!
//! All ids are UUID-backed but wrapped in newtype structs for type safety.
//! Display renders the bare UUID; storage namespacing is applied by the
//! durable-fallback store, not here.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

uuid_id! {
    /// Unique identifier for one unit of orchestrated work.
    TaskId
}

uuid_id! {
    /// Unique identifier for a conversation session on a channel.
    SessionId
}

uuid_id! {
    /// Unique identifier assigned to an agent by the registry.
    AgentId
}

uuid_id! {
    /// Correlation id carried between an agent request and its response.
    RequestId
}
