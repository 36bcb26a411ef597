//! In-memory authoritative map with best-effort remote write-through.
//!
//! Every write lands in the in-memory map unconditionally; the remote store
//! is attempted only while `remote_available` holds, and any failed remote
//! write flips the flag off for the rest of the process lifetime. Reads
//! consult memory first and fall back to the remote as a cache fill.
//! Remote operations never run while a lock is held.

use crate::remote::RemoteKv;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::warn;

/// A namespaced durable-fallback map.
pub struct FallbackMap<T> {
    namespace: &'static str,
    entries: RwLock<HashMap<String, T>>,
    remote: Option<Arc<dyn RemoteKv>>,
    remote_available: AtomicBool,
    remote_ttl: Option<Duration>,
}

impl<T> FallbackMap<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync,
{
    /// Build the map and probe the remote once. A failed probe downgrades to
    /// memory-only operation with a single warning.
    pub async fn connect(
        namespace: &'static str,
        remote: Option<Arc<dyn RemoteKv>>,
        remote_ttl: Option<Duration>,
    ) -> Self {
        let mut available = false;
        if let Some(remote) = &remote {
            match remote.ping().await {
                Ok(()) => available = true,
                Err(err) => {
                    warn!(namespace, error = %err, "remote KV unreachable, running memory-only");
                }
            }
        }
        Self {
            namespace,
            entries: RwLock::new(HashMap::new()),
            remote,
            remote_available: AtomicBool::new(available),
            remote_ttl,
        }
    }

    /// Memory-only map with no remote collaborator.
    pub fn in_memory(namespace: &'static str) -> Self {
        Self {
            namespace,
            entries: RwLock::new(HashMap::new()),
            remote: None,
            remote_available: AtomicBool::new(false),
            remote_ttl: None,
        }
    }

    pub fn remote_available(&self) -> bool {
        self.remote_available.load(Ordering::SeqCst)
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    /// Insert or replace an entry; remote write-through is best-effort.
    pub async fn put(&self, key: &str, value: T) {
        {
            let mut entries = self.entries.write().expect("store lock poisoned");
            entries.insert(key.to_string(), value.clone());
        }
        self.write_through(key, &value).await;
    }

    /// Mutate an existing entry under the write lock, then write through.
    /// Returns `None` when the key is absent.
    pub async fn update<R>(&self, key: &str, mutate: impl FnOnce(&mut T) -> R) -> Option<R> {
        let (outcome, snapshot) = {
            let mut entries = self.entries.write().expect("store lock poisoned");
            let value = entries.get_mut(key)?;
            let outcome = mutate(value);
            (outcome, value.clone())
        };
        self.write_through(key, &snapshot).await;
        Some(outcome)
    }

    /// Read from memory, falling back to the remote and caching the result.
    pub async fn get(&self, key: &str) -> Option<T> {
        {
            let entries = self.entries.read().expect("store lock poisoned");
            if let Some(value) = entries.get(key) {
                return Some(value.clone());
            }
        }
        if !self.remote_available() {
            return None;
        }
        let remote = self.remote.as_ref()?;
        match remote.get(&self.namespaced(key)).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    let mut entries = self.entries.write().expect("store lock poisoned");
                    entries.entry(key.to_string()).or_insert_with(|| value.clone());
                    Some(value)
                }
                Err(err) => {
                    warn!(namespace = self.namespace, key, error = %err, "remote entry undecodable");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!(namespace = self.namespace, key, error = %err, "remote read failed");
                None
            }
        }
    }

    /// Remove from memory and best-effort from the remote.
    pub async fn remove(&self, key: &str) -> Option<T> {
        let removed = {
            let mut entries = self.entries.write().expect("store lock poisoned");
            entries.remove(key)
        };
        if removed.is_some() && self.remote_available() {
            if let Some(remote) = &self.remote {
                if let Err(err) = remote.delete(&self.namespaced(key)).await {
                    warn!(namespace = self.namespace, key, error = %err, "remote delete failed");
                }
            }
        }
        removed
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .read()
            .expect("store lock poisoned")
            .contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all values.
    pub fn values(&self) -> Vec<T> {
        self.entries
            .read()
            .expect("store lock poisoned")
            .values()
            .cloned()
            .collect()
    }

    async fn write_through(&self, key: &str, value: &T) {
        if !self.remote_available() {
            return;
        }
        let Some(remote) = &self.remote else {
            return;
        };
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(namespace = self.namespace, key, error = %err, "remote serialize failed");
                return;
            }
        };
        if let Err(err) = remote.put(&self.namespaced(key), raw, self.remote_ttl).await {
            // One failed write disables the remote for this process; memory
            // remains authoritative.
            self.remote_available.store(false, Ordering::SeqCst);
            warn!(namespace = self.namespace, key, error = %err, "remote write failed, disabling write-through");
        }
    }
}
