//! Remote key-value collaborator interface.
//!
//! The platform treats the external KV store purely as an interface: a
//! namespaced string keyspace with optional TTLs. The in-memory
//! implementation backs tests and single-process deployments; its failure
//! switches exercise the fallback discipline.

use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Remote key-value store capability.
#[async_trait]
pub trait RemoteKv: Send + Sync {
    /// Liveness probe issued once at construction of each fallback map.
    async fn ping(&self) -> StoreResult<()>;

    /// Write a value, optionally bounded by a TTL.
    async fn put(&self, key: &str, value: String, ttl: Option<Duration>) -> StoreResult<()>;

    /// Read a value if present and unexpired.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Best-effort delete.
    async fn delete(&self, key: &str) -> StoreResult<()>;
}

/// In-process [`RemoteKv`] with switchable failure modes for tests.
#[derive(Default)]
pub struct InMemoryRemoteKv {
    entries: Mutex<HashMap<String, (String, Option<Instant>)>>,
    fail_pings: AtomicBool,
    fail_writes: AtomicBool,
}

impl InMemoryRemoteKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_pings(&self, fail: bool) {
        self.fail_pings.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("kv lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RemoteKv for InMemoryRemoteKv {
    async fn ping(&self) -> StoreResult<()> {
        if self.fail_pings.load(Ordering::SeqCst) {
            return Err(StoreError::RemoteUnavailable("ping failed".to_string()));
        }
        Ok(())
    }

    async fn put(&self, key: &str, value: String, ttl: Option<Duration>) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Remote("write refused".to_string()));
        }
        let expires = ttl.map(|ttl| Instant::now() + ttl);
        self.entries
            .lock()
            .map_err(|_| StoreError::LockPoisoned)?
            .insert(key.to_string(), (value, expires));
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::LockPoisoned)?;
        match entries.get(key) {
            Some((_, Some(expires))) if *expires <= Instant::now() => {
                entries.remove(key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.entries
            .lock()
            .map_err(|_| StoreError::LockPoisoned)?
            .remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_round_trip() {
        let kv = InMemoryRemoteKv::new();
        kv.put("session:1", "{}".to_string(), None).await.unwrap();
        assert_eq!(kv.get("session:1").await.unwrap().as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn expired_entries_read_as_absent() {
        let kv = InMemoryRemoteKv::new();
        kv.put("task:1", "{}".to_string(), Some(Duration::ZERO))
            .await
            .unwrap();
        assert_eq!(kv.get("task:1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn write_failures_are_switchable() {
        let kv = InMemoryRemoteKv::new();
        kv.set_fail_writes(true);
        assert!(kv.put("k", "v".to_string(), None).await.is_err());
        kv.set_fail_writes(false);
        assert!(kv.put("k", "v".to_string(), None).await.is_ok());
    }
}
