//! Key/value persistence seam
//!
//! Every component reads and writes through a [`Store`]. Calls are awaited
//! even when the backing storage happens to be synchronous, so an
//! asynchronous backend can be swapped in without touching callers.
//!
//! Reads go through [`load_or_default`]: an unavailable store or a value of
//! the wrong shape is logged and replaced by the documented default instead
//! of being propagated.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Persisted keys.
pub mod keys {
    /// Sequence of host patterns.
    pub const BLOCKED_HOSTS: &str = "blockedHosts";
    /// Global enable flag.
    pub const BLOCKING_ENABLED: &str = "blockingEnabled";
    /// ISO-8601 exemption deadline.
    pub const EXEMPT_UNTIL: &str = "exemptUntil_global";
    /// `{date, hosts, exemptions}` tallies.
    pub const BLOCK_COUNTS: &str = "blockCounts";
}

/// Error type for store access.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error("Malformed value for '{key}': {reason}")]
    Malformed { key: String, reason: String },
}

/// Asynchronous key/value persistence, durable across page loads.
#[allow(async_fn_in_trait)]
pub trait Store {
    /// Read the raw value under `key`, or `None` if it was never written.
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Overwrite the value under `key`. Resolves once the write is durable.
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
}

impl<S: Store + ?Sized> Store for &S {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        (**self).set(key, value).await
    }
}

impl<S: Store + ?Sized> Store for Rc<S> {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        (**self).set(key, value).await
    }
}

impl<S: Store + ?Sized> Store for Arc<S> {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        (**self).set(key, value).await
    }
}

// =============================================================================
// Typed access
// =============================================================================

/// Read and decode `key`. `Ok(None)` means absent (or explicitly `null`).
pub async fn load<S, T>(store: &S, key: &str) -> Result<Option<T>, StoreError>
where
    S: Store + ?Sized,
    T: DeserializeOwned,
{
    let raw = match store.get(key).await? {
        Some(Value::Null) | None => return Ok(None),
        Some(raw) => raw,
    };

    serde_json::from_value(raw).map(Some).map_err(|e| StoreError::Malformed {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

/// Read and decode `key`, substituting `default` on absence or any error.
pub async fn load_or_default<S, T>(store: &S, key: &str, default: T) -> T
where
    S: Store + ?Sized,
    T: DeserializeOwned,
{
    match load(store, key).await {
        Ok(Some(value)) => value,
        Ok(None) => default,
        Err(e) => {
            log::warn!("{e}; falling back to default for '{key}'");
            default
        }
    }
}

/// Encode and write `value` under `key`.
pub async fn save<S, T>(store: &S, key: &str, value: &T) -> Result<(), StoreError>
where
    S: Store + ?Sized,
    T: Serialize + ?Sized,
{
    let raw = serde_json::to_value(value).map_err(|e| StoreError::Malformed {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    store.set(key, raw).await
}

// =============================================================================
// In-memory store
// =============================================================================

/// Process-local store. Used by tests and by embeddings without persistence.
///
/// Can be switched into an unavailable mode where every call fails, to
/// exercise the fallback paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style seed of a raw value.
    pub fn with_value(self, key: &str, value: Value) -> Self {
        self.values().insert(key.to_string(), value);
        self
    }

    /// Make every subsequent call fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Raw value currently held under `key`.
    pub fn raw(&self, key: &str) -> Option<Value> {
        self.values().get(key).cloned()
    }

    fn values(&self) -> std::sync::MutexGuard<'_, HashMap<String, Value>> {
        self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store switched off".to_string()));
        }
        Ok(())
    }
}

impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.check_available()?;
        Ok(self.values().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.check_available()?;
        self.values().insert(key.to_string(), value);
        Ok(())
    }
}
