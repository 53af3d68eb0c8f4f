/// In-process Token Store
///
/// Implements the same contract as `PgTokenStore` without a database. Each
/// token gets its own async mutex so leases serialise per token only. The
/// store can be switched to "unreachable" to exercise outage handling.
/// A token's mutex lives only as long as someone holds or waits for it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::OwnedMutexGuard;

use crate::auth::identity::OwnerId;
use crate::auth::store::{hash_token, StoreError, TokenLease, TokenRecord, TokenStatus, TokenStore};

#[derive(Default)]
struct Inner {
    records: Mutex<HashMap<String, TokenRecord>>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    unreachable: AtomicBool,
}

impl Inner {
    fn ensure_reachable(&self) -> Result<(), StoreError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store marked unreachable".to_string()));
        }
        Ok(())
    }

    fn records(&self) -> Result<MutexGuard<'_, HashMap<String, TokenRecord>>, StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn lock_for(&self, key: &str) -> Result<Arc<tokio::sync::Mutex<()>>, StoreError> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))?;
        Ok(locks.entry(key.to_string()).or_default().clone())
    }

    fn insert_record(&self, key: String, owner: &OwnerId) -> Result<(), StoreError> {
        let mut records = self.records()?;
        if records.contains_key(&key) {
            return Err(StoreError::Duplicate);
        }
        records.insert(
            key.clone(),
            TokenRecord {
                token_hash: key,
                owner: owner.clone(),
                status: TokenStatus::Active,
                created_at: Utc::now(),
            },
        );
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryTokenStore {
    inner: Arc<Inner>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the store going away (or coming back)
    pub fn set_reachable(&self, reachable: bool) {
        self.inner.unreachable.store(!reachable, Ordering::SeqCst);
    }

    /// Status of a token regardless of whether it is active
    pub fn status_of(&self, token: &str) -> Option<TokenStatus> {
        self.inner
            .records()
            .ok()?
            .get(&hash_token(token))
            .map(|record| record.status)
    }

    pub fn len(&self) -> usize {
        self.inner.records().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.inner.locks.lock().map(|locks| locks.len()).unwrap_or(0)
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn insert(&self, token: &str, owner: &OwnerId) -> Result<(), StoreError> {
        self.inner.ensure_reachable()?;
        self.inner.insert_record(hash_token(token), owner)
    }

    async fn find_active(&self, token: &str) -> Result<Option<TokenRecord>, StoreError> {
        self.inner.ensure_reachable()?;
        Ok(self
            .inner
            .records()?
            .get(&hash_token(token))
            .filter(|record| record.status == TokenStatus::Active)
            .cloned())
    }

    async fn revoke(&self, token: &str) -> Result<(), StoreError> {
        self.inner.ensure_reachable()?;
        if let Some(record) = self.inner.records()?.get_mut(&hash_token(token)) {
            record.status = TokenStatus::Revoked;
        }
        Ok(())
    }

    async fn lock_active(&self, token: &str) -> Result<Option<Box<dyn TokenLease>>, StoreError> {
        self.inner.ensure_reachable()?;
        let key = hash_token(token);
        let guard = self.inner.lock_for(&key)?.lock_owned().await;
        let lock = TokenLock {
            inner: self.inner.clone(),
            key: key.clone(),
            guard: Some(guard),
        };

        let record = self
            .inner
            .records()?
            .get(&key)
            .filter(|record| record.status == TokenStatus::Active)
            .cloned();

        Ok(record.map(|record| {
            Box::new(MemoryTokenLease {
                inner: self.inner.clone(),
                record,
                _lock: lock,
            }) as Box<dyn TokenLease>
        }))
    }
}

/// Held per-token mutex. On drop the mutex entry is removed unless another
/// caller is already queued on it.
struct TokenLock {
    inner: Arc<Inner>,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for TokenLock {
    fn drop(&mut self) {
        self.guard.take();

        if let Ok(mut locks) = self.inner.locks.lock() {
            let unused = locks
                .get(&self.key)
                .map_or(false, |mutex| Arc::strong_count(mutex) == 1);
            if unused {
                locks.remove(&self.key);
            }
        }
    }
}

struct MemoryTokenLease {
    inner: Arc<Inner>,
    record: TokenRecord,
    _lock: TokenLock,
}

#[async_trait]
impl TokenLease for MemoryTokenLease {
    fn record(&self) -> &TokenRecord {
        &self.record
    }

    async fn consume_and_replace(
        self: Box<Self>,
        replacement: &str,
        owner: &OwnerId,
    ) -> Result<(), StoreError> {
        self.inner.ensure_reachable()?;
        let replacement_key = hash_token(replacement);

        let mut records = self.inner.records()?;
        if records.contains_key(&replacement_key) {
            return Err(StoreError::Duplicate);
        }
        match records.get_mut(&self.record.token_hash) {
            Some(record) if record.status == TokenStatus::Active => {
                record.status = TokenStatus::Revoked;
            }
            _ => return Err(StoreError::Conflict),
        }
        records.insert(
            replacement_key.clone(),
            TokenRecord {
                token_hash: replacement_key,
                owner: owner.clone(),
                status: TokenStatus::Active,
                created_at: Utc::now(),
            },
        );

        Ok(())
    }

    async fn release(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
