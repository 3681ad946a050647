//! Token-keyed payload store with TTL expiry.
//!
//! Components carry data across a round trip by embedding a short token in their custom id;
//! the payload itself lives here. Expiry is checked when an entry is read (expired entries are
//! removed on the spot); [`spawn_sweeper`] optionally clears abandoned entries in the background.
use crate::constants::DEFAULT_PAYLOAD_TTL_MINUTES;
use crate::error::BotResult;
use crate::util::{Clock, SystemClock};
use ahash::AHashMap;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// One stored payload. Timestamps are unix millis; `expires_at == 0` never expires.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PayloadEntry {
    pub token: String,
    pub payload: String,
    pub created_at: i64,
    pub expires_at: i64,
}

impl PayloadEntry {
    pub fn is_expired(&self, now_millis: i64) -> bool {
        self.expires_at != 0 && self.expires_at < now_millis
    }
}

/// Raw persistence for payload entries. Expiry policy lives in [`PayloadStore`].
#[async_trait]
pub trait PayloadBackend: Send + Sync {
    /// Insert or overwrite the entry under `entry.token`.
    async fn put(&self, entry: PayloadEntry) -> BotResult<()>;
    async fn fetch(&self, token: &str) -> BotResult<Option<PayloadEntry>>;
    /// Returns whether an entry was removed.
    async fn remove(&self, token: &str) -> BotResult<bool>;
    /// Remove every entry with a non-zero expiry before `now_millis`.
    async fn remove_expired(&self, now_millis: i64) -> BotResult<u64>;
}

/// Process-local backend. Payloads are lost on restart, which only expires live components early.
#[derive(Default)]
pub struct MemoryBackend {
    entries: RwLock<AHashMap<String, PayloadEntry>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn contains(&self, token: &str) -> bool {
        self.entries.read().await.contains_key(token)
    }
}

#[async_trait]
impl PayloadBackend for MemoryBackend {
    async fn put(&self, entry: PayloadEntry) -> BotResult<()> {
        self.entries.write().await.insert(entry.token.clone(), entry);
        Ok(())
    }

    async fn fetch(&self, token: &str) -> BotResult<Option<PayloadEntry>> {
        Ok(self.entries.read().await.get(token).cloned())
    }

    async fn remove(&self, token: &str) -> BotResult<bool> {
        Ok(self.entries.write().await.remove(token).is_some())
    }

    async fn remove_expired(&self, now_millis: i64) -> BotResult<u64> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired(now_millis));
        Ok((before - entries.len()) as u64)
    }
}

/// Snapshot of a store's lookup counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub expired: u64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    expired: AtomicU64,
}

pub struct PayloadStore {
    backend: Arc<dyn PayloadBackend>,
    clock: Arc<dyn Clock>,
    default_ttl_minutes: u32,
    counters: Counters,
}

impl PayloadStore {
    pub fn new(backend: Arc<dyn PayloadBackend>) -> Self {
        Self {
            backend,
            clock: Arc::new(SystemClock),
            default_ttl_minutes: DEFAULT_PAYLOAD_TTL_MINUTES,
            counters: Counters::default(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_default_ttl(mut self, minutes: u32) -> Self {
        self.default_ttl_minutes = minutes;
        self
    }

    pub fn default_ttl_minutes(&self) -> u32 {
        self.default_ttl_minutes
    }

    /// Serialize `payload` and store it under `token`.
    /// `ttl_minutes`: `None` uses the default, `Some(0)` never expires.
    pub async fn store<T: Serialize + ?Sized>(
        &self,
        token: &str,
        payload: &T,
        ttl_minutes: Option<u32>,
    ) -> BotResult<()> {
        let payload = serde_json::to_string(payload)?;
        let now = self.clock.now_millis();
        let ttl = ttl_minutes.unwrap_or(self.default_ttl_minutes);
        let expires_at = if ttl == 0 {
            0
        } else {
            now + i64::from(ttl) * 60_000
        };
        self.backend
            .put(PayloadEntry {
                token: token.to_string(),
                payload,
                created_at: now,
                expires_at,
            })
            .await
    }

    /// The payload under `token`, or `None` when missing or expired. Expired entries are removed.
    pub async fn get(&self, token: &str) -> BotResult<Option<serde_json::Value>> {
        let Some(entry) = self.backend.fetch(token).await? else {
            self.counters.misses.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        };
        if entry.is_expired(self.clock.now_millis()) {
            self.backend.remove(token).await?;
            self.counters.expired.fetch_add(1, Ordering::Relaxed);
            self.counters.misses.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(target = "payloads", token = %token, "payload expired on read");
            return Ok(None);
        }
        self.counters.hits.fetch_add(1, Ordering::Relaxed);
        Ok(Some(serde_json::from_str(&entry.payload)?))
    }

    /// Typed variant of [`PayloadStore::get`].
    pub async fn get_as<T: DeserializeOwned>(&self, token: &str) -> BotResult<Option<T>> {
        match self.get(token).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub async fn delete(&self, token: &str) -> BotResult<()> {
        self.backend.remove(token).await?;
        Ok(())
    }

    /// Remove all expired entries and return how many went.
    pub async fn sweep(&self) -> BotResult<u64> {
        let removed = self.backend.remove_expired(self.clock.now_millis()).await?;
        if removed > 0 {
            tracing::debug!(target = "payloads", removed, "swept expired payloads");
        }
        Ok(removed)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            expired: self.counters.expired.load(Ordering::Relaxed),
        }
    }
}

/// Run [`PayloadStore::sweep`] every `every` until the returned handle is aborted.
pub fn spawn_sweeper(store: Arc<PayloadStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = store.sweep().await {
                tracing::warn!(target = "payloads", error = ?e, "payload sweep failed");
            }
        }
    })
}
