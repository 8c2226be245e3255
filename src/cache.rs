//! In-memory request cache with TTL expiry.
//!
//! Entries are keyed by endpoint plus the sorted parameter set and live for the
//! lifetime of the process. Lookups and fetches for the same key are serialised,
//! so concurrent identical requests collapse into one upstream call.

use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_TTL: Duration = Duration::from_millis(15_000);

/// Source of "now" in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        Utc::now().timestamp_millis().max(0) as u64
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    timestamp: u64,
    payload: T,
}

type Slot<T> = Arc<tokio::sync::Mutex<Option<CacheEntry<T>>>>;

pub struct RequestCache<T> {
    slots: Mutex<HashMap<String, Slot<T>>>,
    ttl_ms: u64,
    clock: Arc<dyn Clock>,
}

/// Canonical key for an endpoint call: parameters are ordered by name so that
/// `{a, b}` and `{b, a}` map to the same entry.
pub fn cache_key<K, V>(endpoint: &str, params: impl IntoIterator<Item = (K, V)>) -> String
where
    K: Into<String>,
    V: ToString,
{
    let sorted: BTreeMap<String, String> = params
        .into_iter()
        .map(|(k, v)| (k.into(), v.to_string()))
        .collect();

    let query = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");
    format!("{}?{}", endpoint, query)
}

impl<T: Clone> RequestCache<T> {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            ttl_ms: ttl.as_millis() as u64,
            clock,
        }
    }

    fn slot(&self, key: &str) -> Slot<T> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.entry(key.to_string()).or_default().clone()
    }

    fn is_fresh(&self, entry: &CacheEntry<T>) -> bool {
        self.clock.now_ms().saturating_sub(entry.timestamp) < self.ttl_ms
    }

    /// Returns the cached payload for `key` if it is still within TTL.
    #[cfg(test)]
    pub async fn get(&self, key: &str) -> Option<T> {
        let slot = self.slot(key);
        let entry = slot.lock().await;
        entry
            .as_ref()
            .filter(|e| self.is_fresh(e))
            .map(|e| e.payload.clone())
    }

    /// Returns the fresh cached payload or runs `fetch` and stores a successful result.
    /// Failures are passed through and never cached.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: &str, fetch: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let slot = self.slot(key);
        let mut entry = slot.lock().await;

        if let Some(cached) = entry.as_ref().filter(|e| self.is_fresh(e)) {
            debug!(key, "cache hit");
            return Ok(cached.payload.clone());
        }

        debug!(key, "cache miss");
        let payload = fetch().await?;
        *entry = Some(CacheEntry {
            timestamp: self.clock.now_ms(),
            payload: payload.clone(),
        });
        Ok(payload)
    }
}
