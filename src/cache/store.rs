//! Keyed cache storage.
//!
//! A generic key → value store with TTL expiry, tag-based bulk invalidation
//! and get-or-populate with single-flight semantics. Carries no content
//! semantics; the orchestrator layers the logical caches on top.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Mutex, RwLock};

use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tokio::sync::watch;
use tracing::debug;

use super::lock::{mutex_lock, rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// One population attempt failed.
///
/// Clonable so a single in-flight result can fan out to every awaiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("population of `{key}` failed: {message}")]
pub struct PopulationError {
    pub key: String,
    pub message: String,
}

impl PopulationError {
    pub fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
        }
    }
}

struct CacheEntry<V, T> {
    value: V,
    created_at: OffsetDateTime,
    ttl: Duration,
    tags: HashSet<T>,
}

impl<V, T> CacheEntry<V, T> {
    fn is_fresh(&self, now: OffsetDateTime) -> bool {
        now - self.created_at < self.ttl
    }
}

type FlightResult<V> = Option<Result<V, PopulationError>>;

enum Claim<V> {
    /// This caller registered the in-flight marker and must populate.
    Lead(watch::Sender<FlightResult<V>>),
    /// Another caller is already populating; await its result.
    Join(watch::Receiver<FlightResult<V>>),
}

/// Generic keyed cache with TTL expiry, tags and single-flight population.
///
/// Expired entries are logically absent: [`get`](CacheStore::get) never
/// serves them, but they stay stored until invalidated so callers can opt
/// into staleness over unavailability via
/// [`get_stale`](CacheStore::get_stale).
pub struct CacheStore<K, V, T = super::keys::CacheTag> {
    entries: RwLock<HashMap<K, CacheEntry<V, T>>>,
    in_flight: Mutex<HashMap<K, watch::Receiver<FlightResult<V>>>>,
}

impl<K, V, T> CacheStore<K, V, T>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: Clone,
    T: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Fresh value or `None`; never triggers population.
    pub fn get(&self, key: &K) -> Option<V> {
        let entries = rw_read(&self.entries, SOURCE, "get");
        entries
            .get(key)
            .filter(|entry| entry.is_fresh(OffsetDateTime::now_utc()))
            .map(|entry| entry.value.clone())
    }

    /// Last stored value regardless of freshness.
    ///
    /// The explicit staleness-over-unavailability fallback; regular reads
    /// must go through [`get`](CacheStore::get).
    pub fn get_stale(&self, key: &K) -> Option<V> {
        let entries = rw_read(&self.entries, SOURCE, "get_stale");
        entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn insert(&self, key: K, value: V, ttl: Duration, tags: HashSet<T>) {
        let entry = CacheEntry {
            value,
            created_at: OffsetDateTime::now_utc(),
            ttl,
            tags,
        };
        rw_write(&self.entries, SOURCE, "insert").insert(key, entry);
    }

    /// Return a fresh entry, join an in-flight population, or run `populate`
    /// as the single leader for `key`.
    ///
    /// On success the result is stored with `ttl` and `tags` and returned to
    /// every concurrent caller. On failure nothing is cached, the in-flight
    /// marker is cleared and the same error propagates to every awaiter, so
    /// the next call retries.
    pub async fn get_or_populate<F, Fut>(
        &self,
        key: K,
        ttl: Duration,
        tags: HashSet<T>,
        populate: F,
    ) -> Result<V, PopulationError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, PopulationError>>,
    {
        let mut populate = Some(populate);
        loop {
            if let Some(value) = self.get(&key) {
                return Ok(value);
            }

            match self.claim(&key) {
                Claim::Lead(tx) => {
                    let Some(run) = populate.take() else {
                        // One call can only lead once; unreachable by construction.
                        return Err(PopulationError::new(
                            format!("{key:?}"),
                            "population already attempted by this caller",
                        ));
                    };
                    let result = run().await;
                    if let Ok(value) = &result {
                        self.insert(key.clone(), value.clone(), ttl, tags.clone());
                    }
                    mutex_lock(&self.in_flight, SOURCE, "get_or_populate.settle").remove(&key);
                    // Late joiners that grabbed the receiver before the
                    // marker was cleared still get the settled result.
                    let _ = tx.send(Some(result.clone()));
                    return result;
                }
                Claim::Join(mut rx) => {
                    match rx.wait_for(|outcome| outcome.is_some()).await {
                        Ok(settled) => {
                            if let Some(result) = settled.clone() {
                                return result;
                            }
                        }
                        // Leader was cancelled before settling; reap its dead
                        // marker, then retry and possibly lead ourselves.
                        Err(_) => {
                            let mut in_flight =
                                mutex_lock(&self.in_flight, SOURCE, "get_or_populate.reap");
                            let stale = in_flight
                                .get(&key)
                                .is_some_and(|stored| stored.has_changed().is_err());
                            if stale {
                                in_flight.remove(&key);
                            }
                            drop(in_flight);
                            debug!(
                                target: "fronda::cache",
                                key = ?key,
                                "in-flight population vanished; retrying"
                            );
                        }
                    }
                }
            }
        }
    }

    /// Race-free check-then-register for the in-flight marker.
    fn claim(&self, key: &K) -> Claim<V> {
        let mut in_flight = mutex_lock(&self.in_flight, SOURCE, "claim");
        if let Some(rx) = in_flight.get(key) {
            Claim::Join(rx.clone())
        } else {
            let (tx, rx) = watch::channel(None);
            in_flight.insert(key.clone(), rx);
            Claim::Lead(tx)
        }
    }

    pub fn invalidate(&self, key: &K) {
        rw_write(&self.entries, SOURCE, "invalidate").remove(key);
    }

    /// Remove every entry carrying `tag` and only those.
    pub fn invalidate_by_tag(&self, tag: &T) {
        rw_write(&self.entries, SOURCE, "invalidate_by_tag")
            .retain(|_, entry| !entry.tags.contains(tag));
    }

    /// Whether a fresh entry exists for `key`, without cloning the value.
    pub fn is_fresh(&self, key: &K) -> bool {
        let entries = rw_read(&self.entries, SOURCE, "is_fresh");
        entries
            .get(key)
            .is_some_and(|entry| entry.is_fresh(OffsetDateTime::now_utc()))
    }

    /// Whether an entry exists for `key`, fresh or stale.
    ///
    /// Distinguishes "never populated" from "populated but possibly expired";
    /// the orchestrator uses this when deciding what a pass must refill.
    pub fn contains(&self, key: &K) -> bool {
        rw_read(&self.entries, SOURCE, "contains").contains_key(key)
    }

    /// Number of stored entries, fresh or stale.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        rw_write(&self.entries, SOURCE, "clear").clear();
    }
}

impl<K, V, T> Default for CacheStore<K, V, T>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: Clone,
    T: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
