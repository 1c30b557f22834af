//! Single-entry TTL store for the parsed endpoint superset

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use super::priority::CachePriority;
use crate::clock::Clock;
use crate::model::{EndpointRecord, EndpointView, Environment};

/// Key under which the endpoint superset is stored
pub const ENDPOINTS_KEY: &str = "endpoints_key";

/// Configuration for the endpoint cache
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Time to live of a stored superset
    pub ttl: Duration,
    /// Priority hint recorded on each entry
    pub priority: CachePriority,
    /// Environment stamped on stored endpoints
    pub environment: Environment,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::minutes(300),
            priority: CachePriority::High,
            environment: Environment::Prod,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub hit_count: u64,
    pub miss_count: u64,
    pub refresh_count: u64,
    /// Endpoints in the current entry
    pub entry_count: usize,
    pub stored_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Whether the current entry has passed its expiry
    pub expired: bool,
    pub priority: Option<CachePriority>,
}

#[derive(Debug)]
struct CacheEntry {
    key: String,
    endpoints: Arc<Vec<EndpointView>>,
    stored_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    priority: CachePriority,
}

impl CacheEntry {
    fn is_live(&self, key: &str, now: DateTime<Utc>) -> bool {
        self.key == key && now < self.expires_at
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: u64,
    misses: u64,
    refreshes: u64,
}

/// Cache holding the most recently stored endpoint superset.
///
/// Only one entry exists at a time; storing replaces it as one unit.
/// Expiry is absolute from the time of the write.
pub struct EndpointCache {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    entry: RwLock<Option<CacheEntry>>,
    counters: RwLock<Counters>,
}

impl EndpointCache {
    /// Create a new endpoint cache
    pub fn new(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        info!(
            "Initializing endpoint cache (ttl: {} minutes, priority: {}, env: {})",
            config.ttl.num_minutes(),
            config.priority,
            config.environment
        );

        Self {
            config,
            clock,
            entry: RwLock::new(None),
            counters: RwLock::new(Counters::default()),
        }
    }

    /// Default time to live for new entries
    pub fn ttl(&self) -> Duration {
        self.config.ttl
    }

    pub fn environment(&self) -> Environment {
        self.config.environment
    }

    /// Look up the superset stored under `key`.
    ///
    /// An absent, expired or differently-keyed entry is a miss.
    pub fn try_get(&self, key: &str) -> Option<Arc<Vec<EndpointView>>> {
        let found = self.peek(key);

        let mut counters = self.counters.write();
        if found.is_some() {
            counters.hits += 1;
        } else {
            counters.misses += 1;
        }

        found
    }

    /// Same as [`try_get`](Self::try_get) without touching the statistics
    pub(crate) fn peek(&self, key: &str) -> Option<Arc<Vec<EndpointView>>> {
        let now = self.clock.now();
        self.entry
            .read()
            .as_ref()
            .filter(|entry| entry.is_live(key, now))
            .map(|entry| entry.endpoints.clone())
    }

    /// Map `records` to their caller-facing shape and store them under
    /// `key`, replacing any previous entry. Returns what was stored.
    pub fn put(
        &self,
        key: &str,
        records: Vec<EndpointRecord>,
        ttl: Duration,
    ) -> Arc<Vec<EndpointView>> {
        let env = self.config.environment;
        let endpoints: Arc<Vec<EndpointView>> = Arc::new(
            records
                .into_iter()
                .map(|record| EndpointView::from_record(record, env))
                .collect(),
        );

        let stored_at = self.clock.now();
        let entry = CacheEntry {
            key: key.to_string(),
            endpoints: endpoints.clone(),
            stored_at,
            expires_at: stored_at + ttl,
            priority: self.config.priority,
        };

        debug!(
            "Caching {} endpoints under {} until {}",
            endpoints.len(),
            key,
            entry.expires_at
        );

        *self.entry.write() = Some(entry);
        self.counters.write().refreshes += 1;

        endpoints
    }

    /// Drop the stored entry. Returns whether there was one.
    pub fn clear(&self) -> bool {
        let removed = self.entry.write().take().is_some();
        if removed {
            info!("Cleared endpoint cache");
        }
        removed
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let counters = self.counters.read();
        let entry = self.entry.read();

        CacheStats {
            hit_count: counters.hits,
            miss_count: counters.misses,
            refresh_count: counters.refreshes,
            entry_count: entry.as_ref().map_or(0, |e| e.endpoints.len()),
            stored_at: entry.as_ref().map(|e| e.stored_at),
            expires_at: entry.as_ref().map(|e| e.expires_at),
            expired: entry.as_ref().is_some_and(|e| now >= e.expires_at),
            priority: entry.as_ref().map(|e| e.priority),
        }
    }
}
