//! Endpoint directory (cache-aside over the remote registry)

use bits_proxy::EndpointSource;
use chrono::Duration;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::cache::{ENDPOINTS_KEY, EndpointCache};
use crate::clock::Clock;
use crate::error::CoreError;
use crate::model::EndpointView;
use crate::parser::parse_endpoints;
use crate::view::{ViewKind, project};

type RefreshOutcome = Result<Arc<Vec<EndpointView>>, CoreError>;

/// Outcome of the most recent refresh attempt
#[derive(Default)]
struct RefreshSlot {
    generation: u64,
    last: Option<RefreshOutcome>,
}

/// Directory serving the banking endpoint registry
pub struct EndpointDirectory {
    source: Arc<dyn EndpointSource>,
    cache: Arc<EndpointCache>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    /// Held for the whole fetch-parse-store sequence. Callers that queued
    /// behind an attempt receive its outcome, failures included.
    refresh: Mutex<RefreshSlot>,
    /// Mirror of `RefreshSlot::generation` readable without the lock
    generation: AtomicU64,
}

impl EndpointDirectory {
    /// Create a new endpoint directory
    pub fn new(
        source: Arc<dyn EndpointSource>,
        cache: Arc<EndpointCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let ttl = cache.ttl();
        Self {
            source,
            cache,
            clock,
            ttl,
            refresh: Mutex::new(RefreshSlot::default()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn cache(&self) -> &Arc<EndpointCache> {
        &self.cache
    }

    /// Currently valid endpoints with dates hidden
    pub async fn get_active(&self) -> Result<Vec<EndpointView>, CoreError> {
        self.get_view(ViewKind::Active).await
    }

    /// Endpoints that have not expired, with dates
    pub async fn get_with_dates(&self) -> Result<Vec<EndpointView>, CoreError> {
        self.get_view(ViewKind::Dated).await
    }

    /// Project the resident superset, loading it first on a miss
    pub async fn get_view(&self, kind: ViewKind) -> Result<Vec<EndpointView>, CoreError> {
        let superset = self.superset().await?;
        let view = project(&superset, self.clock.now(), kind);

        debug!(
            "Serving {} view: {} of {} endpoints",
            kind.as_str(),
            view.len(),
            superset.len()
        );

        Ok(view)
    }

    /// Fetch, parse and store unconditionally, bypassing the cache check.
    ///
    /// Returns the stored superset unfiltered. On failure the existing
    /// entry is left in place.
    pub async fn read_endpoints_and_cache(&self) -> Result<Arc<Vec<EndpointView>>, CoreError> {
        let mut slot = self.refresh.lock().await;
        info!("Forced refresh of endpoint registry");
        self.refresh_into(&mut slot).await
    }

    /// Load the registry before serving. Failures are logged and left for
    /// the first request to retry.
    pub async fn warm_up(&self) -> bool {
        match self.read_endpoints_and_cache().await {
            Ok(stored) => {
                info!("Warmed endpoint cache with {} endpoints", stored.len());
                true
            }
            Err(e) => {
                warn!("Cache warm-up failed, first request will retry: {}", e);
                false
            }
        }
    }

    async fn superset(&self) -> RefreshOutcome {
        let observed = self.generation.load(Ordering::Acquire);

        if let Some(hit) = self.cache.try_get(ENDPOINTS_KEY) {
            return Ok(hit);
        }

        let mut slot = self.refresh.lock().await;

        // An attempt finished while we waited, share its outcome
        if slot.generation != observed {
            if let Some(outcome) = &slot.last {
                debug!("Endpoint registry refresh completed by a concurrent request");
                return outcome.clone();
            }
        }

        if let Some(hit) = self.cache.peek(ENDPOINTS_KEY) {
            return Ok(hit);
        }

        info!("Cache miss for endpoint registry, fetching from upstream");
        self.refresh_into(&mut slot).await
    }

    async fn refresh_into(&self, slot: &mut RefreshSlot) -> RefreshOutcome {
        let outcome = self.refresh().await;
        slot.generation += 1;
        slot.last = Some(outcome.clone());
        self.generation.store(slot.generation, Ordering::Release);
        outcome
    }

    async fn refresh(&self) -> RefreshOutcome {
        let raw = self.source.fetch().await.inspect_err(|e| {
            warn!("Unable to fetch endpoint registry: {}", e);
        })?;

        let outcome = parse_endpoints(&raw).inspect_err(|e| {
            warn!("Unable to parse endpoint registry: {}", e);
        })?;

        info!(
            "Endpoints parsed from csv - {} rows, {} accepted",
            outcome.total_rows,
            outcome.accepted()
        );

        if outcome.records.is_empty() {
            error!("Data quality alert: no endpoints found in csv");
        }

        let stored = self.cache.put(ENDPOINTS_KEY, outcome.records, self.ttl);
        info!("Cache refresh completed - total of {} cached", stored.len());

        Ok(stored)
    }
}

/// Spawn a background task that refreshes the registry periodically
pub fn spawn_refresh_task(
    directory: Arc<EndpointDirectory>,
    interval_minutes: u64,
) -> tokio::task::JoinHandle<()> {
    use tokio::time::{Duration, interval};

    info!(
        "Starting background registry refresh task (interval: {} minutes)",
        interval_minutes
    );

    tokio::spawn(async move {
        let period = Duration::from_secs(interval_minutes.max(1).saturating_mul(60));
        let mut ticker = interval(period);

        // Skip the first tick (which fires immediately)
        ticker.tick().await;

        loop {
            ticker.tick().await;

            match directory.read_endpoints_and_cache().await {
                Ok(stored) => info!("Scheduled refresh cached {} endpoints", stored.len()),
                Err(e) => warn!("Scheduled refresh failed, keeping current entry: {}", e),
            }
        }
    })
}
