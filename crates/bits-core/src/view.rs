//! Time-windowed views over the cached superset
//!
//! Views are computed on every read against the read-time clock, never
//! cached, so validity boundaries are honoured while the same superset
//! stays in the cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::EndpointView;

/// Which projection of the superset a caller wants
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ViewKind {
    /// Currently valid endpoints, dates hidden
    Active,
    /// Endpoints not yet expired, dates kept
    Dated,
}

impl ViewKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewKind::Active => "active",
            ViewKind::Dated => "dated",
        }
    }
}

/// Apply the projection selected by `kind`
pub fn project(superset: &[EndpointView], now: DateTime<Utc>, kind: ViewKind) -> Vec<EndpointView> {
    match kind {
        ViewKind::Active => project_active(superset, now),
        ViewKind::Dated => project_with_dates(superset, now),
    }
}

/// Endpoints whose window contains `now`, with both dates cleared
pub fn project_active(superset: &[EndpointView], now: DateTime<Utc>) -> Vec<EndpointView> {
    superset
        .iter()
        .filter(|endpoint| endpoint.is_active_at(now))
        .map(EndpointView::without_dates)
        .collect()
}

/// Endpoints that have not expired at `now`, dates kept.
///
/// Endpoints that have not started yet are included.
pub fn project_with_dates(superset: &[EndpointView], now: DateTime<Utc>) -> Vec<EndpointView> {
    superset
        .iter()
        .filter(|endpoint| !endpoint.has_expired_at(now))
        .cloned()
        .collect()
}
