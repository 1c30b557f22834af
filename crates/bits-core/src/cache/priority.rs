//! Cache entry priority hint

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error type for parsing a cache priority
#[derive(Debug, Clone)]
pub struct ParseCachePriorityError(String);

impl fmt::Display for ParseCachePriorityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid cache priority: {}", self.0)
    }
}

impl std::error::Error for ParseCachePriorityError {}

/// Eviction priority recorded on the cache entry.
///
/// The store holds a single entry and never evicts for space, so this is
/// informational and reported through the cache statistics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CachePriority {
    Low,
    Normal,
    #[default]
    High,
    NeverRemove,
}

impl CachePriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            CachePriority::Low => "low",
            CachePriority::Normal => "normal",
            CachePriority::High => "high",
            CachePriority::NeverRemove => "never_remove",
        }
    }
}

impl fmt::Display for CachePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CachePriority {
    type Err = ParseCachePriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "low" => Ok(CachePriority::Low),
            "normal" => Ok(CachePriority::Normal),
            "high" => Ok(CachePriority::High),
            "never_remove" | "neverremove" => Ok(CachePriority::NeverRemove),
            _ => Err(ParseCachePriorityError(s.to_string())),
        }
    }
}
