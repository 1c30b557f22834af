//! Endpoint cache module

mod priority;
mod store;

pub use priority::{CachePriority, ParseCachePriorityError};
pub use store::{CacheConfig, CacheStats, ENDPOINTS_KEY, EndpointCache};
