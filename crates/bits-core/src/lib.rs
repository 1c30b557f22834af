//! Bits Endpoint Directory Core
//!
//! This crate provides the retrieval, parsing, caching and projection
//! pipeline behind the banking endpoint directory.

pub mod cache;
pub mod clock;
pub mod directory;
pub mod error;
pub mod model;
pub mod parser;
pub mod view;

pub use cache::{CacheConfig, CachePriority, CacheStats, ENDPOINTS_KEY, EndpointCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use directory::{EndpointDirectory, spawn_refresh_task};
pub use error::{CoreError, ParseError};
pub use model::{EndpointRecord, EndpointView, EndpointsList, Environment};
pub use parser::{InvalidTimestamp, ParseOutcome, parse_endpoints, parse_timestamp};
pub use view::{ViewKind, project, project_active, project_with_dates};
