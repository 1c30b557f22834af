//! Core error types

use bits_proxy::ProxyError;
use std::sync::Arc;
use thiserror::Error;

/// Directory failure. Cheap to clone so one failed refresh can be handed to
/// every caller that waited on it.
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(#[source] Arc<ProxyError>),

    #[error("Unable to parse endpoint registry: {0}")]
    ParseFailure(#[source] Arc<ParseError>),
}

impl From<ProxyError> for CoreError {
    fn from(err: ProxyError) -> Self {
        CoreError::UpstreamUnavailable(Arc::new(err))
    }
}

impl From<ParseError> for CoreError {
    fn from(err: ParseError) -> Self {
        CoreError::ParseFailure(Arc::new(err))
    }
}

impl CoreError {
    /// Every failure of the directory comes from an external data source
    /// and may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            CoreError::UpstreamUnavailable(_) | CoreError::ParseFailure(_) => true,
        }
    }

    /// Stable error code for callers
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            CoreError::ParseFailure(_) => "UNABLE_TO_PARSE_RESPONSE",
        }
    }
}

/// Errors raised while decoding the delimited registry file
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Malformed row at line {line}: {reason}")]
    Malformed { line: u64, reason: String },

    #[error("Invalid date format at line {line}: '{value}'")]
    InvalidDateFormat { line: u64, value: String },
}
