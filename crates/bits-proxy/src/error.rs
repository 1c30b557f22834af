//! Proxy error types

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream resource not found: {0}")]
    NotFound(String),

    #[error("Upstream returned error: {status} - {message}")]
    UpstreamError { status: u16, message: String },

    #[error("Credential unavailable: {0}")]
    Credential(String),

    #[error("Upstream circuit open, retry in {retry_after:?}")]
    CircuitOpen { retry_after: Duration },
}

impl ProxyError {
    /// Transport failures and 5xx responses are worth one more attempt;
    /// 4xx and credential errors will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProxyError::Http(_) => true,
            ProxyError::UpstreamError { status, .. } => *status >= 500,
            ProxyError::NotFound(_) | ProxyError::Credential(_) | ProxyError::CircuitOpen { .. } => {
                false
            }
        }
    }

    /// HTTP status reported by the upstream, if it answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ProxyError::Http(e) => e.status().map(|s| s.as_u16()),
            ProxyError::NotFound(_) => Some(404),
            ProxyError::UpstreamError { status, .. } => Some(*status),
            ProxyError::Credential(_) | ProxyError::CircuitOpen { .. } => None,
        }
    }
}
