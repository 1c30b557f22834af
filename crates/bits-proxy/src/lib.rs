//! Bits Upstream Proxy
//!
//! This crate provides the client for retrieving the banking endpoint
//! registry file from the GitHub contents API, together with the
//! credential capability used to authenticate against it.

pub mod breaker;
pub mod client;
pub mod credential;
pub mod error;

pub use breaker::{BreakerConfig, CircuitBreaker, CircuitState};
pub use client::{EndpointSource, GithubClient, GithubClientConfig};
pub use credential::{CredentialProvider, EnvSecretProvider, StaticCredential};
pub use error::ProxyError;
