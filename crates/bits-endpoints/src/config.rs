//! Configuration loading and management

use anyhow::{Context, Result};
use bits_core::CachePriority;
use bits_proxy::BreakerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Bounds for the cache time to live, in minutes (one minute to one week)
const MIN_TTL_MINUTES: u32 = 1;
const MAX_TTL_MINUTES: u32 = 10_080;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

/// Upstream registry file configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_owner")]
    pub owner: String,
    #[serde(default = "default_repository")]
    pub repository: String,
    /// Path of the registry file inside the repository
    #[serde(default = "default_resource_path")]
    pub resource_path: String,
    /// Access token given directly; takes precedence over `token_name`
    #[serde(default)]
    pub token: Option<String>,
    /// Name of the secret holding the access token
    #[serde(default = "default_token_name")]
    pub token_name: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Consecutive failed fetches before the circuit opens; 0 disables it
    #[serde(default = "default_breaker_failure_threshold")]
    pub breaker_failure_threshold: u32,
    #[serde(default = "default_breaker_open_secs")]
    pub breaker_open_secs: u64,
}

impl SourceConfig {
    /// Literal token, if one is configured and non-blank
    pub fn literal_token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn breaker(&self) -> BreakerConfig {
        BreakerConfig {
            failure_threshold: self.breaker_failure_threshold,
            open_duration: Duration::from_secs(self.breaker_open_secs),
        }
    }
}

impl std::fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceConfig")
            .field("api_url", &self.api_url)
            .field("owner", &self.owner)
            .field("repository", &self.repository)
            .field("resource_path", &self.resource_path)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("token_name", &self.token_name)
            .field("timeout_secs", &self.timeout_secs)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("breaker_failure_threshold", &self.breaker_failure_threshold)
            .field("breaker_open_secs", &self.breaker_open_secs)
            .finish()
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            owner: default_owner(),
            repository: default_repository(),
            resource_path: default_resource_path(),
            token: None,
            token_name: default_token_name(),
            timeout_secs: default_timeout_secs(),
            retry_backoff_ms: default_retry_backoff_ms(),
            breaker_failure_threshold: default_breaker_failure_threshold(),
            breaker_open_secs: default_breaker_open_secs(),
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: u32,
    #[serde(default = "default_priority")]
    pub priority: String,
    /// Load the registry once before serving
    #[serde(default = "default_warm_on_startup")]
    pub warm_on_startup: bool,
    /// Background refresh interval; 0 disables it
    #[serde(default)]
    pub refresh_interval_minutes: u64,
}

impl CacheConfig {
    /// Clamp the TTL to [1, 10080] minutes and log a warning if adjusted.
    pub fn validated_ttl_minutes(&self) -> u32 {
        if self.ttl_minutes < MIN_TTL_MINUTES {
            warn!(
                "ttl_minutes {} is below minimum {}, using minimum",
                self.ttl_minutes, MIN_TTL_MINUTES
            );
            MIN_TTL_MINUTES
        } else if self.ttl_minutes > MAX_TTL_MINUTES {
            warn!(
                "ttl_minutes {} exceeds maximum {}, using maximum",
                self.ttl_minutes, MAX_TTL_MINUTES
            );
            MAX_TTL_MINUTES
        } else {
            self.ttl_minutes
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: default_ttl_minutes(),
            priority: default_priority(),
            warm_on_startup: default_warm_on_startup(),
            refresh_interval_minutes: 0,
        }
    }
}

/// Directory configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Serve endpoints tagged `test` instead of `prod`
    #[serde(default)]
    pub use_test_endpoints: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_owner() -> String {
    "data-altinn-no".to_string()
}

fn default_repository() -> String {
    "bits".to_string()
}

fn default_resource_path() -> String {
    "endpoints.csv".to_string()
}

fn default_token_name() -> String {
    "GITHUB_PAT".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_breaker_failure_threshold() -> u32 {
    5
}

fn default_breaker_open_secs() -> u64 {
    30
}

fn default_ttl_minutes() -> u32 {
    300
}

fn default_priority() -> String {
    "high".to_string()
}

fn default_warm_on_startup() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Config {
    /// Load configuration from a file, falling back to defaults when the
    /// file does not exist. The flag reports whether the file was read.
    pub fn load(path: &str) -> Result<(Self, bool)> {
        let config_path = Path::new(path);

        if !config_path.exists() {
            return Ok((Self::default(), false));
        }

        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        Ok((config, true))
    }

    pub fn cache_priority(&self) -> Result<CachePriority> {
        self.cache
            .priority
            .parse::<CachePriority>()
            .context("invalid cache.priority")
    }

    /// Reject configurations the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.source.resource_path.trim().is_empty() {
            anyhow::bail!("source.resource_path must not be empty");
        }

        if self.source.literal_token().is_none() && self.source.token_name.trim().is_empty() {
            anyhow::bail!("one of source.token or source.token_name must be set");
        }

        self.cache_priority()?;

        if self.cache.refresh_interval_minutes > u64::from(MAX_TTL_MINUTES) {
            anyhow::bail!(
                "cache.refresh_interval_minutes must be at most {}, got {}",
                MAX_TTL_MINUTES,
                self.cache.refresh_interval_minutes
            );
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            anyhow::bail!(
                "logging.format must be \"pretty\" or \"json\", got \"{}\"",
                self.logging.format
            );
        }

        Ok(())
    }
}
