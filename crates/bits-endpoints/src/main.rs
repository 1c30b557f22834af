//! Bits Endpoints - banking endpoint directory service

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;

use bits_api::{AppState, create_router};
use bits_core::{
    CacheConfig, EndpointCache, EndpointDirectory, Environment, SystemClock, spawn_refresh_task,
};
use bits_proxy::{
    CredentialProvider, EnvSecretProvider, GithubClient, GithubClientConfig, StaticCredential,
};
use config::{Config, LoggingConfig};

/// Bits Endpoints - directory of banking endpoint registrations
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    /// Bind address
    #[arg(long, env = "BITS_BIND")]
    bind: Option<String>,

    /// Port
    #[arg(short, long, env = "BITS_PORT")]
    port: Option<u16>,

    /// Serve test endpoints instead of production ones
    #[arg(long, env = "BITS_USE_TEST_ENDPOINTS")]
    test_endpoints: Option<bool>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (mut config, from_file) = Config::load(&args.config)?;
    if let Some(use_test) = args.test_endpoints {
        config.directory.use_test_endpoints = use_test;
    }
    config.validate()?;

    init_logging(&config.logging);

    info!("Starting Bits Endpoints v{}", env!("CARGO_PKG_VERSION"));
    if from_file {
        info!("Loaded configuration from {}", args.config);
    } else {
        info!("Config file not found at {}, using defaults", args.config);
    }

    let metrics_handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    // Literal token wins, otherwise look the token up by name
    let credentials: Arc<dyn CredentialProvider> = match config.source.literal_token() {
        Some(token) => Arc::new(StaticCredential::new(token)),
        None => Arc::new(EnvSecretProvider::new()),
    };

    let upstream = Arc::new(GithubClient::new(
        GithubClientConfig {
            api_url: config.source.api_url.clone(),
            owner: config.source.owner.clone(),
            repository: config.source.repository.clone(),
            resource_path: config.source.resource_path.clone(),
            token_name: config.source.token_name.clone(),
            timeout: config.source.timeout(),
            retry_backoff: config.source.retry_backoff(),
            breaker: config.source.breaker(),
        },
        credentials,
    )?);

    let clock = Arc::new(SystemClock);
    let cache_config = CacheConfig {
        ttl: chrono::Duration::minutes(config.cache.validated_ttl_minutes().into()),
        priority: config.cache_priority()?,
        environment: Environment::from_test_flag(config.directory.use_test_endpoints),
    };
    let cache = Arc::new(EndpointCache::new(cache_config, clock.clone()));
    let directory = Arc::new(EndpointDirectory::new(upstream, cache, clock));

    if config.cache.warm_on_startup {
        directory.warm_up().await;
    }

    if config.cache.refresh_interval_minutes > 0 {
        spawn_refresh_task(directory.clone(), config.cache.refresh_interval_minutes);
    }

    let state = AppState::new(directory);
    let app = create_router(state, Some(Arc::new(metrics_handle))).layer(TraceLayer::new_for_http());

    let bind_addr = args.bind.unwrap_or(config.server.bind_address);
    let port = args.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", bind_addr, port).parse()?;

    info!("Listening on {}", addr);
    info!(
        "Upstream: {}/{}/{}",
        config.source.owner, config.source.repository, config.source.resource_path
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Initialize logging
fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let registry = tracing_subscriber::registry().with(filter);

    if config.format == "json" {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C handler");
    info!("Shutdown signal received");
}
