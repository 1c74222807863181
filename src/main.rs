use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};

use url_sentinel::api::start_api_server;
use url_sentinel::config::Config;
use url_sentinel::engine::SystemClock;
use url_sentinel::init::{
    build_sentinel, init_classifier, init_store, setup_logging, spawn_cache_sweeper,
};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load Config
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config_exists = std::path::Path::new(&config_path).exists();
    let config = if config_exists {
        Config::load(&config_path).await?
    } else {
        Config::default()
    };

    // 2. Setup Logging
    setup_logging(&config);
    info!("Starting url-sentinel...");
    if !config_exists {
        info!("Config file not found, using defaults.");
    }

    // 3. Persistence, classifier, pipeline
    let store = init_store(&config);
    let classifier = init_classifier(&config)?;
    let sentinel = build_sentinel(&config, store, classifier, Arc::new(SystemClock))?;

    // 4. Background cache sweep
    spawn_cache_sweeper(
        sentinel.pipeline.clone(),
        Duration::from_secs(config.cache.sweep_interval_secs.max(1)),
    );

    // 5. API Server
    let ip = config
        .host
        .parse()
        .with_context(|| format!("Invalid host '{}'", config.host))?;
    let addr = SocketAddr::new(ip, config.port);
    let api = tokio::spawn(start_api_server(
        sentinel.enforcer.clone(),
        config.ledger.recent_default,
        addr,
    ));

    // 6. Graceful Shutdown
    tokio::select! {
        res = api => {
            match res {
                Ok(Err(e)) => error!("API server failed: {}", e),
                Err(e) => error!("API server task failed: {}", e),
                Ok(Ok(())) => {}
            }
        }
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received.");
        }
    }

    // Flush pending writes before exit
    sentinel.writer.flush().await;
    Ok(())
}
