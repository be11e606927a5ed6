//! colis-server binary: loads config and serves the blob host API.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use colis_server::api::{self, AppState};
use colis_server::blob_store::BlobStore;
use colis_server::config::ServerConfig;
use colis_server::rate_limit::RateLimiter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,colis_server=debug")),
        )
        .init();

    info!("Starting Colis blob host v{}", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    let blob_store = Arc::new(
        BlobStore::new(config.blob_storage_path.clone(), config.max_blob_size).await?,
    );

    let rate_limiter = RateLimiter::from_config(&config);
    // Every 5 minutes, evict buckets idle for more than 10.
    rate_limiter.spawn_purge(Duration::from_secs(300), Duration::from_secs(600));

    let http_addr = config.http_addr;
    let app_state = AppState {
        blob_store,
        rate_limiter,
        config: Arc::new(config),
    };

    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
