//! relaynode server binary.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `relaynode.yaml` (or `RELAYNODE_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Open the configured store, running migrations for `PostgreSQL`
//! 4. Seed demo data into an empty store when enabled
//! 5. Serve the HTTP API until `Ctrl-C`, then close the store

use std::sync::Arc;

use relaynode_api::{AppState, Backend, RelaynodeConfig, start_server};
use relaynode_db::{QueryPort, seed};
use relaynode_types::EntityType;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, store setup, or the server fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config = RelaynodeConfig::load()?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!(
        host = %config.server.host,
        port = config.server.port,
        backend = ?config.store.backend,
        max_page_size = config.pagination.max_page_size,
        "relaynode starting"
    );

    // 3. Open the store.
    let backend = Backend::connect(&config.store).await?;
    info!(backend = backend.name(), "Store ready");

    // 4. Seed demo data.
    if config.store.seed {
        if backend.count(EntityType::User).await? == 0 {
            let summary = seed(&backend).await?;
            info!(
                users = summary.users.len(),
                posts = summary.posts.len(),
                comments = summary.comments,
                "Demo data loaded"
            );
        } else {
            info!("Store already populated, skipping seed");
        }
    }

    // 5. Serve.
    let state = Arc::new(AppState::new(backend, &config));
    start_server(&config.server, Arc::clone(&state)).await?;
    state.backend.close().await;

    Ok(())
}
