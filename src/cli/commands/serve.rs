use anyhow::{bail, Context};
use std::sync::Arc;

use crate::config;
use crate::database::{DatabaseManager, MemoryStore, PgRepository, Store};
use crate::features;
use crate::handlers::{app, AppState};
use crate::is_production;

pub async fn handle(port: Option<u16>, memory: bool) -> anyhow::Result<()> {
    let mut config = config::config().clone();
    tracing::info!("Starting Procure API in {:?} mode", config.environment);

    if config.security.jwt_secret.is_empty() {
        bail!("SECURITY_JWT_SECRET must be set outside development");
    }
    if memory && is_production!() {
        bail!("The in-memory store is not available in production");
    }
    if let Some(port) = port {
        config.api.port = port;
    }

    let mut pool = None;
    let store: Arc<dyn Store> = if memory {
        tracing::warn!("Using in-memory store; data is lost on shutdown");
        Arc::new(MemoryStore::new())
    } else {
        let connected = DatabaseManager::connect(&config.database)
            .await
            .context("Failed to connect to database")?;
        let repository = PgRepository::new(connected.clone());
        repository
            .ensure_schema()
            .await
            .context("Failed to prepare database schema")?;
        pool = Some(connected);
        Arc::new(repository)
    };

    let dispatcher = features::register_all(store).context("Failed to register request handlers")?;

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let router = app(AppState::new(dispatcher, config, pool));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Procure API listening on http://{}", bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
