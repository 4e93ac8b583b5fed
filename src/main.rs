//! Storefront - cart and order service

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront::config::Config;
use storefront::http::{router, AppState};
use storefront::publisher::EventPublisher;
use storefront::store::{MemoryStore, PgStore};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => {
                warn!(error = %e, "NATS unavailable, domain events will only be logged");
                None
            }
        },
        None => None,
    };
    let publisher = EventPublisher::new(nats, config.event_subject_prefix.clone());

    let state = match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url, config.database_max_connections)
                .await
                .context("failed to connect to DATABASE_URL")?;
            AppState::new(Arc::new(store), publisher, config.session_ttl())
        }
        None => {
            warn!("DATABASE_URL not set, using the in-memory store; data is lost on exit");
            AppState::new(Arc::new(MemoryStore::new()), publisher, config.session_ttl())
        }
    };

    if let Some(admin) = &config.admin {
        state
            .users
            .ensure_admin(&admin.email, &admin.password)
            .await
            .context("failed to ensure the admin account")?;
    }

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.with_context(|| format!("failed to bind {addr}"))?;
    info!("Storefront listening on {addr}");
    axum::serve(listener, router(state)).with_graceful_shutdown(shutdown_signal()).await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!(error = %e, "failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!(error = %e, "failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
