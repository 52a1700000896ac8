//! # Shopfront API Server
//!
//! ## Startup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  .env (optional) ──► ApiConfig::load()                                  │
//! │                           │                                             │
//! │            SHOPFRONT_STORE=postgres        SHOPFRONT_STORE=memory       │
//! │                 │                                │                      │
//! │      Database::new (pool + migrations)    MemoryStore + demo catalog    │
//! │                 └───────────────┬────────────────┘                      │
//! │                                 ▼                                       │
//! │                 axum::serve(app_router(state)) on HTTP_PORT             │
//! │                                 │                                       │
//! │                 Ctrl+C / SIGTERM ──► graceful shutdown, pool closed     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use shopfront_api::config::{StoreKind, DEV_JWT_SECRET};
use shopfront_api::{app_router, ApiConfig, AppState};
use shopfront_db::{Database, DbResult, MemoryStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,shopfront=debug")),
        )
        .with_target(true)
        .init();

    info!("Starting Shopfront API server...");

    let config = ApiConfig::load()?;
    let addr = config.socket_addr()?;
    info!(
        %addr,
        store = ?config.store,
        lock_timeout_ms = config.checkout_lock_timeout_ms,
        "Configuration loaded"
    );

    if config.jwt_secret == DEV_JWT_SECRET {
        warn!("JWT_SECRET is not set; using the development secret");
    }

    let state = match config.store {
        StoreKind::Postgres => {
            let db = Database::new(config.db_config()).await?;
            info!("Connected to PostgreSQL");

            let (embedded, applied) = db.migration_status().await?;
            info!(embedded, applied, "Migration status");

            AppState::postgres(db, config)
        }
        StoreKind::Memory => {
            let store = MemoryStore::with_lock_timeout(config.lock_timeout());
            let products = seed_demo_catalog(&store)?;
            warn!(products, "Running on the in-memory store; nothing is persisted");
            AppState::memory(store, config)
        }
    };

    let database = state.database.clone();
    let app = app_router(state);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(db) = database {
        db.close().await;
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Small catalog so the memory store is usable without a seed step.
fn seed_demo_catalog(store: &MemoryStore) -> DbResult<usize> {
    const DEMO: &[(&str, i64, i64)] = &[
        ("Ceramic Mug", 800, 25),
        ("T-Shirt Navy", 2500, 10),
        ("Notebook", 650, 40),
        ("Desk Lamp", 4000, 5),
        ("Limited Edition Poster", 3000, 0),
    ];

    for (name, price_cents, stock) in DEMO {
        store.insert_product(*name, *price_cents, *stock)?;
    }
    Ok(DEMO.len())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received, starting graceful shutdown...");
}
