//! bovespa-api - authenticated market data service
//!
//! Registers users, issues JWTs and serves Bovespa daily bars and the USD-BRL
//! rate to authenticated clients.

mod auth;
mod config;
mod db;
mod error;
mod http;
mod market;
mod metrics;
mod security;
mod state;
mod telemetry;

use crate::config::{Config, DatabaseBackend};
use crate::db::{Database, MemoryUserStore, UserStore};
use crate::state::AppState;
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration: optional file, then environment overrides
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let mut config = Config::load_or_default(&config_path).map_err(|e| {
        eprintln!("Failed to load config {config_path}: {e}");
        e
    })?;
    config.apply_process_env()?;

    telemetry::init(&config.logging);

    info!(
        server = %config.server.name,
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path,
        "Starting bovespa-api"
    );

    // SECURITY: Refuse to start with a default/weak token secret
    if let Some(secret) = config.auth.jwt_secret.as_deref()
        && security::is_weak_secret(secret)
    {
        if std::env::var("BOVESPA_ALLOW_INSECURE_SECRET").is_ok() {
            warn!("INSECURE: Running with weak jwt_secret (allowed via BOVESPA_ALLOW_INSECURE_SECRET)");
        } else {
            error!("FATAL: Insecure jwt_secret detected!");
            error!("  The jwt_secret signs every access token this server issues.");
            error!("  A weak or default secret lets anyone forge tokens for any user.");
            error!("");
            error!("  To fix, set JWT_SECRET_KEY or in config.toml:");
            error!("    [auth]");
            error!("    jwt_secret = \"<random-64-char-string>\"");
            error!("");
            error!("  Generate a secure secret with:");
            error!("    openssl rand -hex 32");
            error!("");
            error!("  For testing only, set BOVESPA_ALLOW_INSECURE_SECRET=1 to bypass this check.");
            return Err(anyhow::anyhow!(
                "Refusing to start with insecure jwt_secret. See error messages above."
            ));
        }
    }
    config.auth.resolve_secret();

    if let Err(errors) = config::validation::validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        return Err(anyhow::anyhow!(
            "{} configuration error(s). See error messages above.",
            errors.len()
        ));
    }

    // Initialize user store
    let database = match config.database.backend {
        DatabaseBackend::Postgres => {
            info!(url = %config.database.redacted_url(), "Connecting to PostgreSQL");
            let db = Database::connect(&config.database).await.map_err(|e| {
                error!(error = %e, "Failed to initialize database");
                e
            })?;
            Some(db)
        }
        DatabaseBackend::Memory => {
            warn!("Using in-memory user store. Registered users are lost on restart.");
            None
        }
    };
    let users: Arc<dyn UserStore> = match &database {
        Some(db) => Arc::new(db.clone()),
        None => Arc::new(MemoryUserStore::new()),
    };

    let state = AppState::new(&config, users)?;
    info!(
        algorithm = %state.auth.tokens().algorithm(),
        ttl_minutes = config.auth.access_token_expire_minutes,
        provider = state.market.name(),
        "Services ready"
    );

    // Prometheus metrics are optional.
    // Convention: metrics_port = 0 disables the HTTP endpoint (used by tests).
    let metrics_port = config.server.metrics_port;
    if metrics_port == 0 {
        info!("Metrics disabled");
    } else {
        metrics::init();
        info!("Metrics initialized");

        let host = config.server.host;
        tokio::spawn(async move {
            http::metrics_server::run_metrics_server(host, metrics_port).await;
        });
    }

    // Start rate limiter pruning task (runs every 5 minutes)
    {
        let limiter = Arc::clone(&state.limiter);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(300));
            loop {
                interval.tick().await;
                tracing::debug!(tracked = limiter.tracked(), "Pruning auth rate limiters");
                limiter.cleanup();
            }
        });
    }

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!(%addr, error = %e, "Failed to bind API listener");
        e
    })?;
    info!(%addr, "API listening");

    http::serve(listener, state, shutdown_signal()).await?;

    if let Some(db) = database {
        db.close().await;
        info!("Database pool closed");
    }
    info!("Shutdown complete");

    Ok(())
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
