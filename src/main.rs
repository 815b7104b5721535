// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

use todo_manager_server::{
    agent::OpenRouterClient,
    api::router,
    auth::TokenService,
    config::{Config, RECOMMENDED_SECRET_KEY_BYTES},
    logging,
    state::AppState,
    storage::PgStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Invalid configuration")?;
    logging::init(config.server.log_format);

    if config.auth.secret_is_short() {
        tracing::warn!(
            recommended_bytes = RECOMMENDED_SECRET_KEY_BYTES,
            "SECRET_KEY is shorter than recommended"
        );
    }

    tracing::info!(
        database = %config.database_url.redacted(),
        max_connections = config.database_max_connections,
        "Connecting to PostgreSQL"
    );
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(config.database_url.as_str())
        .await
        .context("Failed to connect to PostgreSQL")?;

    let store = PgStore::new(pool);
    store
        .init_tables()
        .await
        .context("Failed to initialize database tables")?;

    let mut state = AppState::new(Arc::new(store), TokenService::new(&config.auth));
    match OpenRouterClient::from_settings(&config.chat).context("Failed to build chat client")? {
        Some(client) => {
            tracing::info!(model = %client.model(), "Chat assistant enabled");
            state = state.with_chat_model(Arc::new(client));
        }
        None => tracing::warn!("OPENROUTER_API_KEY not set; chat assistant disabled"),
    }

    let app = router(state, &config.server.cors_origins);

    let addr = config.server.bind_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(%addr, "Todo Manager API listening (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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

    tracing::info!("Shutdown signal received");
}
