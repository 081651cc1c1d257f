//! Missing-hours dashboard API server.

use std::sync::Arc;

use axum::{routing::get, Router};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use shiftgap_core::config::DbConfig;

mod dashboard;
mod middleware;

/// Shared state for all routes.
pub struct AppState {
    pub pool: PgPool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = match DbConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "invalid database configuration");
            std::process::exit(1);
        }
    };

    let pool = match shiftgap_core::db::connect(&config) {
        Ok(pool) => pool,
        Err(err) => {
            tracing::error!(error = %err, "failed to create database pool");
            std::process::exit(1);
        }
    };
    tracing::info!(
        max_connections = config.max_connections,
        "database pool initialized"
    );

    let state = Arc::new(AppState { pool: pool.clone() });

    let app = Router::new()
        .route(
            "/api/dashboard/missing-hours",
            get(dashboard::get_missing_hours),
        )
        .route("/api/health/database", get(middleware::database_health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(error = %err, %addr, "failed to bind listener");
            std::process::exit(1);
        }
    };
    tracing::info!(%addr, "listening");

    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %err, "server error");
    }

    // Tear the shared pool down explicitly on the way out.
    pool.close().await;
    tracing::info!("database pool closed");
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
