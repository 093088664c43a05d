//! Escrow gateway — entry point.
//!
//! Hosts the milestone escrow engine behind a small Axum REST API and
//! records its append-only event log to SQLite for dashboards and
//! auditors. All mutations are serialized through one writer lock; the
//! engine itself stays synchronous and single-writer.

mod api;
mod config;
mod db;
mod errors;
mod recorder;
mod records;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use escrow_engine::EscrowEngine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    // Load config from environment.
    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    // Set up the SQLite connection pool and run migrations.
    let pool = db::init_pool(&config.database_url).await?;

    let state = Arc::new(api::ApiState {
        engine: RwLock::new(EscrowEngine::new()),
        pool,
    });

    let app = Router::new()
        .route("/health", get(api::health))
        .route("/projects", post(api::create_project))
        .route("/projects/count", get(api::project_count))
        .route("/projects/:id", get(api::get_project))
        .route("/projects/:id/contributions", post(api::contribute))
        .route(
            "/projects/:id/milestones/:index",
            get(api::get_milestone),
        )
        .route(
            "/projects/:id/milestones/:index/verify",
            post(api::verify_milestone),
        )
        .route(
            "/projects/:id/milestones/:index/pay",
            post(api::pay_milestone),
        )
        .route("/projects/:id/complete", post(api::complete_project))
        .route("/projects/:id/events", get(api::get_project_events))
        .route("/events", get(api::get_all_events))
        .route("/certificates/:id", get(api::get_certificate))
        .route("/owners/:owner/certificates", get(api::get_certificates_of))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
