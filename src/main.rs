mod admin;
mod auth;
mod case;
mod db;
mod dto;
mod error;
mod middleware;
mod notification;
mod report;
mod routes;
mod source;
mod state;
mod template;
mod user;

use anyhow::Context;
use db::{create_pool, run_migrations};
use notification::start_deadline_scheduler;
use routes::create_router;
use state::{AppState, Config};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,case_tracker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env()?);

    tracing::info!("Connecting to database...");
    let db = create_pool(&config.database_url, config.db_max_connections)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Running migrations...");
    run_migrations(&db).await.context("Failed to run migrations")?;

    // Live notification feed for SSE subscribers
    let (notification_tx, _) = broadcast::channel(100);

    let state = AppState::new(db, config.clone(), notification_tx);

    // Kept alive for the lifetime of the server
    let _scheduler = start_deadline_scheduler(state.clone())
        .await
        .context("Failed to start deadline scheduler")?;

    let app = create_router(state);

    let addr = config.bind_addr();
    tracing::info!("Server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
