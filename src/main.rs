use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use reel_api::{
    config::{Config, StorageBackend},
    db::{create_pool, run_migrations, MemoryFilmStore, PgFilmStore},
    routes::{create_router, AppState},
    services::FilmService,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("reel_api=debug,tower_http=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let films = match config.storage_backend {
        StorageBackend::Postgres => {
            let pool = create_pool(&config.database_url, config.db_max_connections)
                .await
                .context("Failed to connect to PostgreSQL")?;
            run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;
            tracing::info!(max_connections = config.db_max_connections, "Connected to PostgreSQL");
            FilmService::from_store(Arc::new(PgFilmStore::new(pool)))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on shutdown");
            FilmService::from_store(Arc::new(MemoryFilmStore::new()))
        }
    };

    let app = create_router(AppState::new(films));

    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr()))?;
    tracing::info!(addr = %config.bind_addr(), "Server running");

    axum::serve(listener, app).await?;

    Ok(())
}
