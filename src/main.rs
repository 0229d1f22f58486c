//! Taskmanager server: picks the storage backend from the environment, runs migrations
//! for PostgreSQL, then serves the common and record routes.

use sqlx::postgres::PgPoolOptions;
use taskmanager::{
    app, apply_migrations, ensure_database_exists, AppState, ConfigError, ServerConfig,
    StorageKind,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("taskmanager=info,tower_http=info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let state = match config.storage {
        StorageKind::Memory => {
            tracing::info!("using in-memory storage");
            AppState::in_memory(config.pages)
        }
        StorageKind::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or(ConfigError::Missing("DATABASE_URL"))?;
            ensure_database_exists(database_url).await?;
            let pool = PgPoolOptions::new()
                .max_connections(config.db_max_connections)
                .connect(database_url)
                .await?;
            apply_migrations(&pool, &config.database_schema).await?;
            tracing::info!(schema = %config.database_schema, "using postgres storage");
            AppState::postgres(pool, config.database_schema.clone(), config.pages)
        }
    };

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app(state, config.max_body_bytes)).await?;
    Ok(())
}
