//! Postgres persistence. The pool is optional: with USE_DATABASE disabled
//! the server runs fully in memory and every store call is skipped.

pub mod operations;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{error, info};

use crate::config::DatabaseConfig;

pub use operations::{Chat, ChatMessage, ChatPage, ChatStore, NewMessage};

/// Connect and run migrations. Returns None when the database is disabled or
/// unreachable; callers degrade to memory-only operation.
pub async fn create_pool(config: &DatabaseConfig) -> Option<PgPool> {
    if !config.enabled {
        info!("Database disabled, running without persistence");
        return None;
    }

    let pool = match PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            error!(error = %e, "Database connection failed, running without persistence");
            return None;
        }
    };

    if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
        error!(error = %e, "Migrations failed, running without persistence");
        return None;
    }

    info!("Database connected");
    Some(pool)
}

pub async fn health_check(pool: &PgPool) -> bool {
    sqlx::query("SELECT 1").fetch_one(pool).await.is_ok()
}
