use std::sync::Arc;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;
        Ok(Self { db, config })
    }
}

/// Bulk-removes all bookmarks and users, for test isolation.
#[cfg(test)]
pub async fn clean_db(db: &PgPool) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM bookmarks").execute(db).await?;
    sqlx::query("DELETE FROM users").execute(db).await?;
    Ok(())
}
