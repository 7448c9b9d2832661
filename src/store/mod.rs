//! Persistence backends. Each domain module declares its repository trait and
//! implements it for [`PgStore`] next to its SQL.

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

#[cfg(test)]
pub mod memory;

#[derive(Clone)]
pub struct PgStore {
    pub db: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { db })
    }

    /// Applies `migrations/`; a failure is logged and startup continues.
    pub async fn migrate(&self) {
        if let Err(e) = sqlx::migrate!("./migrations").run(&self.db).await {
            tracing::warn!(error = %e, "migration failed; continuing");
        }
    }
}
