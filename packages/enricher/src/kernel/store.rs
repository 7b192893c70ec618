//! Postgres adapter for the `collected_artefacts` table.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::debug;

use super::BaseArtefactStore;

const UPDATE_RAW_CONTENT: &str =
    "UPDATE collected_artefacts SET raw_content = $1 WHERE artefact_id = $2";

/// Writes extracted content back to the artefact row.
#[derive(Clone)]
pub struct PgArtefactStore {
    pool: PgPool,
}

impl PgArtefactStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a small pool; access is strictly sequential.
    pub async fn connect_with(options: PgConnectOptions, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        Ok(Self::new(pool))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl BaseArtefactStore for PgArtefactStore {
    async fn update_raw_content(&self, artefact_id: &str, raw_content: &str) -> Result<u64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let result = sqlx::query(UPDATE_RAW_CONTENT)
            .bind(raw_content)
            .bind(artefact_id)
            .execute(&mut *tx)
            .await
            .context("Failed to update raw content")?;

        tx.commit()
            .await
            .context("Failed to commit raw content update")?;

        debug!(
            artefact_id = %artefact_id,
            rows_affected = result.rows_affected(),
            "raw content update committed"
        );

        Ok(result.rows_affected())
    }
}
