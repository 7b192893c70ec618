//! Artefact records and table rows for tests.

use anyhow::Result;
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

/// A unique artefact id so tests sharing one database never collide.
pub fn unique_artefact_id() -> String {
    format!("artefact-{}", Uuid::new_v4())
}

/// An eligible RSS record pointing at `locator` with a `div.content` rule.
pub fn rss_record(artefact_id: &str, locator: &str) -> Value {
    json!({
        "artefact_id": artefact_id,
        "source_type": "RSS",
        "locator": locator,
        "article_element": {"div": ["content"]},
    })
}

pub fn to_payload(record: &Value) -> Vec<u8> {
    serde_json::to_vec(record).expect("fixture record serializes")
}

pub async fn insert_artefact(pool: &PgPool, artefact_id: &str, locator: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO collected_artefacts (artefact_id, source_type, locator, article_element) \
         VALUES ($1, 'RSS', $2, '{\"div\": [\"content\"]}'::jsonb)",
    )
    .bind(artefact_id)
    .bind(locator)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn fetch_raw_content(pool: &PgPool, artefact_id: &str) -> Result<Option<String>> {
    let raw_content: Option<String> =
        sqlx::query_scalar("SELECT raw_content FROM collected_artefacts WHERE artefact_id = $1")
            .bind(artefact_id)
            .fetch_one(pool)
            .await?;

    Ok(raw_content)
}
