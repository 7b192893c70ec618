use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use sqlx::postgres::PgConnectOptions;

pub const DEFAULT_TOPIC: &str = "collected_artefacts_dev";
pub const DEFAULT_GROUP_ID: &str = "collected_artefacts_rss_group";

/// Worker configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub kafka_bootstrap_servers: String,
    pub kafka_group_id: String,
    pub kafka_topic_consume: String,
    pub kafka_topic_produce: String,
    pub kafka_auto_offset_reset: String,
    pub kafka_delivery_timeout: Duration,
    pub poll_timeout: Duration,
    pub database: PgConnectOptions,
    pub database_max_connections: u32,
    pub proxy_url: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let kafka_topic_consume =
            var("KAFKA_TOPIC_CONSUME").unwrap_or_else(|| DEFAULT_TOPIC.to_string());

        Ok(Self {
            kafka_bootstrap_servers: var("KAFKA_BOOTSTRAP_SERVERS")
                .context("KAFKA_BOOTSTRAP_SERVERS must be set")?,
            kafka_group_id: var("KAFKA_GROUP_ID").unwrap_or_else(|| DEFAULT_GROUP_ID.to_string()),
            kafka_topic_produce: var("KAFKA_TOPIC_PRODUCE")
                .unwrap_or_else(|| kafka_topic_consume.clone()),
            kafka_topic_consume,
            kafka_auto_offset_reset: var("KAFKA_AUTO_OFFSET_RESET")
                .unwrap_or_else(|| "latest".to_string()),
            kafka_delivery_timeout: Duration::from_millis(
                var("KAFKA_DELIVERY_TIMEOUT_MS")
                    .unwrap_or_else(|| "5000".to_string())
                    .parse()
                    .context("KAFKA_DELIVERY_TIMEOUT_MS must be a valid number")?,
            ),
            poll_timeout: Duration::from_millis(
                var("POLL_TIMEOUT_MS")
                    .unwrap_or_else(|| "1000".to_string())
                    .parse()
                    .context("POLL_TIMEOUT_MS must be a valid number")?,
            ),
            database: database_options(&var)?,
            database_max_connections: var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|| "2".to_string())
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a valid number")?,
            proxy_url: var("PROXY_URL"),
        })
    }
}

/// `DATABASE_URL` wins; otherwise the connection is assembled from the
/// individual `POSTGRES_*` variables.
fn database_options<F>(var: &F) -> Result<PgConnectOptions>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = var("DATABASE_URL") {
        return PgConnectOptions::from_str(&url).context("DATABASE_URL is not a valid Postgres URL");
    }

    let port: u16 = var("POSTGRES_PORT")
        .unwrap_or_else(|| "5432".to_string())
        .parse()
        .context("POSTGRES_PORT must be a valid number")?;

    Ok(PgConnectOptions::new()
        .host(&var("POSTGRES_HOST").context("POSTGRES_HOST must be set")?)
        .port(port)
        .username(&var("POSTGRES_USER").context("POSTGRES_USER must be set")?)
        .password(&var("POSTGRES_PASSWORD").context("POSTGRES_PASSWORD must be set")?)
        .database(&var("POSTGRES_DB").context("POSTGRES_DB must be set")?))
}
