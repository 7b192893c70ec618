//! Artefact enricher
//!
//! Consumes raw artefacts from Kafka, scrapes the article text for RSS
//! artefacts, stores it and republishes the enriched record.

use std::sync::Arc;

use anyhow::{Context, Result};
use enricher_core::domains::enrichment::{ConsumptionLoop, ConsumptionLoopConfig, EnrichmentProcessor};
use enricher_core::kernel::{EnricherDeps, KafkaPublisher, KafkaSource, PgArtefactStore, ProxiedFetcher};
use enricher_core::Config;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,enricher_core=debug,sqlx=warn,rdkafka=warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!("Starting artefact enricher");

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(
        topic_consume = %config.kafka_topic_consume,
        topic_produce = %config.kafka_topic_produce,
        proxy = config.proxy_url.is_some(),
        "Configuration loaded"
    );

    tracing::info!("Connecting to database...");
    let store = Arc::new(
        PgArtefactStore::connect_with(config.database.clone(), config.database_max_connections)
            .await?,
    );
    tracing::info!("Database connected");

    let fetcher = Arc::new(ProxiedFetcher::new(config.proxy_url.as_deref())?);
    let publisher = Arc::new(KafkaPublisher::new(&config)?);

    let loop_config = ConsumptionLoopConfig {
        poll_timeout: config.poll_timeout,
        ..Default::default()
    };
    let source = Arc::new(KafkaSource::new(&config, &loop_config.worker_id)?);

    let processor = EnrichmentProcessor::new(EnricherDeps::new(fetcher, store.clone(), publisher));

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    let stats = ConsumptionLoop::with_config(source, processor, loop_config)
        .run(shutdown)
        .await;

    store.close().await;
    tracing::info!(
        received = stats.received,
        enriched = stats.enriched,
        "Enricher stopped"
    );

    Ok(())
}

/// Cancel `shutdown` on Ctrl-C or SIGTERM.
async fn cancel_on_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Shutdown signal received");
    shutdown.cancel();
}
