// Artefact Enricher - Core
//
// Consumes raw artefact records from Kafka, fetches the source document,
// extracts the article text with the record's extraction rule, stores it in
// Postgres and republishes the enriched record under the processed key.
//
// Enrichment logic lives in domains/enrichment; adapters to Kafka, Postgres
// and HTTP live in kernel/.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;

pub use config::*;
