//! Kernel module - infrastructure adapters and dependencies.

pub mod deps;
pub mod fetcher;
pub mod kafka;
pub mod store;
pub mod test_dependencies;
pub mod traits;

pub use deps::EnricherDeps;
pub use fetcher::{FetchError, ProxiedFetcher};
pub use kafka::{KafkaPublisher, KafkaSource};
pub use store::PgArtefactStore;
pub use test_dependencies::TestDependencies;
pub use traits::*;
