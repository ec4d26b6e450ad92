//! The ingestion pipeline: list sources, fetch each one concurrently, map
//! its items to articles and hand them to the store.
//!
//! Duplicate suppression is not done here. [`ArticleStore::upsert_batch`] is
//! required to be idempotent per article URL, and the coordinator relies on it.

mod coordinator;
mod error;
mod mapping;
mod ports;

pub use coordinator::Ingestor;
pub use error::{IngestError, RunError, RunResult, SourceFailure};
pub use mapping::map_items;
pub use ports::{ArticleStore, SourceRegistry};
