//! SQLite persistence for sources and articles.
//!
//! [`Database`] is both the Source Registry and the Article Store consumed by
//! the ingestion pipeline (see [`crate::ingest`]).

mod articles;
mod ports;
mod schema;
mod sources;
mod types;

pub use articles::MAX_PAGE_SIZE;
pub use schema::Database;
pub use types::{Article, ArticleListing, DatabaseError, NewArticle, NewSource, Source};
