//! Collaborators the ingestion pipeline depends on.

use async_trait::async_trait;

use crate::storage::{DatabaseError, NewArticle, Source};

/// Read side of the source list.
#[async_trait]
pub trait SourceRegistry: Send + Sync {
    /// Sources active at call time, in no particular order.
    async fn list_sources(&self) -> Result<Vec<Source>, DatabaseError>;
}

/// Write side of the article list.
///
/// `upsert_batch` must be idempotent per article URL (an existing URL is a
/// silent no-op, not an error) and all-or-nothing per call. Returns the
/// number of articles that were new.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn upsert_batch(
        &self,
        source_id: i64,
        articles: &[NewArticle],
    ) -> Result<usize, DatabaseError>;
}
