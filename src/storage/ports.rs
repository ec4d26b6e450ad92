use async_trait::async_trait;

use super::schema::Database;
use super::types::{DatabaseError, NewArticle, Source};
use crate::ingest::{ArticleStore, SourceRegistry};

#[async_trait]
impl SourceRegistry for Database {
    async fn list_sources(&self) -> Result<Vec<Source>, DatabaseError> {
        Database::list_sources(self).await
    }
}

#[async_trait]
impl ArticleStore for Database {
    async fn upsert_batch(
        &self,
        source_id: i64,
        articles: &[NewArticle],
    ) -> Result<usize, DatabaseError> {
        self.upsert_articles(source_id, articles).await
    }
}
