use sqlx::QueryBuilder;

use super::schema::Database;
use super::types::{Article, ArticleListing, DatabaseError, NewArticle};

// ============================================================================
// Query Limit Constants
// ============================================================================

/// Rows per INSERT statement. 6 columns * 100 = 600 binds, under SQLite's 999 limit.
const INSERT_BATCH_SIZE: usize = 100;

/// Largest page the listing query will return
pub const MAX_PAGE_SIZE: i64 = 10;

impl Database {
    // ========================================================================
    // Article Operations
    // ========================================================================

    /// Insert a source's articles, skipping any whose URL is already stored.
    ///
    /// The whole batch runs in one transaction: either every new row is
    /// written or none is. Duplicate URLs (already persisted, or repeated
    /// within the batch) collapse silently instead of failing the batch.
    ///
    /// Returns the number of newly inserted articles.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::MissingSource` if `source_id` does not exist.
    ///
    /// Safe to call concurrently for different sources; writers queue on the
    /// SQLite lock for up to the connection's busy timeout.
    pub async fn upsert_articles(
        &self,
        source_id: i64,
        articles: &[NewArticle],
    ) -> Result<usize, DatabaseError> {
        if articles.is_empty() {
            return Ok(0);
        }

        let now = chrono::Utc::now().timestamp();
        // Take the write lock up front. A deferred transaction that reads
        // first cannot upgrade while another source's batch holds the lock,
        // and busy_timeout does not retry that upgrade.
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM sources WHERE id = ?")
            .bind(source_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(DatabaseError::MissingSource(source_id));
        }

        let mut inserted = 0;
        for chunk in articles.chunks(INSERT_BATCH_SIZE) {
            // OR IGNORE only swallows the UNIQUE(url) conflict; FK violations
            // are not ignorable and still abort the transaction.
            let mut builder: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(
                "INSERT OR IGNORE INTO articles (source_id, title, url, image, published_date, created_at) ",
            );
            builder.push_values(chunk, |mut b, article| {
                b.push_bind(source_id)
                    .push_bind(&article.title)
                    .push_bind(&article.url)
                    .push_bind(&article.image)
                    .push_bind(&article.published_date)
                    .push_bind(now);
            });
            inserted += builder.build().execute(&mut *tx).await?.rows_affected() as usize;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    // ========================================================================
    // Article Queries
    // ========================================================================

    pub async fn get_articles_for_source(
        &self,
        source_id: i64,
    ) -> Result<Vec<Article>, DatabaseError> {
        let articles = sqlx::query_as::<_, Article>(
            r#"
            SELECT id, source_id, title, url, image, published_date
            FROM articles
            WHERE source_id = ?
            ORDER BY id
        "#,
        )
        .bind(source_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(articles)
    }

    /// Total number of stored articles
    pub async fn count_articles(&self) -> Result<i64, DatabaseError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM articles")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// One page of articles, newest first, with their source's category.
    ///
    /// `page` is 1-based. `page_size` is clamped to `1..=MAX_PAGE_SIZE`.
    pub async fn list_articles(
        &self,
        page: i64,
        page_size: i64,
    ) -> Result<Vec<ArticleListing>, DatabaseError> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);

        let rows = sqlx::query_as::<_, ArticleListing>(
            r#"
            SELECT a.id, a.title, a.url, a.image, a.published_date, s.category
            FROM articles a
            JOIN sources s ON s.id = a.source_id
            ORDER BY a.created_at DESC, a.id DESC
            LIMIT ? OFFSET ?
        "#,
        )
        .bind(page_size)
        .bind((page - 1) * page_size)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
