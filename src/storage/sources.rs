use sqlx::QueryBuilder;

use super::schema::Database;
use super::types::{DatabaseError, NewSource, Source};

impl Database {
    // ========================================================================
    // Source Operations
    // ========================================================================

    /// Register a source, or update provider/category if the link already exists.
    ///
    /// Returns the id of the (possibly pre-existing) source row.
    pub async fn insert_source(&self, source: &NewSource) -> Result<i64, DatabaseError> {
        let now = chrono::Utc::now().timestamp();
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO sources (link, provider, category, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(link) DO UPDATE SET
                provider = excluded.provider,
                category = excluded.category
            RETURNING id
        "#,
        )
        .bind(&source.link)
        .bind(&source.provider)
        .bind(&source.category)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    /// Seed sources by link: existing rows are left untouched.
    ///
    /// Returns the number of sources that were newly created.
    pub async fn seed_sources(&self, sources: &[NewSource]) -> Result<usize, DatabaseError> {
        if sources.is_empty() {
            return Ok(0);
        }

        const BATCH_SIZE: usize = 100;
        let now = chrono::Utc::now().timestamp();
        let mut created = 0;
        let mut tx = self.pool.begin().await?;

        for chunk in sources.chunks(BATCH_SIZE) {
            let mut builder: QueryBuilder<sqlx::Sqlite> =
                QueryBuilder::new("INSERT OR IGNORE INTO sources (link, provider, category, created_at) ");
            builder.push_values(chunk, |mut b, source| {
                b.push_bind(&source.link)
                    .push_bind(&source.provider)
                    .push_bind(&source.category)
                    .push_bind(now);
            });
            created += builder.build().execute(&mut *tx).await?.rows_affected() as usize;
        }

        tx.commit().await?;
        Ok(created)
    }

    /// All sources, ordered by id
    pub async fn list_sources(&self) -> Result<Vec<Source>, DatabaseError> {
        let sources = sqlx::query_as::<_, Source>(
            "SELECT id, link, provider, category FROM sources ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(sources)
    }

    pub async fn get_source(&self, source_id: i64) -> Result<Option<Source>, DatabaseError> {
        let source = sqlx::query_as::<_, Source>(
            "SELECT id, link, provider, category FROM sources WHERE id = ?",
        )
        .bind(source_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(source)
    }

    /// Delete a source and (via cascade) its articles.
    ///
    /// Returns false if no source had this id.
    pub async fn delete_source(&self, source_id: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM sources WHERE id = ?")
            .bind(source_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
