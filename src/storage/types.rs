use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another process holds the database lock
    #[error("Database is locked by another process. Please close it and try again.")]
    InstanceLocked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// An article referenced a source id that does not exist
    #[error("Source {0} does not exist")]
    MissingSource(i64),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if is_lock_message(&err.to_string()) {
            return DatabaseError::InstanceLocked;
        }
        DatabaseError::Other(err)
    }
}

/// SQLITE_BUSY (5), SQLITE_LOCKED (6) and SQLITE_CANTOPEN (14) all surface as
/// one of these messages.
pub(crate) fn is_lock_message(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("database is locked")
        || message.contains("database table is locked")
        || message.contains("sqlite_busy")
        || message.contains("sqlite_locked")
        || message.contains("unable to open database file")
}

// ============================================================================
// Data Structures
// ============================================================================

/// A feed endpoint registered for ingestion.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Source {
    pub id: i64,
    /// Feed endpoint URL (unique)
    pub link: String,
    pub provider: String,
    pub category: String,
}

/// Source definition used when registering or seeding (no id yet)
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct NewSource {
    pub link: String,
    pub provider: String,
    pub category: String,
}

/// An article mapped from a feed item, ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewArticle {
    pub source_id: i64,
    pub title: String,
    pub url: String,
    pub image: Option<String>,
    pub published_date: String,
}

/// Persisted article
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Article {
    pub id: i64,
    pub source_id: i64,
    pub title: String,
    pub url: String,
    pub image: Option<String>,
    pub published_date: String,
}

/// Article joined with its source's category, for listings
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ArticleListing {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub image: Option<String>,
    pub published_date: String,
    pub category: String,
}
