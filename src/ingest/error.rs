use std::fmt;
use thiserror::Error;

use crate::feed::FetchError;

/// Why one source (or a whole run) failed to ingest.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    /// The source could not be reached or returned an unusable response
    #[error("fetch failed: {0}")]
    Fetch(String),
    /// The document was retrieved but is not RSS, Atom or JSON Feed
    #[error("parse failed: {0}")]
    Parse(String),
    /// The article store rejected the batch
    #[error("persistence failed: {0}")]
    Persistence(String),
    /// The source registry could not be read, so the run never started
    #[error("listing sources failed: {0}")]
    Registry(String),
    /// Nothing is configured to ingest
    #[error("configuration: {0}")]
    Configuration(String),
}

impl From<FetchError> for IngestError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Parse(msg) => IngestError::Parse(msg),
            other => IngestError::Fetch(other.to_string()),
        }
    }
}

/// One source's failure within a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFailure {
    pub source_link: String,
    pub error: IngestError,
}

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error scraping source {}: {}", self.source_link, self.error)
    }
}

/// Outcome of one ingestion run across all sources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResult {
    pub sources_attempted: usize,
    /// Articles mapped from successful fetches and handed to the store
    pub articles_submitted: usize,
    /// Articles the store reported as new
    pub articles_inserted: usize,
    pub failures: Vec<SourceFailure>,
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Every attempted source failed. A run with no sources never counts.
    pub fn all_failed(&self) -> bool {
        self.sources_attempted > 0 && self.failures.len() >= self.sources_attempted
    }

    /// Collapse the failure list into one error, or `None` if every source succeeded.
    pub fn aggregate_error(&self) -> Option<RunError> {
        if self.failures.is_empty() {
            return None;
        }
        Some(RunError {
            attempted: self.sources_attempted,
            failures: self.failures.clone(),
        })
    }
}

/// Run-level error listing every failed source
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct RunError {
    pub attempted: usize,
    pub failures: Vec<SourceFailure>,
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} sources failed:",
            self.failures.len(),
            self.attempted
        )?;
        for failure in &self.failures {
            write!(f, "\n{failure}")?;
        }
        Ok(())
    }
}
