use futures::future::join_all;
use std::sync::Arc;

use super::error::{IngestError, RunResult, SourceFailure};
use super::mapping::map_items;
use super::ports::{ArticleStore, SourceRegistry};
use crate::feed::FeedFetcher;
use crate::storage::Source;

/// Counts reported by one successful source task
#[derive(Debug, Default, Clone, Copy)]
struct SourceOutcome {
    submitted: usize,
    inserted: usize,
}

/// Fans one ingestion run out over every registered source.
///
/// Cheap to clone; all collaborators are shared.
#[derive(Clone)]
pub struct Ingestor {
    registry: Arc<dyn SourceRegistry>,
    store: Arc<dyn ArticleStore>,
    fetcher: Arc<dyn FeedFetcher>,
}

impl Ingestor {
    pub fn new(
        registry: Arc<dyn SourceRegistry>,
        store: Arc<dyn ArticleStore>,
        fetcher: Arc<dyn FeedFetcher>,
    ) -> Self {
        Self {
            registry,
            store,
            fetcher,
        }
    }

    /// Ingest every source once.
    ///
    /// Each source runs in its own task: it fetches, maps and writes its
    /// batch independently, and its failure is recorded without touching the
    /// other tasks. Returns after the slowest source finishes.
    ///
    /// # Errors
    ///
    /// Only [`IngestError::Registry`], when the source list cannot be loaded.
    /// Per-source failures are reported in [`RunResult::failures`].
    pub async fn run_once(&self) -> Result<RunResult, IngestError> {
        let sources = self
            .registry
            .list_sources()
            .await
            .map_err(|e| IngestError::Registry(e.to_string()))?;

        if sources.is_empty() {
            tracing::info!(reason = "no sources registered", "Nothing to ingest");
            return Ok(RunResult::default());
        }

        let attempted = sources.len();
        tracing::info!(sources = attempted, "Ingestion run started");

        // Worker per source; each task's result is its own failure slot
        let tasks = sources.into_iter().map(|source| {
            let link = source.link.clone();
            let store = Arc::clone(&self.store);
            let fetcher = Arc::clone(&self.fetcher);
            let handle = tokio::spawn(async move {
                ingest_source(&source, fetcher.as_ref(), store.as_ref()).await
            });
            async move { (link, handle.await) }
        });
        let outcomes = join_all(tasks).await;

        let mut result = RunResult {
            sources_attempted: attempted,
            ..Default::default()
        };

        for (link, joined) in outcomes {
            let outcome = joined.unwrap_or_else(|join_err| {
                tracing::error!(source = %link, error = %join_err, "Source task panicked");
                Err(IngestError::Fetch(format!("task aborted: {join_err}")))
            });

            match outcome {
                Ok(counts) => {
                    result.articles_submitted += counts.submitted;
                    result.articles_inserted += counts.inserted;
                }
                Err(error) => {
                    tracing::warn!(source = %link, error = %error, "Source ingestion failed");
                    result.failures.push(SourceFailure {
                        source_link: link,
                        error,
                    });
                }
            }
        }

        tracing::info!(
            sources = result.sources_attempted,
            failed = result.failures.len(),
            submitted = result.articles_submitted,
            inserted = result.articles_inserted,
            "Ingestion run finished"
        );

        Ok(result)
    }
}

async fn ingest_source(
    source: &Source,
    fetcher: &dyn FeedFetcher,
    store: &dyn ArticleStore,
) -> Result<SourceOutcome, IngestError> {
    let items = fetcher.fetch(&source.link).await?;
    let articles = map_items(source.id, items);

    if articles.is_empty() {
        tracing::debug!(source = %source.link, "Feed has no entries");
        return Ok(SourceOutcome::default());
    }

    let inserted = store
        .upsert_batch(source.id, &articles)
        .await
        .map_err(|e| IngestError::Persistence(e.to_string()))?;

    tracing::debug!(
        source = %source.link,
        provider = %source.provider,
        submitted = articles.len(),
        inserted = inserted,
        "Source ingested"
    );

    Ok(SourceOutcome {
        submitted: articles.len(),
        inserted,
    })
}
