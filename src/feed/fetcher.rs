use crate::feed::parser::{parse_feed, ParseResult, RawFeedItem};
use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

/// Default per-source timeout covering connect, headers and body.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default cap on a feed document's size.
pub const DEFAULT_MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while retrieving and decoding one feed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    /// Document could not be parsed as RSS, Atom or JSON Feed
    #[error("Parse error: {0}")]
    Parse(String),
    /// Response body exceeded the size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

/// Retrieves one source's feed document and decodes it into raw items.
///
/// Implementations hold no per-source state and never touch storage.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, link: &str) -> Result<Vec<RawFeedItem>, FetchError>;
}

/// [`FeedFetcher`] over HTTP(S) using reqwest.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_feed_size: usize,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            timeout: DEFAULT_TIMEOUT,
            max_feed_size: DEFAULT_MAX_FEED_SIZE,
        }
    }

    /// Build a client sending `user_agent` on every request.
    pub fn with_user_agent(user_agent: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self::new(client))
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_feed_size(mut self, bytes: usize) -> Self {
        self.max_feed_size = bytes;
        self
    }

    async fn download(&self, link: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(link).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        read_limited_bytes(response, self.max_feed_size).await
    }
}

#[async_trait]
impl FeedFetcher for HttpFetcher {
    async fn fetch(&self, link: &str) -> Result<Vec<RawFeedItem>, FetchError> {
        // A hanging source must not stall the whole run, so the timeout spans the body too
        let bytes = tokio::time::timeout(self.timeout, self.download(link))
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))??;

        let ParseResult { items, skipped } =
            parse_feed(&bytes).map_err(|e| FetchError::Parse(e.to_string()))?;

        if skipped > 0 {
            tracing::warn!(
                source = %link,
                skipped = skipped,
                "Feed entries without a link skipped"
            );
        }
        tracing::debug!(source = %link, items = items.len(), bytes = bytes.len(), "Feed fetched");

        Ok(items)
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    // Fast path: check Content-Length header
    if let Some(len) = expected_length {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
