//! Feed retrieval and decoding.
//!
//! - [`parser`] - decodes RSS, Atom and JSON Feed documents with `feed-rs`
//! - [`fetcher`] - HTTP retrieval with a timeout and body size limit
//!
//! Neither submodule touches storage: mapping items to articles and
//! persisting them is the job of [`crate::ingest`].

mod fetcher;
mod parser;

pub use fetcher::{FeedFetcher, FetchError, HttpFetcher, DEFAULT_MAX_FEED_SIZE, DEFAULT_TIMEOUT};
pub use parser::{parse_feed, ParseResult, RawFeedItem};
