//! Periodic RSS/Atom/JSON Feed ingestion.
//!
//! A [`scheduler::Scheduler`] drives [`ingest::Ingestor::run_once`] on a fixed
//! interval. Each run fetches every registered source concurrently, maps the
//! feed items to articles, and writes them to a store that deduplicates by
//! article URL.

pub mod config;
pub mod feed;
pub mod ingest;
pub mod scheduler;
pub mod storage;
pub mod util;
