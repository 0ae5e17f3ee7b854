//! Web search for documents published on a target domain.

mod duckduckgo;
mod query;
mod user_agent;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{FileType, SearchResult};

pub use duckduckgo::{parse_results, DuckDuckGoSearch, DDG_SEARCH_URL};
pub use query::QueryBuilder;
pub use user_agent::{pick_identity, search_headers, ACCEPT_LANGUAGES, USER_AGENTS};

/// Errors raised by a search once its retries are exhausted.
///
/// Every variant carries the query that failed.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Rate limited (status {status}) for query '{query}'")]
    RateLimited { status: u16, query: String },

    #[error("Search failed with status {status} for query '{query}'")]
    Status { status: u16, query: String },

    #[error("Network error for query '{query}': {message}")]
    Network { message: String, query: String },

    #[error("Failed to parse results for query '{query}': {message}")]
    Parse { message: String, query: String },

    #[error("Could not create HTTP client for query '{query}': {message}")]
    Client { message: String, query: String },
}

impl SearchError {
    pub fn query(&self) -> &str {
        match self {
            Self::RateLimited { query, .. }
            | Self::Status { query, .. }
            | Self::Network { query, .. }
            | Self::Parse { query, .. }
            | Self::Client { query, .. } => query,
        }
    }
}

/// Search behaviour for one run.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Target domain; results outside it are dropped.
    pub domain: String,
    /// Search endpoint receiving the form POST.
    pub endpoint: String,
    /// Base delay for backoff and courtesy pauses.
    pub base_delay: Duration,
    pub max_retries: u32,
    pub rotate_user_agent: bool,
    pub timeout: Duration,
    pub proxy: Option<String>,
    /// Seed for jitter and header rotation; random when unset.
    pub seed: Option<u64>,
}

impl SearchConfig {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            endpoint: DDG_SEARCH_URL.to_string(),
            base_delay: Duration::from_secs(2),
            max_retries: 3,
            rotate_user_agent: true,
            timeout: Duration::from_secs(30),
            proxy: None,
            seed: None,
        }
    }
}

/// Why a search is pausing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseReason {
    /// Waiting before a retry.
    Backoff,
    /// Spacing between distinct searches.
    Courtesy,
}

/// Performs the sleeps a search requests.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, duration: Duration, reason: PauseReason);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, duration: Duration, _reason: PauseReason) {
        tokio::time::sleep(duration).await;
    }
}

/// A search provider that finds files of one type on the configured domain.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &str;

    /// Search for files of `file_type`, returning at most `limit` results.
    async fn search_files(
        &self,
        file_type: FileType,
        limit: usize,
    ) -> Result<Vec<SearchResult>, SearchError>;

    /// Release the connection pool. Safe to call more than once.
    fn close(&self);
}
