//! Fetcher trait definition
//!
//! The data pull job only depends on this seam, so tests can swap in a
//! scripted fetcher without an HTTP server.

use async_trait::async_trait;
use thiserror::Error;

use super::graphql::RawProject;
use crate::config::ProjectSource;

/// Failure to fetch one project. Partial pages are never returned.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("upstream returned status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("rate limited by upstream (retry after {retry_after:?}s)")]
    RateLimited { retry_after: Option<u64> },

    #[error("credentials rejected by upstream")]
    Unauthorized,

    #[error("GraphQL error: {0}")]
    GraphQl(String),

    #[error("project {0} not found")]
    ProjectNotFound(String),

    #[error("malformed upstream response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl FetchError {
    /// Short label used as a metrics dimension.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Network(_) => "network",
            FetchError::Http { .. } => "http",
            FetchError::RateLimited { .. } => "rate_limited",
            FetchError::Unauthorized => "unauthorized",
            FetchError::GraphQl(_) => "graphql",
            FetchError::ProjectNotFound(_) => "not_found",
            FetchError::Decode(_) => "decode",
        }
    }
}

/// Retrieves every page of one project source.
#[async_trait]
pub trait ProjectFetcher: Send + Sync {
    async fn fetch_project(&self, source: &ProjectSource) -> Result<RawProject, FetchError>;
}
