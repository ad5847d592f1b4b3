//! Error types for the crawler.

use thiserror::Error;

/// Result type alias for crawler operations.
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Errors that can occur while crawling.
///
/// None of these ever reach a caller of [`NewsCrawler::search`](crate::NewsCrawler::search);
/// they are logged and turned into an empty result there.
#[derive(Error, Debug)]
pub enum CrawlError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status.
    #[error("Endpoint '{endpoint}' returned status {status}")]
    Status {
        /// Base URL of the endpoint.
        endpoint: String,
        /// HTTP status code.
        status: u16,
    },

    /// Failed to parse a document or selector.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// A single attempt exceeded its timeout.
    #[error("Request timeout exceeded")]
    Timeout,

    /// The endpoint pool is empty.
    #[error("No endpoints configured")]
    NoEndpoints,

    /// Every endpoint in the pool failed.
    #[error("All {0} endpoints failed")]
    Exhausted(usize),

    /// Invalid query.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// URL parsing error.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl CrawlError {
    /// Returns true when the same endpoint is worth another try.
    pub fn is_retryable(&self, retry_statuses: &[u16]) -> bool {
        match self {
            CrawlError::Http(_) | CrawlError::Timeout => true,
            CrawlError::Status { status, .. } => retry_statuses.contains(status),
            _ => false,
        }
    }
}
