//! Search request representation.

use serde::{Deserialize, Serialize};

use crate::{CrawlError, Result};

/// Largest result count a caller may ask for.
pub const MAX_RESULTS_CAP: usize = 50;

/// A validated search request.
///
/// `max_results` is clamped to [`MAX_RESULTS_CAP`]; the keyword is trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    keyword: String,
    max_results: usize,
}

impl SearchRequest {
    /// Creates a request, rejecting an empty keyword or a zero count.
    pub fn new(keyword: impl Into<String>, max_results: usize) -> Result<Self> {
        let keyword = keyword.into().trim().to_string();
        if keyword.is_empty() {
            return Err(CrawlError::InvalidQuery("keyword cannot be empty".into()));
        }
        if max_results == 0 {
            return Err(CrawlError::InvalidQuery(
                "max_results must be positive".into(),
            ));
        }
        Ok(Self {
            keyword,
            max_results: max_results.min(MAX_RESULTS_CAP),
        })
    }

    /// The search keyword.
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Upper bound on returned records.
    pub fn max_results(&self) -> usize {
        self.max_results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_new() {
        let request = SearchRequest::new("西昌", 5).unwrap();
        assert_eq!(request.keyword(), "西昌");
        assert_eq!(request.max_results(), 5);
    }

    #[test]
    fn test_request_trims_keyword() {
        let request = SearchRequest::new("  rust  ", 1).unwrap();
        assert_eq!(request.keyword(), "rust");
    }

    #[test]
    fn test_request_clamps_max_results() {
        let request = SearchRequest::new("rust", 500).unwrap();
        assert_eq!(request.max_results(), MAX_RESULTS_CAP);
    }

    #[test]
    fn test_request_rejects_empty_keyword() {
        let err = SearchRequest::new("   ", 10).unwrap_err();
        assert!(matches!(err, CrawlError::InvalidQuery(_)));
    }

    #[test]
    fn test_request_rejects_zero() {
        let err = SearchRequest::new("rust", 0).unwrap_err();
        assert!(err.to_string().contains("positive"));
    }
}
