//! News record and result set types.

use serde::{Deserialize, Serialize};

/// A single extracted news item.
///
/// `title` and `url` are never empty in a record produced by the crawler;
/// the other fields degrade to empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsRecord {
    /// Headline text.
    pub title: String,
    /// Absolute article URL.
    pub url: String,
    /// Abstract, at most a few hundred characters.
    #[serde(default)]
    pub summary: String,
    /// Absolute cover image URL.
    #[serde(default)]
    pub cover: String,
    /// Publisher name.
    #[serde(default)]
    pub source: String,
}

impl NewsRecord {
    /// Creates a record with empty optional fields.
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            summary: String::new(),
            cover: String::new(),
            source: String::new(),
        }
    }

    /// Sets the summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    /// Sets the cover image URL.
    pub fn with_cover(mut self, cover: impl Into<String>) -> Self {
        self.cover = cover.into();
        self
    }

    /// Sets the source.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}

/// Ordered, title-unique records from one search.
///
/// Serializes as `{"records": [...], "count": n, "duration_ms": t}`, with
/// `count` always equal to the number of records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSet {
    records: Vec<NewsRecord>,
    count: usize,
    duration_ms: u64,
}

impl ResultSet {
    /// Creates an empty result set.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_records(records: Vec<NewsRecord>) -> Self {
        Self {
            count: records.len(),
            records,
            duration_ms: 0,
        }
    }

    /// Returns the records in discovery order.
    pub fn items(&self) -> &[NewsRecord] {
        &self.records
    }

    /// Consumes the set, returning its records.
    pub fn into_records(self) -> Vec<NewsRecord> {
        self.records
    }

    /// Number of records, as serialized.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Search duration in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if nothing was found.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sets the search duration.
    pub fn set_duration(&mut self, duration_ms: u64) {
        self.duration_ms = duration_ms;
    }
}
