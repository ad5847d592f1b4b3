//! Deduplication and assembly of extracted records.

use std::collections::HashSet;

use tracing::debug;

use crate::{NewsRecord, ResultSet};

/// Collects records in discovery order, dropping repeated titles, until full.
#[derive(Debug)]
pub struct Assembler {
    max_results: usize,
    seen_titles: HashSet<String>,
    records: Vec<NewsRecord>,
}

impl Assembler {
    /// Creates an assembler that accepts at most `max_results` records.
    pub fn new(max_results: usize) -> Self {
        Self {
            max_results,
            seen_titles: HashSet::new(),
            records: Vec::new(),
        }
    }

    /// Offers a record. Returns true if it was kept.
    ///
    /// Titles are compared exactly and case-sensitively; the first record
    /// with a given title wins.
    pub fn push(&mut self, record: NewsRecord) -> bool {
        if self.is_full() {
            return false;
        }
        if !self.seen_titles.insert(record.title.clone()) {
            debug!("Dropping duplicate title '{}'", record.title);
            return false;
        }
        self.records.push(record);
        true
    }

    /// Returns true once `max_results` records are held.
    pub fn is_full(&self) -> bool {
        self.records.len() >= self.max_results
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if nothing has been kept yet.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Finishes assembly.
    pub fn finish(self) -> ResultSet {
        ResultSet::from_records(self.records)
    }
}

/// Assembles records in order, stopping at `max_results`.
pub fn assemble(records: impl IntoIterator<Item = NewsRecord>, max_results: usize) -> ResultSet {
    let mut assembler = Assembler::new(max_results);
    let mut records = records.into_iter();
    // checked before pulling so a lazy source does no work past the cap
    while !assembler.is_full() {
        match records.next() {
            Some(record) => {
                assembler.push(record);
            }
            None => break,
        }
    }
    assembler.finish()
}
