//! # news-crawler
//!
//! A news search crawler for Baidu result pages.
//!
//! Given a keyword, the crawler fetches one result page from a pool of
//! alternative search endpoints and extracts structured news records:
//!
//! - Paced, identity-rotating requests with retry and endpoint fallback
//! - Charset detection for pages served without a trustworthy declaration
//! - Heading-anchored extraction with a flat-link fallback for unusual layouts
//! - Per-field degradation: a bad summary or cover never loses the record
//! - Title-unique, order-preserving results capped at 50
//!
//! ## Example
//!
//! ```rust,no_run
//! use news_crawler::{CrawlerConfig, NewsCrawler};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let crawler = NewsCrawler::new(CrawlerConfig::default())?;
//!     let results = crawler.search("西昌", 10).await;
//!
//!     for record in results.items() {
//!         println!("{} [{}]: {}", record.title, record.source, record.url);
//!     }
//!     Ok(())
//! }
//! ```

mod assembler;
mod crawler;
mod error;
mod query;
mod result;

pub mod config;
pub mod dispatcher;
pub mod document;
pub mod endpoint;
pub mod extractor;
pub mod locator;
pub mod patterns;
pub mod rotation;
pub mod transport;

pub use assembler::{assemble, Assembler};
pub use config::CrawlerConfig;
pub use crawler::{crawl_news, NewsCrawler};
pub use error::{CrawlError, Result};
pub use query::{SearchRequest, MAX_RESULTS_CAP};
pub use result::{NewsRecord, ResultSet};
