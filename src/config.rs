//! Crawler configuration.
//!
//! Every field has a serde default, so a partial JSON file only needs to
//! name what it overrides.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::endpoint::{default_user_agents, Endpoint};
use crate::{CrawlError, Result};

/// Inclusive range of milliseconds to wait before a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    /// Lower bound in milliseconds.
    pub min_ms: u64,
    /// Upper bound in milliseconds.
    pub max_ms: u64,
}

impl DelayRange {
    /// Creates a delay range.
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// A range that never waits.
    pub const fn none() -> Self {
        Self::new(0, 0)
    }

    /// Shortest delay in the range.
    pub fn min(&self) -> Duration {
        Duration::from_millis(self.min_ms)
    }
}

/// Retry behaviour for a single endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Backoff factor in milliseconds; the n-th retry waits `backoff_ms * 2^(n-1)`.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    /// Statuses that are retried on the same endpoint.
    #[serde(default = "default_retry_statuses")]
    pub statuses: Vec<u16>,
}

impl RetryPolicy {
    /// Backoff before the given retry (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u64 << retry.saturating_sub(1).min(16);
        Duration::from_millis(self.backoff_ms.saturating_mul(factor))
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff_ms: 0,
            statuses: Vec::new(),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_ms: default_backoff_ms(),
            statuses: default_retry_statuses(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    1000
}

fn default_retry_statuses() -> Vec<u16> {
    vec![429, 500, 502, 503, 504]
}

/// Thresholds and markers used by the locator and field extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionPolicy {
    /// Minimum visible anchor text, in characters, for a candidate to survive.
    pub min_anchor_chars: usize,
    /// Minimum title length, in characters, for a record to be emitted.
    pub min_title_chars: usize,
    /// Summaries are truncated to this many characters.
    pub summary_max_chars: usize,
    /// A class-matched summary element must yield more than this.
    pub summary_element_min_chars: usize,
    /// A summary recovered from the container text must yield more than this.
    pub summary_fallback_min_chars: usize,
    /// Sources must be shorter than this.
    pub source_max_chars: usize,
    /// Tokens taken from a "<token> <date>" match must be shorter than this.
    pub source_token_max_chars: usize,
    /// Heading element that anchors a result entry.
    pub heading_tag: String,
    /// Container element enclosing one result entry.
    pub container_tag: String,
    /// Substrings identifying a redirector link.
    pub redirect_markers: Vec<String>,
    /// Query parameter of a redirector link carrying the destination.
    pub redirect_param: String,
    /// Hosts of the search engine's own assets.
    pub asset_hosts: Vec<String>,
    /// Markers of icon/logo/static paths on those hosts.
    pub asset_markers: Vec<String>,
}

impl Default for ExtractionPolicy {
    fn default() -> Self {
        Self {
            min_anchor_chars: 5,
            min_title_chars: 5,
            summary_max_chars: 300,
            summary_element_min_chars: 10,
            summary_fallback_min_chars: 20,
            source_max_chars: 50,
            source_token_max_chars: 30,
            heading_tag: "h3".to_string(),
            container_tag: "div".to_string(),
            redirect_markers: vec!["baidu.com/link".to_string(), "/link?url=".to_string()],
            redirect_param: "url".to_string(),
            asset_hosts: vec!["baidu.com".to_string(), "bdstatic.com".to_string()],
            asset_markers: vec!["icon".to_string(), "logo".to_string(), "static".to_string()],
        }
    }
}

/// Anchor texts that are site navigation, never news titles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Denylist {
    /// Labels rejected on exact match.
    pub exact: Vec<String>,
    /// Fragments rejected anywhere in the text.
    pub contains: Vec<String>,
}

impl Denylist {
    /// Returns true if the anchor text is navigation.
    pub fn rejects(&self, text: &str) -> bool {
        self.exact.iter().any(|label| label == text)
            || self.contains.iter().any(|fragment| text.contains(fragment.as_str()))
    }
}

impl Default for Denylist {
    fn default() -> Self {
        let exact = [
            "百度", "新闻", "网页", "贴吧", "知道", "图片", "视频", "地图", "文库", "更多", "设置",
            "登录",
        ];
        let contains = ["百度一下", "搜索", "登录"];
        Self {
            exact: exact.iter().map(|s| s.to_string()).collect(),
            contains: contains.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Configuration for a [`NewsCrawler`](crate::NewsCrawler).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Per-attempt timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Pacing before the first request.
    #[serde(default = "default_initial_delay")]
    pub initial_delay: DelayRange,
    /// Pacing before each fallback endpoint.
    #[serde(default = "default_fallback_delay")]
    pub fallback_delay: DelayRange,
    /// Retry behaviour per endpoint.
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Alternative search targets.
    #[serde(default = "Endpoint::default_pool")]
    pub endpoints: Vec<Endpoint>,
    /// User-agent rotation pool.
    #[serde(default = "default_user_agents")]
    pub user_agents: Vec<String>,
    /// Extraction thresholds.
    #[serde(default)]
    pub extraction: ExtractionPolicy,
    /// Navigation labels.
    #[serde(default)]
    pub denylist: Denylist,
}

fn default_timeout() -> u64 {
    30
}

fn default_initial_delay() -> DelayRange {
    DelayRange::new(1000, 3000)
}

fn default_fallback_delay() -> DelayRange {
    DelayRange::new(500, 1000)
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            initial_delay: default_initial_delay(),
            fallback_delay: default_fallback_delay(),
            retry: RetryPolicy::default(),
            endpoints: Endpoint::default_pool(),
            user_agents: default_user_agents(),
            extraction: ExtractionPolicy::default(),
            denylist: Denylist::default(),
        }
    }
}

impl CrawlerConfig {
    /// Parses a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: CrawlerConfig =
            serde_json::from_str(json).map_err(|e| CrawlError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| CrawlError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// Checks the pools are non-empty, the timeout is positive and the delay
    /// ranges are ordered.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(CrawlError::Config("timeout_secs must be positive".into()));
        }
        if self.endpoints.is_empty() {
            return Err(CrawlError::NoEndpoints);
        }
        if self.user_agents.is_empty() {
            return Err(CrawlError::Config("user agent pool is empty".into()));
        }
        for (name, range) in [
            ("initial_delay", self.initial_delay),
            ("fallback_delay", self.fallback_delay),
        ] {
            if range.min_ms > range.max_ms {
                return Err(CrawlError::Config(format!(
                    "{} min {}ms exceeds max {}ms",
                    name, range.min_ms, range.max_ms
                )));
            }
        }
        Ok(())
    }

    /// Per-attempt timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Disables pacing and retry backoff.
    pub fn without_delays(mut self) -> Self {
        self.initial_delay = DelayRange::none();
        self.fallback_delay = DelayRange::none();
        self.retry.backoff_ms = 0;
        self
    }
}
