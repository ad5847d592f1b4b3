//! Search endpoints and request identities.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::Result;

/// Headers sent with every request regardless of endpoint.
pub const COMMON_HEADERS: &[(&str, &str)] = &[
    (
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
    ),
    ("Accept-Language", "zh-CN,zh;q=0.9"),
    ("Connection", "keep-alive"),
    ("Upgrade-Insecure-Requests", "1"),
];

const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/116.0.5845.97 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/115.0.5790.170 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Edge/116.0.1938.69 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/117.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/116.0.5845.97 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.6 Safari/605.1.15",
];

/// One alternative search target.
///
/// Different endpoints name the query term differently (`word` vs `wd`),
/// and each expects its own `Host` and `Referer`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Base URL, without the query string.
    pub base_url: String,
    /// Name of the query parameter carrying the keyword.
    pub query_param: String,
    /// Value of the `Host` header.
    pub host: String,
    /// Value of the `Referer` header.
    pub referer: String,
}

impl Endpoint {
    /// Creates an endpoint.
    pub fn new(
        base_url: impl Into<String>,
        query_param: impl Into<String>,
        host: impl Into<String>,
        referer: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            query_param: query_param.into(),
            host: host.into(),
            referer: referer.into(),
        }
    }

    /// The fixed pool of news search endpoints.
    pub fn default_pool() -> Vec<Endpoint> {
        vec![
            Endpoint::new(
                "https://news.baidu.com/ns",
                "word",
                "news.baidu.com",
                "https://news.baidu.com/",
            ),
            Endpoint::new(
                "https://www.baidu.com/s",
                "wd",
                "www.baidu.com",
                "https://www.baidu.com/",
            ),
            Endpoint::new(
                "https://www.baidu.com/news",
                "wd",
                "www.baidu.com",
                "https://www.baidu.com/",
            ),
        ]
    }

    /// Builds the full request URL for a keyword.
    pub fn build_url(&self, keyword: &str, max_results: usize) -> String {
        let separator = if self.base_url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}{}={}&pn=0&rn={}&tn=news",
            self.base_url,
            separator,
            self.query_param,
            urlencoding::encode(keyword),
            max_results
        )
    }

    /// Origin used to resolve relative links found in this endpoint's pages.
    pub fn origin(&self) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)?;
        url.set_path("/");
        url.set_query(None);
        url.set_fragment(None);
        Ok(url)
    }
}

/// Browser identity presented on a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Value of the `User-Agent` header.
    pub user_agent: String,
}

impl Identity {
    /// Creates an identity.
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }
}

/// The default user-agent rotation pool.
pub fn default_user_agents() -> Vec<String> {
    DEFAULT_USER_AGENTS.iter().map(|ua| ua.to_string()).collect()
}
