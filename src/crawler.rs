//! Search orchestration.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};
use url::Url;

use crate::assembler::assemble;
use crate::config::{CrawlerConfig, ExtractionPolicy};
use crate::dispatcher::Dispatcher;
use crate::document::RawDocument;
use crate::extractor::FieldExtractor;
use crate::locator::{Candidate, CandidateLocator, HeadingAnchored, LocateMode};
use crate::rotation::{RandomRotation, Rotation};
use crate::transport::{HttpTransport, Transport};
use crate::{Result, ResultSet, SearchRequest};

/// News search crawler.
///
/// Never fails from the caller's point of view: any transport, decoding
/// or extraction problem degrades to fewer records, possibly none.
pub struct NewsCrawler {
    dispatcher: Dispatcher,
    locator: CandidateLocator,
    policy: ExtractionPolicy,
}

impl NewsCrawler {
    /// Creates a crawler that talks to the network over HTTP.
    pub fn new(config: CrawlerConfig) -> Result<Self> {
        config.validate()?;
        let transport = Arc::new(HttpTransport::new()?);
        Ok(Self::with_transport(config, transport, Arc::new(RandomRotation)))
    }

    /// Creates a crawler with an explicit transport and rotation.
    pub fn with_transport(
        config: CrawlerConfig,
        transport: Arc<dyn Transport>,
        rotation: Arc<dyn Rotation>,
    ) -> Self {
        let dispatcher = Dispatcher::new(&config, transport, rotation);
        let heading = HeadingAnchored::new(
            config.extraction.heading_tag.clone(),
            config.extraction.container_tag.clone(),
        );
        let locator = CandidateLocator::new(
            heading,
            config.denylist,
            config.extraction.min_anchor_chars,
        );
        Self {
            dispatcher,
            locator,
            policy: config.extraction,
        }
    }

    /// Searches for news about `keyword`.
    ///
    /// Returns at most `max_results` records (never more than 50), unique by
    /// title, in the order they appear on the result page.
    pub async fn search(&self, keyword: &str, max_results: usize) -> ResultSet {
        let start = Instant::now();

        let request = match SearchRequest::new(keyword, max_results) {
            Ok(request) => request,
            Err(e) => {
                warn!("Rejected search for '{}': {}", keyword, e);
                return ResultSet::new();
            }
        };

        let mut results = match self.dispatcher.fetch(&request).await {
            Ok(document) => self.extract(&document, request.max_results()),
            Err(e) => {
                warn!("Search for '{}' returned nothing: {}", request.keyword(), e);
                ResultSet::new()
            }
        };

        results.set_duration(start.elapsed().as_millis() as u64);
        info!(
            "Search for '{}' returned {} records in {}ms",
            request.keyword(),
            results.count(),
            results.duration_ms()
        );
        results
    }

    /// Extracts records from a fetched page, probing for the locate mode.
    pub fn extract(&self, document: &RawDocument, max_results: usize) -> ResultSet {
        let tree = document.parse();
        let candidates = self.locator.locate(&tree);
        self.assemble_candidates(&candidates, document.origin(), max_results)
    }

    /// Extracts records from a fetched page with an explicit locate mode.
    pub fn extract_with(
        &self,
        document: &RawDocument,
        mode: LocateMode,
        max_results: usize,
    ) -> ResultSet {
        let tree = document.parse();
        let candidates = self.locator.locate_with(mode, &tree);
        self.assemble_candidates(&candidates, document.origin(), max_results)
    }

    fn assemble_candidates(
        &self,
        candidates: &[Candidate<'_>],
        origin: &Url,
        max_results: usize,
    ) -> ResultSet {
        let extractor = FieldExtractor::new(self.policy.clone(), origin.clone());
        let records = candidates.iter().filter_map(|candidate| {
            extractor
                .extract(candidate)
                .map_err(|rejection| debug!("Rejected candidate: {}", rejection))
                .ok()
        });
        assemble(records, max_results)
    }
}

/// Searches with the default configuration.
pub async fn crawl_news(keyword: &str, max_results: usize) -> ResultSet {
    match NewsCrawler::new(CrawlerConfig::default()) {
        Ok(crawler) => crawler.search(keyword, max_results).await,
        Err(e) => {
            warn!("Failed to create crawler: {}", e);
            ResultSet::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotation::FixedRotation;
    use crate::transport::{OutboundRequest, RawResponse};
    use crate::CrawlError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticTransport {
        status: u16,
        body: String,
        calls: AtomicUsize,
    }

    impl StaticTransport {
        fn new(status: u16, body: impl Into<String>) -> Arc<Self> {
            Arc::new(Self {
                status,
                body: body.into(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Transport for StaticTransport {
        async fn get(&self, _request: &OutboundRequest) -> Result<RawResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(RawResponse::new(
                self.status,
                Some("utf-8".into()),
                self.body.as_bytes(),
            ))
        }
    }

    struct FailingTransport;

    #[async_trait]
    impl Transport for FailingTransport {
        async fn get(&self, _request: &OutboundRequest) -> Result<RawResponse> {
            Err(CrawlError::Timeout)
        }
    }

    fn crawler(transport: Arc<dyn Transport>) -> NewsCrawler {
        let mut config = CrawlerConfig::default().without_delays();
        config.retry.max_retries = 0;
        NewsCrawler::with_transport(config, transport, Arc::new(FixedRotation::new(0)))
    }

    fn result_page(titles: &[&str]) -> String {
        let entries: String = titles
            .iter()
            .enumerate()
            .map(|(i, title)| {
                format!(
                    r#"<div class="result-op c-container">
                        <h3 class="news-title"><a href="/link?url=https%3A%2F%2Fnews.test%2F{i}">{title}</a></h3>
                        <span class="c-font-normal c-color-text">第{i}条新闻的正文摘要内容，描述了相关事件的详细经过。</span>
                        <span class="c-color-gray">四川日报 2024-07-{day:02}</span>
                    </div>"#,
                    i = i,
                    title = title,
                    day = i + 1
                )
            })
            .collect();
        format!(
            r#"<html><body><div id="s_tab"><a href="/">网页</a><a href="/more">更多</a></div>{}</body></html>"#,
            entries
        )
    }

    #[tokio::test]
    async fn test_search_extracts_records() {
        let page = result_page(&["西昌卫星发射中心成功发射", "凉山州西昌市举办火把节"]);
        let crawler = crawler(StaticTransport::new(200, page));

        let results = crawler.search("西昌", 10).await;
        assert_eq!(results.len(), 2);
        let first = &results.items()[0];
        assert_eq!(first.title, "西昌卫星发射中心成功发射");
        assert_eq!(first.url, "https://news.test/0");
        assert_eq!(first.source, "四川日报");
        assert_eq!(first.cover, "");
        assert!(first.summary.starts_with("第0条新闻的正文摘要内容"));
    }

    #[tokio::test]
    async fn test_search_caps_results() {
        let titles: Vec<String> = (0..10).map(|i| format!("西昌第{}条新闻标题", i)).collect();
        let refs: Vec<&str> = titles.iter().map(String::as_str).collect();
        let crawler = crawler(StaticTransport::new(200, result_page(&refs)));

        let results = crawler.search("西昌", 5).await;
        assert_eq!(results.len(), 5);
        assert_eq!(results.items()[4].title, "西昌第4条新闻标题");
    }

    #[tokio::test]
    async fn test_search_clamps_to_cap() {
        let titles: Vec<String> = (0..60).map(|i| format!("西昌第{}条新闻标题", i)).collect();
        let refs: Vec<&str> = titles.iter().map(String::as_str).collect();
        let crawler = crawler(StaticTransport::new(200, result_page(&refs)));

        let results = crawler.search("西昌", 1000).await;
        assert_eq!(results.len(), 50);
    }

    #[tokio::test]
    async fn test_search_all_endpoints_fail() {
        let transport = StaticTransport::new(503, "busy");
        let crawler = crawler(transport.clone());

        let results = crawler.search("西昌", 5).await;
        assert!(results.is_empty());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_search_transport_errors_degrade() {
        let crawler = crawler(Arc::new(FailingTransport));
        assert!(crawler.search("西昌", 5).await.is_empty());
    }

    #[tokio::test]
    async fn test_search_invalid_request_is_empty() {
        let transport = StaticTransport::new(200, result_page(&["西昌卫星发射中心成功发射"]));
        let crawler = crawler(transport.clone());

        assert!(crawler.search("   ", 5).await.is_empty());
        assert!(crawler.search("西昌", 0).await.is_empty());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_search_dedups_titles() {
        let page = result_page(&["重复的新闻标题", "另一条新闻标题", "重复的新闻标题"]);
        let crawler = crawler(StaticTransport::new(200, page));

        let results = crawler.search("西昌", 10).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results.items()[0].url, "https://news.test/0");
        assert_eq!(results.items()[1].title, "另一条新闻标题");
    }

    #[tokio::test]
    async fn test_search_navigation_heading_does_not_hide_links() {
        let page = r#"<html><body>
            <div id="side"><h3><a href="/s?wd=x">相关搜索</a></h3></div>
            <ul>
              <li><a href="https://news.test/1">西昌卫星发射中心成功发射遥感卫星</a></li>
              <li><a href="https://news.test/2">凉山州西昌市第二十届火把节开幕式</a></li>
            </ul></body></html>"#;
        let crawler = crawler(StaticTransport::new(200, page));

        let results = crawler.search("西昌", 10).await;
        let urls: Vec<_> = results.items().iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, ["https://news.test/1", "https://news.test/2"]);
    }

    #[tokio::test]
    async fn test_crawler_shared_across_tasks() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NewsCrawler>();

        let page = result_page(&["西昌卫星发射中心成功发射"]);
        let crawler = Arc::new(crawler(StaticTransport::new(200, page)));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let crawler = Arc::clone(&crawler);
                tokio::spawn(async move { crawler.search("西昌", 5).await })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap().len(), 1);
        }
    }

    #[test]
    fn test_extract_flat_page() {
        let crawler = crawler(Arc::new(FailingTransport));
        let origin = Url::parse("https://news.baidu.com/").unwrap();
        let document = RawDocument::from_html(
            r#"<ul><li><a href="/n?id=1">凉山州西昌市举办火把节</a></li>
                <li><a href="/">百度</a></li>
                <li><a href="/n?id=2">西昌卫星发射中心成功发射</a></li></ul>"#,
            origin,
        );

        let results = crawler.extract(&document, 10);
        let urls: Vec<_> = results.items().iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            urls,
            ["https://news.baidu.com/n?id=1", "https://news.baidu.com/n?id=2"]
        );
    }

    #[test]
    fn test_extract_with_forced_mode() {
        let crawler = crawler(Arc::new(FailingTransport));
        let origin = Url::parse("https://www.baidu.com/").unwrap();
        let document = RawDocument::from_html(
            &result_page(&["西昌卫星发射中心成功发射"]),
            origin,
        );

        let results = crawler.extract_with(&document, LocateMode::FlatLink, 10);
        assert_eq!(results.len(), 1);
        assert_eq!(results.items()[0].source, "");
    }
}
