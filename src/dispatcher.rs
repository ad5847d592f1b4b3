//! Request dispatch: pacing, identity rotation, retries and endpoint fallback.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::config::{CrawlerConfig, DelayRange, RetryPolicy};
use crate::document::RawDocument;
use crate::endpoint::{Endpoint, Identity, COMMON_HEADERS};
use crate::rotation::Rotation;
use crate::transport::{OutboundRequest, Transport};
use crate::{CrawlError, Result, SearchRequest};

/// Sends a search to one endpoint at a time until one answers.
///
/// Attempts are strictly sequential. A randomly chosen endpoint goes first;
/// if it fails, the rest of the pool is tried in order.
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    rotation: Arc<dyn Rotation>,
    endpoints: Vec<Endpoint>,
    user_agents: Vec<String>,
    retry: RetryPolicy,
    timeout: Duration,
    initial_delay: DelayRange,
    fallback_delay: DelayRange,
}

impl Dispatcher {
    /// Creates a dispatcher from configuration.
    pub fn new(
        config: &CrawlerConfig,
        transport: Arc<dyn Transport>,
        rotation: Arc<dyn Rotation>,
    ) -> Self {
        Self {
            transport,
            rotation,
            endpoints: config.endpoints.clone(),
            user_agents: config.user_agents.clone(),
            retry: config.retry.clone(),
            timeout: config.timeout(),
            initial_delay: config.initial_delay,
            fallback_delay: config.fallback_delay,
        }
    }

    /// Overrides the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Picks a fresh identity from the user-agent pool.
    pub fn identity(&self) -> Identity {
        let user_agent = if self.user_agents.is_empty() {
            String::new()
        } else {
            let len = self.user_agents.len();
            self.user_agents[self.rotation.pick(len) % len].clone()
        };
        Identity::new(user_agent)
    }

    /// Builds the outbound request for one endpoint.
    pub fn build_request(
        &self,
        endpoint: &Endpoint,
        request: &SearchRequest,
        identity: &Identity,
    ) -> OutboundRequest {
        let mut outbound =
            OutboundRequest::new(endpoint.build_url(request.keyword(), request.max_results()));
        for (name, value) in COMMON_HEADERS {
            outbound = outbound.with_header(*name, *value);
        }
        if !identity.user_agent.is_empty() {
            outbound = outbound.with_header("User-Agent", identity.user_agent.as_str());
        }
        outbound
            .with_header("Host", endpoint.host.as_str())
            .with_header("Referer", endpoint.referer.as_str())
    }

    /// Fetches the result page for a request.
    ///
    /// Fails only when every endpoint has failed.
    pub async fn fetch(&self, request: &SearchRequest) -> Result<RawDocument> {
        if self.endpoints.is_empty() {
            return Err(CrawlError::NoEndpoints);
        }

        // injected rotations may return any index
        let first = self.rotation.pick(self.endpoints.len()) % self.endpoints.len();
        pause(self.rotation.delay(self.initial_delay)).await;

        match self.try_endpoint(&self.endpoints[first], request).await {
            Ok(document) => return Ok(document),
            Err(e) => warn!("Endpoint {} failed: {}", self.endpoints[first].base_url, e),
        }

        for (index, endpoint) in self.endpoints.iter().enumerate() {
            if index == first {
                continue;
            }
            pause(self.rotation.delay(self.fallback_delay)).await;

            match self.try_endpoint(endpoint, request).await {
                Ok(document) => {
                    debug!("Fallback endpoint {} succeeded", endpoint.base_url);
                    return Ok(document);
                }
                Err(e) => warn!("Fallback endpoint {} failed: {}", endpoint.base_url, e),
            }
        }

        Err(CrawlError::Exhausted(self.endpoints.len()))
    }

    /// One endpoint, retrying transient failures with exponential backoff.
    async fn try_endpoint(&self, endpoint: &Endpoint, request: &SearchRequest) -> Result<RawDocument> {
        let mut retries = 0;
        loop {
            match self.attempt(endpoint, request).await {
                Ok(document) => return Ok(document),
                Err(e) if retries < self.retry.max_retries && e.is_retryable(&self.retry.statuses) => {
                    retries += 1;
                    let backoff = self.retry.backoff(retries);
                    debug!(
                        "Retry {}/{} for {} in {:?}: {}",
                        retries, self.retry.max_retries, endpoint.base_url, backoff, e
                    );
                    pause(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn attempt(&self, endpoint: &Endpoint, request: &SearchRequest) -> Result<RawDocument> {
        let outbound = self.build_request(endpoint, request, &self.identity());
        debug!("GET {}", outbound.url);

        let response = timeout(self.timeout, self.transport.get(&outbound))
            .await
            .map_err(|_| CrawlError::Timeout)??;

        if !response.is_success() {
            return Err(CrawlError::Status {
                endpoint: endpoint.base_url.clone(),
                status: response.status,
            });
        }

        Ok(RawDocument::from_response(response, endpoint.origin()?))
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotation::FixedRotation;
    use crate::transport::RawResponse;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    type Responder = Box<dyn Fn(usize, &OutboundRequest) -> Result<RawResponse> + Send + Sync>;

    struct MockTransport {
        calls: Mutex<Vec<OutboundRequest>>,
        counter: AtomicUsize,
        delay: Duration,
        respond: Responder,
    }

    impl MockTransport {
        fn new(
            respond: impl Fn(usize, &OutboundRequest) -> Result<RawResponse> + Send + Sync + 'static,
        ) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                counter: AtomicUsize::new(0),
                delay: Duration::ZERO,
                respond: Box::new(respond),
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn urls(&self) -> Vec<String> {
            self.calls.lock().unwrap().iter().map(|c| c.url.clone()).collect()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn get(&self, request: &OutboundRequest) -> Result<RawResponse> {
            self.calls.lock().unwrap().push(request.clone());
            let n = self.counter.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                sleep(self.delay).await;
            }
            (self.respond)(n, request)
        }
    }

    fn config() -> CrawlerConfig {
        let mut config = CrawlerConfig::default().without_delays();
        config.retry = RetryPolicy::none();
        config
    }

    fn dispatcher(config: &CrawlerConfig, transport: Arc<MockTransport>, pick: usize) -> Dispatcher {
        Dispatcher::new(config, transport, Arc::new(FixedRotation::new(pick)))
    }

    fn request() -> SearchRequest {
        SearchRequest::new("西昌", 5).unwrap()
    }

    fn ok_page() -> Result<RawResponse> {
        Ok(RawResponse::new(200, Some("utf-8".into()), "<html></html>"))
    }

    #[tokio::test]
    async fn test_fetch_uses_picked_endpoint_and_identity() {
        let transport = Arc::new(MockTransport::new(|_, _| ok_page()));
        let config = config();
        let dispatcher = dispatcher(&config, transport.clone(), 1);

        let document = dispatcher.fetch(&request()).await.unwrap();
        assert_eq!(document.origin().as_str(), "https://www.baidu.com/");

        let calls = transport.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].url.starts_with("https://www.baidu.com/s?wd="));
        assert!(calls[0].url.ends_with("&pn=0&rn=5&tn=news"));
        assert_eq!(calls[0].header("Host"), Some("www.baidu.com"));
        assert_eq!(calls[0].header("Referer"), Some("https://www.baidu.com/"));
        assert_eq!(calls[0].header("User-Agent"), Some(config.user_agents[1].as_str()));
        assert_eq!(calls[0].header("Accept-Language"), Some("zh-CN,zh;q=0.9"));
    }

    #[tokio::test]
    async fn test_fetch_falls_back_excluding_failed_endpoint() {
        let transport = Arc::new(MockTransport::new(|_, req| {
            if req.url.starts_with("https://www.baidu.com/news") {
                ok_page()
            } else {
                Ok(RawResponse::new(403, None, ""))
            }
        }));
        let config = config();
        let dispatcher = dispatcher(&config, transport.clone(), 1);

        let document = dispatcher.fetch(&request()).await.unwrap();
        assert_eq!(document.origin().as_str(), "https://www.baidu.com/");

        let urls = transport.urls();
        assert_eq!(urls.len(), 3);
        assert!(urls[0].starts_with("https://www.baidu.com/s?"));
        assert!(urls[1].starts_with("https://news.baidu.com/ns?word="));
        assert!(urls[2].starts_with("https://www.baidu.com/news?"));
    }

    #[tokio::test]
    async fn test_fetch_exhausted() {
        let transport = Arc::new(MockTransport::new(|_, _| Ok(RawResponse::new(404, None, ""))));
        let config = config();
        let dispatcher = dispatcher(&config, transport.clone(), 0);

        let err = dispatcher.fetch(&request()).await.unwrap_err();
        assert!(matches!(err, CrawlError::Exhausted(3)));
        assert_eq!(transport.urls().len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_retries_transient_status() {
        let transport = Arc::new(MockTransport::new(|n, _| {
            if n == 0 {
                Ok(RawResponse::new(503, None, ""))
            } else {
                ok_page()
            }
        }));
        let mut config = config();
        config.retry = RetryPolicy {
            backoff_ms: 0,
            ..RetryPolicy::default()
        };
        let dispatcher = dispatcher(&config, transport.clone(), 0);

        assert!(dispatcher.fetch(&request()).await.is_ok());
        let urls = transport.urls();
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0], urls[1]);
    }

    #[tokio::test]
    async fn test_fetch_retry_budget_per_endpoint() {
        let transport = Arc::new(MockTransport::new(|_, _| Ok(RawResponse::new(502, None, ""))));
        let mut config = config();
        config.retry = RetryPolicy {
            max_retries: 2,
            backoff_ms: 0,
            statuses: vec![502],
        };
        let dispatcher = dispatcher(&config, transport.clone(), 2);

        assert!(dispatcher.fetch(&request()).await.is_err());
        assert_eq!(transport.urls().len(), 9);
    }

    #[tokio::test]
    async fn test_fetch_timeout_triggers_fallback() {
        let transport = Arc::new(
            MockTransport::new(|_, _| ok_page()).with_delay(Duration::from_millis(200)),
        );
        let config = config();
        let dispatcher =
            dispatcher(&config, transport.clone(), 0).with_timeout(Duration::from_millis(10));

        let err = dispatcher.fetch(&request()).await.unwrap_err();
        assert!(matches!(err, CrawlError::Exhausted(3)));
        assert_eq!(transport.urls().len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_transport_error_not_retried_when_permanent() {
        let transport = Arc::new(MockTransport::new(|n, _| {
            if n == 0 {
                Err(CrawlError::Parse("garbled".into()))
            } else {
                ok_page()
            }
        }));
        let mut config = config();
        config.retry.max_retries = 3;
        let dispatcher = dispatcher(&config, transport.clone(), 0);

        let document = dispatcher.fetch(&request()).await.unwrap();
        assert_eq!(document.origin().as_str(), "https://www.baidu.com/");
        assert_eq!(transport.urls().len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_no_endpoints() {
        let transport = Arc::new(MockTransport::new(|_, _| ok_page()));
        let mut config = config();
        config.endpoints.clear();
        let dispatcher = dispatcher(&config, transport.clone(), 0);

        assert!(matches!(
            dispatcher.fetch(&request()).await,
            Err(CrawlError::NoEndpoints)
        ));
        assert!(transport.urls().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_redetects_latin1_charset() {
        let transport = Arc::new(MockTransport::new(|_, _| {
            Ok(RawResponse::new(200, Some("ISO-8859-1".into()), "<p>西昌</p>"))
        }));
        let config = config();
        let dispatcher = dispatcher(&config, transport, 0);

        let document = dispatcher.fetch(&request()).await.unwrap();
        assert_eq!(document.encoding(), encoding_rs::UTF_8);
        assert_eq!(document.parse().find_all("p")[0].text(), "西昌");
    }

    #[test]
    fn test_identity_rotates_from_pool() {
        let transport = Arc::new(MockTransport::new(|_, _| ok_page()));
        let config = config();
        let dispatcher = dispatcher(&config, transport, 4);
        assert_eq!(dispatcher.identity().user_agent, config.user_agents[4]);
    }

    struct OverflowRotation;

    impl Rotation for OverflowRotation {
        fn pick(&self, len: usize) -> usize {
            len + 7
        }

        fn delay(&self, _range: DelayRange) -> Duration {
            Duration::ZERO
        }
    }

    #[tokio::test]
    async fn test_out_of_range_rotation_wraps() {
        let transport = Arc::new(MockTransport::new(|_, _| ok_page()));
        let config = config();
        let dispatcher = Dispatcher::new(&config, transport.clone(), Arc::new(OverflowRotation));

        assert_eq!(dispatcher.identity().user_agent, config.user_agents[1]);
        let document = dispatcher.fetch(&request()).await.unwrap();
        assert_eq!(document.origin().as_str(), "https://www.baidu.com/");
        assert!(transport.urls()[0].starts_with("https://www.baidu.com/s?"));
    }
}
