//! Integration tests for the crawler
//!
//! Most tests run against an in-memory link graph served by an instrumented
//! downloader that counts fetches per URL and meters concurrent fetches per
//! host. The last few use wiremock to run the HTTP downloader end-to-end.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use web_crawler::config::{CrawlerConfig, HttpConfig, UserAgentConfig};
use web_crawler::crawler::{Document, Downloader, HttpDownloader, WebCrawler};
use web_crawler::{host_of, CrawlError, CrawlResult, ExtractError, FetchError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Upper bound for any single crawl in these tests
const CRAWL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
enum Node {
    Links(Vec<String>),
    FetchFails,
    ExtractFails,
}

struct TestPage {
    url: String,
    links: Option<Vec<String>>,
    extractions: Arc<AtomicUsize>,
}

impl Document for TestPage {
    fn extract_links(&self) -> Result<Vec<String>, ExtractError> {
        self.extractions.fetch_add(1, Ordering::SeqCst);
        self.links.clone().ok_or_else(|| ExtractError::Parse {
            url: self.url.clone(),
            message: "unparsable test page".to_string(),
        })
    }
}

/// Serves a fixed link graph; URLs missing from the graph fail with 404
#[derive(Default)]
struct GraphDownloader {
    nodes: HashMap<String, Node>,
    delay: Duration,
    calls: Mutex<HashMap<String, usize>>,
    in_flight: Mutex<HashMap<String, usize>>,
    max_in_flight: Mutex<HashMap<String, usize>>,
    extractions: Arc<AtomicUsize>,
}

impl GraphDownloader {
    fn new() -> Self {
        Self::default()
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn page(mut self, url: &str, links: &[&str]) -> Self {
        self.nodes.insert(
            url.to_string(),
            Node::Links(links.iter().map(|l| l.to_string()).collect()),
        );
        self
    }

    fn page_owned(mut self, url: String, links: Vec<String>) -> Self {
        self.nodes.insert(url, Node::Links(links));
        self
    }

    fn failing(mut self, url: &str) -> Self {
        self.nodes.insert(url.to_string(), Node::FetchFails);
        self
    }

    fn unparsable(mut self, url: &str) -> Self {
        self.nodes.insert(url.to_string(), Node::ExtractFails);
        self
    }

    fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    fn max_calls_per_url(&self) -> usize {
        self.calls.lock().unwrap().values().copied().max().unwrap_or(0)
    }

    fn max_in_flight(&self, host: &str) -> usize {
        self.max_in_flight
            .lock()
            .unwrap()
            .get(host)
            .copied()
            .unwrap_or(0)
    }

    fn extractions(&self) -> usize {
        self.extractions.load(Ordering::SeqCst)
    }
}

impl Downloader for GraphDownloader {
    type Document = TestPage;

    fn download(&self, url: &str) -> impl Future<Output = Result<TestPage, FetchError>> + Send {
        async move {
            *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;

            let host = host_of(url).expect("crawler only fetches URLs with a host");
            {
                let mut in_flight = self.in_flight.lock().unwrap();
                let current = in_flight.entry(host.clone()).or_default();
                *current += 1;
                let mut max = self.max_in_flight.lock().unwrap();
                let seen = max.entry(host.clone()).or_default();
                *seen = (*seen).max(*current);
            }

            if self.delay.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(self.delay).await;
            }

            *self.in_flight.lock().unwrap().get_mut(&host).unwrap() -= 1;

            let page = |links| TestPage {
                url: url.to_string(),
                links,
                extractions: Arc::clone(&self.extractions),
            };
            match self.nodes.get(url) {
                Some(Node::Links(links)) => Ok(page(Some(links.clone()))),
                Some(Node::ExtractFails) => Ok(page(None)),
                Some(Node::FetchFails) | None => Err(FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                }),
            }
        }
    }
}

fn test_config(downloaders: usize, extractors: usize, per_host: usize) -> CrawlerConfig {
    CrawlerConfig {
        downloaders,
        extractors,
        per_host,
        max_depth: 2,
        close_grace_secs: 5,
    }
}

async fn crawl<D: Downloader>(crawler: &WebCrawler<D>, url: &str, depth: u32) -> CrawlResult {
    tokio::time::timeout(CRAWL_TIMEOUT, crawler.download(url, depth))
        .await
        .expect("crawl did not finish")
}

fn set(urls: &[&str]) -> HashSet<String> {
    urls.iter().map(|u| u.to_string()).collect()
}

fn assert_disjoint(result: &CrawlResult) {
    for url in result.errors.keys() {
        assert!(
            !result.downloaded.contains(url),
            "{} is both downloaded and failed",
            url
        );
    }
}

#[tokio::test]
async fn test_single_page_depth_one() {
    let downloader = GraphDownloader::new().page("https://a.com/", &["https://a.com/b"]);
    let crawler = WebCrawler::new(downloader, &test_config(4, 4, 2)).unwrap();

    let result = crawl(&crawler, "https://a.com/", 1).await;

    assert_eq!(result.downloaded, set(&["https://a.com/"]));
    assert!(result.errors.is_empty());
    assert_eq!(crawler.downloader().extractions(), 0);
    assert_eq!(crawler.downloader().calls("https://a.com/b"), 0);

    crawler.close().await;
}

#[tokio::test]
async fn test_depth_exhausted_links_are_absent() {
    let downloader = GraphDownloader::new()
        .page("https://a.com/", &["https://a.com/b", "https://c.com/"])
        .page("https://a.com/b", &["https://d.com/"])
        .page("https://c.com/", &["https://d.com/"])
        .page("https://d.com/", &[]);
    let crawler = WebCrawler::new(downloader, &test_config(4, 4, 2)).unwrap();

    let result = crawl(&crawler, "https://a.com/", 2).await;

    assert_eq!(
        result.downloaded,
        set(&["https://a.com/", "https://a.com/b", "https://c.com/"])
    );
    assert!(result.errors.is_empty());
    assert!(!result.errors.contains_key("https://d.com/"));
    assert_eq!(crawler.downloader().calls("https://d.com/"), 0);

    crawler.close().await;
}

#[tokio::test]
async fn test_failed_fetch_is_recorded() {
    let downloader = GraphDownloader::new()
        .page("https://a.com/", &["https://a.com/b"])
        .failing("https://a.com/b");
    let crawler = WebCrawler::new(downloader, &test_config(2, 2, 1)).unwrap();

    let result = crawl(&crawler, "https://a.com/", 2).await;

    assert_eq!(result.downloaded, set(&["https://a.com/"]));
    assert_eq!(result.errors.len(), 1);
    assert!(matches!(
        result.errors.get("https://a.com/b"),
        Some(CrawlError::Fetch(FetchError::Status { status: 404, .. }))
    ));
    assert_disjoint(&result);

    crawler.close().await;
}

#[tokio::test]
async fn test_malformed_seed_fetches_nothing() {
    let downloader = GraphDownloader::new().page("https://a.com/", &[]);
    let crawler = WebCrawler::new(downloader, &test_config(2, 2, 1)).unwrap();

    let result = crawl(&crawler, "definitely not a url", 3).await;

    assert!(result.downloaded.is_empty());
    assert_eq!(result.errors.len(), 1);
    assert!(matches!(
        result.errors.get("definitely not a url"),
        Some(CrawlError::Seed { .. })
    ));
    assert_eq!(crawler.downloader().total_calls(), 0);

    crawler.close().await;
}

#[tokio::test]
async fn test_extraction_failure_is_not_an_error() {
    let downloader = GraphDownloader::new().unparsable("https://a.com/");
    let crawler = WebCrawler::new(downloader, &test_config(2, 2, 1)).unwrap();

    let result = crawl(&crawler, "https://a.com/", 3).await;

    assert_eq!(result.downloaded, set(&["https://a.com/"]));
    assert!(result.errors.is_empty());
    assert_eq!(crawler.downloader().extractions(), 1);

    crawler.close().await;
}

#[tokio::test]
async fn test_malformed_links_are_skipped() {
    let downloader = GraphDownloader::new()
        .page(
            "https://a.com/",
            &["not a url", "mailto:x@a.com", "https://a.com/ok"],
        )
        .page("https://a.com/ok", &[]);
    let crawler = WebCrawler::new(downloader, &test_config(2, 2, 1)).unwrap();

    let result = crawl(&crawler, "https://a.com/", 2).await;

    assert_eq!(result.downloaded, set(&["https://a.com/", "https://a.com/ok"]));
    assert!(result.errors.is_empty());

    crawler.close().await;
}

#[tokio::test]
async fn test_cycles_terminate_and_fetch_once() {
    let downloader = GraphDownloader::new()
        .page("https://a.com/", &["https://b.com/"])
        .page("https://b.com/", &["https://a.com/", "https://b.com/"]);
    let crawler = WebCrawler::new(downloader, &test_config(2, 2, 1)).unwrap();

    let result = crawl(&crawler, "https://a.com/", 10).await;

    assert_eq!(result.downloaded, set(&["https://a.com/", "https://b.com/"]));
    assert_eq!(crawler.downloader().calls("https://a.com/"), 1);
    assert_eq!(crawler.downloader().calls("https://b.com/"), 1);

    crawler.close().await;
}

#[tokio::test]
async fn test_dense_graph_fetches_each_url_once() {
    let hosts = ["h1.com", "h2.com", "h3.com"];
    let urls: Vec<String> = hosts
        .iter()
        .flat_map(|h| (0..8).map(move |i| format!("https://{}/{}", h, i)))
        .collect();

    // Every page links to every page, including itself.
    let mut downloader = GraphDownloader::new().with_delay(Duration::from_millis(2));
    for url in &urls {
        downloader = downloader.page_owned(url.clone(), urls.clone());
    }
    let crawler = WebCrawler::new(downloader, &test_config(6, 3, 2)).unwrap();

    let result = crawl(&crawler, &urls[0], 4).await;

    let expected: HashSet<String> = urls.iter().cloned().collect();
    assert_eq!(result.downloaded, expected);
    assert!(result.errors.is_empty());
    assert_eq!(crawler.downloader().max_calls_per_url(), 1);
    assert_eq!(crawler.downloader().total_calls(), urls.len());

    crawler.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_per_host_limit_is_respected() {
    let mut links: Vec<String> = (0..20).map(|i| format!("https://busy.com/{}", i)).collect();
    links.extend((0..20).map(|i| format!("https://other.com/{}", i)));

    let mut downloader = GraphDownloader::new()
        .with_delay(Duration::from_millis(10))
        .page_owned("https://busy.com/".to_string(), links.clone());
    for link in &links {
        downloader = downloader.page_owned(link.clone(), vec![]);
    }

    for per_host in [1, 2, 3] {
        let crawler = WebCrawler::new(
            // Each iteration needs a fresh meter.
            GraphDownloader {
                nodes: downloader.nodes.clone(),
                delay: downloader.delay,
                ..GraphDownloader::default()
            },
            &test_config(8, 2, per_host),
        )
        .unwrap();

        let result = crawl(&crawler, "https://busy.com/", 2).await;
        assert_eq!(result.downloaded.len(), 41);

        let meter = crawler.downloader();
        assert!(meter.max_in_flight("busy.com") <= per_host);
        assert!(meter.max_in_flight("other.com") <= per_host);
        // The limit is reachable, not just respected.
        if per_host > 1 {
            assert!(meter.max_in_flight("busy.com") > 1);
        }
        assert_eq!(meter.max_calls_per_url(), 1);

        crawler.close().await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_downloads_are_independent() {
    let downloader = GraphDownloader::new()
        .with_delay(Duration::from_millis(1))
        .page("https://left.com/", &["https://left.com/1", "https://shared.com/"])
        .page("https://left.com/1", &[])
        .page("https://right.com/", &["https://right.com/1", "https://shared.com/"])
        .page("https://right.com/1", &["https://right.com/2"])
        .page("https://right.com/2", &[])
        .page("https://shared.com/", &[]);
    let crawler = WebCrawler::new(downloader, &test_config(4, 2, 1)).unwrap();

    let (left, right) = tokio::join!(
        crawl(&crawler, "https://left.com/", 2),
        crawl(&crawler, "https://right.com/", 3)
    );

    assert_eq!(
        left.downloaded,
        set(&["https://left.com/", "https://left.com/1", "https://shared.com/"])
    );
    assert_eq!(
        right.downloaded,
        set(&[
            "https://right.com/",
            "https://right.com/1",
            "https://right.com/2",
            "https://shared.com/"
        ])
    );
    // Visited state is per crawl: both crawls fetch the shared page.
    assert_eq!(crawler.downloader().calls("https://shared.com/"), 2);

    crawler.close().await;
}

#[tokio::test]
async fn test_repeated_downloads_start_fresh() {
    let downloader = GraphDownloader::new()
        .page("https://a.com/", &["https://a.com/1"])
        .page("https://a.com/1", &[]);
    let crawler = WebCrawler::new(downloader, &test_config(2, 2, 1)).unwrap();

    let first = crawl(&crawler, "https://a.com/", 2).await;
    let second = crawl(&crawler, "https://a.com/", 2).await;

    assert_eq!(first.downloaded, second.downloaded);
    assert_eq!(crawler.downloader().calls("https://a.com/1"), 2);

    crawler.close().await;
}

#[tokio::test]
async fn test_single_worker_pools_do_not_deadlock() {
    let mut downloader = GraphDownloader::new();
    for i in 0..10 {
        let links: Vec<String> = (0..10)
            .map(|j| format!("https://h{}.com/{}", j % 3, (i + j) % 10))
            .collect();
        for h in 0..3 {
            downloader = downloader.page_owned(format!("https://h{}.com/{}", h, i), links.clone());
        }
    }
    let crawler = WebCrawler::new(downloader, &test_config(1, 1, 1)).unwrap();

    let result = crawl(&crawler, "https://h0.com/0", 3).await;

    assert!(!result.downloaded.is_empty());
    assert_disjoint(&result);
    assert_eq!(crawler.downloader().max_calls_per_url(), 1);

    crawler.close().await;
}

// End-to-end over HTTP

fn html(body: String) -> ResponseTemplate {
    // set_body_string would force text/plain over any inserted header
    ResponseTemplate::new(200).set_body_raw(body, "text/html")
}

fn http_crawler() -> WebCrawler<HttpDownloader> {
    let downloader = HttpDownloader::new(&UserAgentConfig::default(), &HttpConfig::default())
        .expect("Failed to build HTTP downloader");
    WebCrawler::new(downloader, &test_config(4, 2, 2)).expect("Failed to create crawler")
}

#[tokio::test]
async fn test_http_crawl_single_domain() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(format!(
            r#"<html><head><title>Home</title></head><body>
            <a href="{}/page1">Page 1</a>
            <a href="/page2">Page 2</a>
            </body></html>"#,
            base_url
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(html(r#"<html><body><a href="/">Home</a></body></html>"#.to_string()))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(html("<html><body>Content 2</body></html>".to_string()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let crawler = http_crawler();
    let result = crawl(&crawler, &format!("{}/", base_url), 3).await;

    assert_eq!(
        result.downloaded,
        [
            format!("{}/", base_url),
            format!("{}/page1", base_url),
            format!("{}/page2", base_url),
        ]
        .into_iter()
        .collect::<HashSet<_>>()
    );
    assert!(result.errors.is_empty());

    crawler.close().await;
    // Wiremock verifies the expect(1) counts when mock_server drops
}

#[tokio::test]
async fn test_http_errors_are_recorded() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body>
            <a href="/missing">Missing</a>
            <a href="/image.png">Image</a>
            </body></html>"#
                .to_string(),
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/image.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![0x89, 0x50, 0x4e, 0x47])
                .insert_header("content-type", "image/png"),
        )
        .mount(&mock_server)
        .await;

    let crawler = http_crawler();
    let result = crawl(&crawler, &format!("{}/", base_url), 2).await;

    assert_eq!(result.downloaded.len(), 1);
    assert!(matches!(
        result.errors.get(&format!("{}/missing", base_url)),
        Some(CrawlError::Fetch(FetchError::Status { status: 404, .. }))
    ));
    assert!(matches!(
        result.errors.get(&format!("{}/image.png", base_url)),
        Some(CrawlError::Fetch(FetchError::ContentMismatch { .. }))
    ));
    assert_disjoint(&result);

    crawler.close().await;
}

#[tokio::test]
async fn test_http_crawl_with_depth_limit() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // A chain: / -> level1 -> level2 -> level3
    for (from, to) in [("/", "/level1"), ("/level1", "/level2"), ("/level2", "/level3")] {
        Mock::given(method("GET"))
            .and(path(from))
            .respond_with(html(format!(r#"<html><body><a href="{}">next</a></body></html>"#, to)))
            .mount(&mock_server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/level3"))
        .respond_with(html("<html><body>end</body></html>".to_string()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let crawler = http_crawler();
    let result = crawl(&crawler, &format!("{}/", base_url), 3).await;

    assert_eq!(result.downloaded.len(), 3);
    assert!(result.downloaded.contains(&format!("{}/level2", base_url)));
    assert!(!result.downloaded.contains(&format!("{}/level3", base_url)));
    assert!(result.errors.is_empty());

    crawler.close().await;
}
