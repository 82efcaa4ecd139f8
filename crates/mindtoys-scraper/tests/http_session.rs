//! Integration tests for `HttpSession::fetch_page`.
//!
//! Each test stands up a local `wiremock` server, so no real network traffic
//! is made. They cover the status mapping the crawl relies on and the 429
//! backoff path.

use std::time::Duration;

use mindtoys_scraper::{HttpSession, HttpSessionConfig, PageSession, PageStatus};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(5);

fn test_session(max_retries: u32) -> HttpSession {
    HttpSession::new(HttpSessionConfig {
        user_agent: "mindtoys-test/0.1".to_owned(),
        max_retries,
        backoff_base_secs: 0,
        inter_page_delay: Duration::ZERO,
    })
    .expect("failed to build test HttpSession")
}

#[tokio::test]
async fn fetch_page_returns_html_on_200() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/product-category/toys/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>ok</body></html>"))
        .mount(&server)
        .await;

    let mut session = test_session(0);
    let fetch = session
        .fetch_page(&format!("{}/product-category/toys/", server.uri()), TIMEOUT)
        .await;

    assert_eq!(fetch.status, PageStatus::Ok);
    assert!(fetch.html.contains("ok"));
    assert!(fetch.detail.is_none());
}

#[tokio::test]
async fn fetch_page_maps_404_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/product-category/toys/page/7/"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = test_session(2);
    let fetch = session
        .fetch_page(
            &format!("{}/product-category/toys/page/7/", server.uri()),
            TIMEOUT,
        )
        .await;

    assert_eq!(fetch.status, PageStatus::NotFound);
    assert!(fetch.html.is_empty());
}

#[tokio::test]
async fn fetch_page_maps_server_error_to_other_error_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = test_session(2);
    let fetch = session.fetch_page(&server.uri(), TIMEOUT).await;

    assert_eq!(fetch.status, PageStatus::OtherError);
    assert!(
        fetch.detail.as_deref().unwrap_or_default().contains("503"),
        "detail should name the status: {:?}",
        fetch.detail
    );
}

#[tokio::test]
async fn fetch_page_retries_after_429_and_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>second try</p>"))
        .mount(&server)
        .await;

    let mut session = test_session(1);
    let fetch = session.fetch_page(&server.uri(), TIMEOUT).await;

    assert_eq!(fetch.status, PageStatus::Ok);
    assert!(fetch.html.contains("second try"));
}

#[tokio::test]
async fn fetch_page_gives_up_after_exhausting_429_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .expect(2) // 1 initial + 1 retry
        .mount(&server)
        .await;

    let mut session = test_session(1);
    let fetch = session.fetch_page(&server.uri(), TIMEOUT).await;

    assert_eq!(fetch.status, PageStatus::OtherError);
}

#[tokio::test]
async fn fetch_page_maps_slow_response_to_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<p>too late</p>")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let mut session = test_session(0);
    let fetch = session
        .fetch_page(&server.uri(), Duration::from_millis(200))
        .await;

    assert_eq!(fetch.status, PageStatus::Timeout);
}

#[tokio::test]
async fn fetch_page_rejects_malformed_url() {
    let mut session = test_session(0);
    let fetch = session.fetch_page("not a url", TIMEOUT).await;

    assert_eq!(fetch.status, PageStatus::OtherError);
    assert!(fetch.detail.unwrap().contains("invalid URL"));
}
