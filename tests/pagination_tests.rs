//! Integration tests for the pagination driver
//!
//! These tests use wiremock to serve listing pages and check every way a
//! category's pagination can end.

mod common;

use catalog_crawler::crawler::{
    build_http_client, CategoryEnd, CategorySpec, CrawlJob, PageFetcher, Paginator, RetryPolicy,
};
use catalog_crawler::download::{DownloadPool, ImageFetcher};
use catalog_crawler::{CategoryReport, Extractor, Platform};
use common::*;
use reqwest::header::HeaderMap;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn paginate(
    server: &MockServer,
    extractor: &dyn Extractor,
    route: &str,
    retry: RetryPolicy,
    max_pages: Option<u32>,
) -> CategoryReport {
    let client = build_http_client(HeaderMap::new(), Duration::from_secs(5)).unwrap();
    let fetcher = PageFetcher::new(client.clone());
    let pool = DownloadPool::new(ImageFetcher::new(client, Duration::from_secs(5)), 2);
    let mut batch = pool.batch();

    let category = CategorySpec::new("phones", format!("{}{}?page={{page}}", server.uri(), route));
    let paginator = Paginator::new(&fetcher, extractor).with_max_pages(max_pages);
    let mut report = paginator.run(CrawlJob::new(category, retry), &mut batch).await;
    report.images = batch.join().await;
    report
}

#[tokio::test]
async fn test_empty_page_ends_unpaginated_site() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_page(&server, "/phones", 1, listing(&[site_b_card(1, None), site_b_card(2, None)], false), 1).await;
    mount_page(&server, "/phones", 2, listing(&[site_b_card(3, None)], false), 1).await;
    mount_page(&server, "/phones", 3, listing(&[], false), 1).await;
    forbid_page(&server, "/phones", 4).await;

    let extractor = extractor(Platform::SiteB, &server, dir.path());
    let report = paginate(&server, &extractor, "/phones", RetryPolicy::immediate(3), None).await;

    assert_eq!(report.end, CategoryEnd::Done);
    assert_eq!(report.pages_fetched, 3);
    let titles: Vec<_> = report.products.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, ["Product 1", "Product 2", "Product 3"]);
    assert!(report.products.iter().all(|p| p.category == "phones"));
    assert_eq!(report.products[0].source_url, format!("{}/p/1", server.uri()));
    assert_eq!(report.products[1].price, "200");
    assert_eq!(report.images_scheduled, 0);
}

#[tokio::test]
async fn test_no_results_marker_ends_category() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_page(&server, "/s", 1, listing(&[site_a_card(1)], true), 1).await;
    mount_page(&server, "/s", 2, no_results_page(), 1).await;
    forbid_page(&server, "/s", 3).await;

    let extractor = extractor(Platform::SiteA, &server, dir.path());
    let report = paginate(&server, &extractor, "/s", RetryPolicy::immediate(3), None).await;

    assert_eq!(report.end, CategoryEnd::Done);
    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.products.len(), 1);
    assert_eq!(report.products[0].price, "1000.00");
    assert_eq!(report.products[0].source_url, format!("{}/Laptop-1/dp/B01", server.uri()));
}

#[tokio::test]
async fn test_disabled_next_control_ends_after_accumulating() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_page(&server, "/s", 1, listing(&[site_a_card(1), site_a_card(2)], true), 1).await;
    mount_page(&server, "/s", 2, listing(&[site_a_card(3)], false), 1).await;
    forbid_page(&server, "/s", 3).await;

    let extractor = extractor(Platform::SiteA, &server, dir.path());
    let report = paginate(&server, &extractor, "/s", RetryPolicy::immediate(3), None).await;

    assert_eq!(report.end, CategoryEnd::Done);
    assert_eq!(report.products.len(), 3);
    assert_eq!(report.products[2].title, "Laptop 3");
}

#[tokio::test]
async fn test_markup_drift_advances_past_empty_page() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    // Page 1 has no recognizable product nodes but still offers a next page
    mount_page(&server, "/s", 1, listing(&[], true), 1).await;
    mount_page(&server, "/s", 2, listing(&[site_a_card(7)], false), 1).await;
    forbid_page(&server, "/s", 3).await;

    let extractor = extractor(Platform::SiteA, &server, dir.path());
    let report = paginate(&server, &extractor, "/s", RetryPolicy::immediate(3), None).await;

    assert_eq!(report.end, CategoryEnd::Done);
    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.products.len(), 1);
    assert_eq!(report.products[0].title, "Laptop 7");
}

#[tokio::test]
async fn test_retry_exhaustion_aborts_category() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_page(&server, "/phones", 1, listing(&[site_b_card(1, None), site_b_card(2, None)], false), 1).await;
    Mock::given(method("GET"))
        .and(path("/phones"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;
    forbid_page(&server, "/phones", 3).await;

    let extractor = extractor(Platform::SiteB, &server, dir.path());
    let report = paginate(&server, &extractor, "/phones", RetryPolicy::immediate(3), None).await;

    assert_eq!(report.end, CategoryEnd::Aborted);
    assert_eq!(report.pages_fetched, 1);
    // Records of pages fetched before the failure are kept
    assert_eq!(report.products.len(), 2);
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/phones"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    mount_page(&server, "/phones", 1, listing(&[site_b_card(1, None)], false), 1).await;
    mount_page(&server, "/phones", 2, listing(&[], false), 1).await;

    let extractor = extractor(Platform::SiteB, &server, dir.path());
    let retry = RetryPolicy::new(3, Duration::from_millis(5), 1.0);
    let report = paginate(&server, &extractor, "/phones", retry, None).await;

    assert_eq!(report.end, CategoryEnd::Done);
    assert_eq!(report.products.len(), 1);
}

#[tokio::test]
async fn test_page_cap_stops_pagination() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_page(&server, "/phones", 1, listing(&[site_b_card(1, None)], false), 1).await;
    mount_page(&server, "/phones", 2, listing(&[site_b_card(2, None)], false), 1).await;
    forbid_page(&server, "/phones", 3).await;

    let extractor = extractor(Platform::SiteB, &server, dir.path());
    let report = paginate(&server, &extractor, "/phones", RetryPolicy::immediate(1), Some(2)).await;

    assert_eq!(report.end, CategoryEnd::Done);
    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.products.len(), 2);
}

#[tokio::test]
async fn test_images_downloaded_before_report() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let image = format!("{}/img/1.jpg", server.uri());

    mount_page(&server, "/phones", 1, listing(&[site_b_card(1, Some(image.as_str()))], false), 1).await;
    mount_page(&server, "/phones", 2, listing(&[], false), 1).await;
    Mock::given(method("GET"))
        .and(path("/img/1.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF]))
        .expect(1)
        .mount(&server)
        .await;

    let extractor = extractor(Platform::SiteB, &server, dir.path());
    let report = paginate(&server, &extractor, "/phones", RetryPolicy::immediate(1), None).await;

    assert_eq!(report.images_scheduled, 1);
    assert_eq!(report.images.downloaded, 1);
    let local = &report.products[0].local_image_path;
    assert_eq!(local, &dir.path().join("Product_1.jpg"));
    assert_eq!(std::fs::read(local).unwrap(), vec![0xFF, 0xD8, 0xFF]);
}
