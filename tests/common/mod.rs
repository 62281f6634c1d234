//! Shared helpers for the integration tests
//!
//! Listing markup builders for the built-in site dialects and extractor
//! constructors pointed at a mock server.

#![allow(dead_code)]

use catalog_crawler::config::ImageNaming;
use catalog_crawler::{Platform, ProfileExtractor};
use std::path::Path;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A Catalog-B product card; `image` is the lazy-load `data-src`
pub fn site_b_card(n: usize, image: Option<&str>) -> String {
    let img = image
        .map(|src| format!(r#"<img class="img" data-src="{}" src="data:image/gif;base64,R0lG">"#, src))
        .unwrap_or_default();
    format!(
        r#"<article class="prd"><a class="core" href="/p/{n}"><div class="img-c">{img}</div><h3 class="name">Product {n}</h3><div class="prc">EGP {price}</div></a></article>"#,
        n = n,
        img = img,
        price = 100 * n
    )
}

/// A Catalog-A search result card
pub fn site_a_card(n: usize) -> String {
    format!(
        r#"<div data-component-type="s-search-result"><h2><a class="a-link-normal" href="/Laptop-{n}/dp/B0{n}/ref=sr_1_{n}"><span class="a-text-normal">Laptop {n}</span></a></h2><span class="a-price"><span class="a-offscreen">EGP 1,000.00</span><span class="a-price-whole">1,000.</span><span class="a-price-fraction">00</span></span></div>"#,
        n = n
    )
}

/// Wraps cards into a listing page, with an optional enabled next control
pub fn listing(cards: &[String], next_page: bool) -> String {
    let next = if next_page {
        r#"<a class="s-pagination-next" href="?page=next">Next</a>"#
    } else {
        r#"<span class="s-pagination-next s-pagination-disabled">Next</span>"#
    };
    format!("<html><body><main>{}</main>{}</body></html>", cards.join(""), next)
}

/// Catalog-A page carrying the explicit "no results" banner
pub fn no_results_page() -> String {
    r#"<html><body><div class="s-no-results"><span>No results for "laptops".</span></div></body></html>"#
        .to_string()
}

pub fn extractor(platform: Platform, server: &MockServer, image_dir: &Path) -> ProfileExtractor {
    ProfileExtractor::new(platform, Some(&server.uri()), image_dir, ImageNaming::Title).unwrap()
}

/// Mounts `body` as page `page` of the listing at `route`, expecting `hits` requests
pub async fn mount_page(server: &MockServer, route: &str, page: u32, body: String, hits: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(hits)
        .mount(server)
        .await;
}

/// Mounts a failing page that must never be requested
pub async fn forbid_page(server: &MockServer, route: &str, page: u32) {
    Mock::given(method("GET"))
        .and(path(route))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(server)
        .await;
}
