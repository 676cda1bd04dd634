// Integration tests for Storefront Scraper
// These tests drive the engine and the HTTP surface against in-memory catalogs

pub mod replay_tests;
pub mod session_tests;

use axum::{
    body::Body,
    http::{Method, Request},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use storefront_scraper::{
    config::ScraperConfig,
    web::{AppState, create_router},
    AppConfig, MemoryBrowser, ProfileRegistry, ScrapeSession,
};
use tower::ServiceExt;

pub const SHOP_URL: &str = "https://shop.example/shop";

/// Fast timings so whole runs finish in milliseconds.
pub fn get_test_config() -> AppConfig {
    AppConfig {
        scraper: ScraperConfig {
            retry_attempts: 3,
            retry_delay_ms: 10,
            settle_delay_ms: 5,
            search_input_timeout_ms: 50,
            empty_page_retries: 0,
            ..ScraperConfig::default()
        },
        ..AppConfig::default()
    }
}

/// One WooCommerce-style catalog page with `count` products. Every page
/// except the last carries a live "next" control.
pub fn catalog_page(page: usize, count: usize, last: bool) -> String {
    let cards: String = (0..count)
        .map(|i| {
            format!(
                r#"<li class="product">
                    <h2 class="woocommerce-loop-product__title"><a href="/p/{page}-{i}">Product {page}-{i}</a></h2>
                    <span class="price"><bdi>{price}.00 EGP</bdi></span>
                    <img src="/img/{page}-{i}.jpg">
                </li>"#,
                price = 100 * (page + 1) + i
            )
        })
        .collect();
    let next = if last {
        String::new()
    } else {
        format!(r#"<a class="next page-numbers" href="?page={}">→</a>"#, page + 2)
    };
    format!(
        r#"<html><body><form><input name="s" type="search"></form><ul class="products">{}</ul><nav>{}</nav></body></html>"#,
        cards, next
    )
}

pub fn catalog(pages: usize, per_page: usize) -> Vec<String> {
    (0..pages)
        .map(|p| catalog_page(p, per_page, p + 1 == pages))
        .collect()
}

pub fn create_session(browser: MemoryBrowser, config: &AppConfig) -> ScrapeSession {
    ScrapeSession::new(
        Arc::new(browser),
        Arc::new(ProfileRegistry::with_defaults().expect("built-in profiles")),
        config.scraper.clone(),
    )
}

pub fn create_test_app_state(browser: MemoryBrowser, config: AppConfig) -> AppState {
    let session = create_session(browser, &config);
    AppState::new(Arc::new(session), config)
}

pub fn create_test_app(browser: MemoryBrowser, config: AppConfig) -> (Router, AppState) {
    let state = create_test_app_state(browser, config);
    (create_router(state.clone()), state)
}

/// Helper to make HTTP requests to the test app
pub async fn make_request(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> anyhow::Result<axum::response::Response> {
    let mut request = Request::builder().method(method).uri(uri);
    if body.is_some() {
        request = request.header("content-type", "application/json");
    }
    let body = body.map(|b| b.to_string()).unwrap_or_default();
    Ok(app.clone().oneshot(request.body(Body::from(body))?).await?)
}

pub async fn body_bytes(response: axum::response::Response) -> anyhow::Result<Vec<u8>> {
    Ok(axum::body::to_bytes(response.into_body(), usize::MAX).await?.to_vec())
}

pub async fn body_json(response: axum::response::Response) -> anyhow::Result<serde_json::Value> {
    Ok(serde_json::from_slice(&body_bytes(response).await?)?)
}

/// Helper to wait for async operations
pub async fn wait_for_condition<F>(mut condition: F, timeout: Duration) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    false
}
