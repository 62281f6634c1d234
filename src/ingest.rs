//! Outbound delivery of crawled records
//!
//! Records are mapped field-for-field into the ingestion payload and POSTed
//! as one JSON array. Delivery failures are logged and never fail the crawl.

use crate::{NormalizedProduct, MISSING};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

/// One record as the ingestion endpoint expects it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct IngestItem {
    pub product_title: Option<String>,
    pub product_price: Option<String>,
    pub product_url: Option<String>,
    pub product_image_url: Option<String>,
    pub product_image_local_path: Option<String>,
    pub platform_name: Option<String>,
    pub category_name: Option<String>,
}

impl IngestItem {
    /// Whether the item carries the fields the endpoint requires
    pub fn is_deliverable(&self) -> bool {
        [&self.product_title, &self.product_url, &self.platform_name]
            .iter()
            .all(|field| field.as_deref().is_some_and(|v| !v.is_empty() && v != MISSING))
    }
}

impl From<&NormalizedProduct> for IngestItem {
    fn from(product: &NormalizedProduct) -> Self {
        Self {
            product_title: Some(product.title.clone()),
            product_price: Some(product.price.clone()),
            product_url: Some(product.source_url.clone()),
            product_image_url: product.image_url.clone(),
            product_image_local_path: Some(product.local_image_path.to_string_lossy().into_owned()),
            platform_name: Some(product.platform.display_name().to_string()),
            category_name: Some(product.category.clone()),
        }
    }
}

/// Keeps the deliverable items, logging how many were dropped
pub fn filter_items(items: impl IntoIterator<Item = IngestItem>) -> Vec<IngestItem> {
    let mut dropped = 0;
    let payload: Vec<_> = items
        .into_iter()
        .filter(|item| {
            let keep = item.is_deliverable();
            if !keep {
                dropped += 1;
            }
            keep
        })
        .collect();

    if dropped > 0 {
        tracing::warn!("Dropped {} records missing title, url or platform", dropped);
    }
    payload
}

/// Maps records into the ingestion payload
pub fn build_payload(products: &[NormalizedProduct]) -> Vec<IngestItem> {
    filter_items(products.iter().map(IngestItem::from))
}

/// Result of one delivery attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Nothing deliverable; no request was made
    Empty,
    /// The endpoint answered 2xx
    Sent { items: usize },
    /// Non-2xx response or transport error
    Failed(String),
}

/// Client of the downstream ingestion endpoint
#[derive(Debug, Clone)]
pub struct IngestClient {
    client: Client,
    url: String,
}

impl IngestClient {
    /// Creates a client POSTing to `url`
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Delivers `products`; failures are logged and reported, never raised
    pub async fn send(&self, products: &[NormalizedProduct]) -> Delivery {
        self.send_items(build_payload(products)).await
    }

    /// Delivers already mapped items, dropping undeliverable ones first
    pub async fn send_items(&self, items: Vec<IngestItem>) -> Delivery {
        let payload = filter_items(items);
        if payload.is_empty() {
            tracing::info!("No records to deliver to {}", self.url);
            return Delivery::Empty;
        }

        tracing::info!("Sending {} records to {}", payload.len(), self.url);

        let result = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .and_then(|r| r.error_for_status());

        match result {
            Ok(response) => {
                tracing::info!("Ingestion endpoint answered {}", response.status());
                Delivery::Sent {
                    items: payload.len(),
                }
            }
            Err(e) => {
                tracing::error!("Failed to deliver records to {}: {}", self.url, e);
                Delivery::Failed(e.to_string())
            }
        }
    }
}
