//! Site extractors
//!
//! An extractor turns the markup of one listing page into normalized product
//! records plus the page-level signals the pagination driver needs.
//!
//! Extraction is lenient: every field has a fallback chain and a sentinel,
//! and a product node is dropped only when it has no usable title or link.

mod profiles;
mod rules;

pub use profiles::{profile_for, SITE_A, SITE_B, SITE_C};
pub use rules::{FieldRule, NextPageRule, NoResultsRule, SiteProfile};

use crate::config::ImageNaming;
use crate::download::image_path;
use crate::url::{canonical_product_url, resolve_image_url};
use crate::{CatalogError, NormalizedProduct, Platform, MISSING};
use rules::{all_matches, first_match, CompiledProfile};
use scraper::{ElementRef, Html};
use std::path::PathBuf;
use url::Url;

/// Everything an extractor learned from one listing page
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    /// Records in node order
    pub products: Vec<NormalizedProduct>,

    /// Product nodes found, including dropped ones
    pub node_count: usize,

    /// The site's explicit "no results" marker is present
    pub no_results: bool,

    /// An enabled "next page" control is present
    pub has_next_page: bool,
}

/// Parses listing markup of one site dialect
pub trait Extractor: Send + Sync {
    /// The site this extractor understands
    fn platform(&self) -> Platform;

    /// Whether the site renders a "next page" control at all
    ///
    /// Sites without one are paginated until an empty page.
    fn has_pagination_control(&self) -> bool;

    /// Parses one listing page
    fn parse_page(&self, markup: &str, category: &str) -> ListingPage;

    /// Extracts only the records of one listing page
    fn extract(&self, markup: &str, category: &str) -> Vec<NormalizedProduct> {
        self.parse_page(markup, category).products
    }
}

/// Extractor driven by a `SiteProfile` selector table
#[derive(Debug)]
pub struct ProfileExtractor {
    profile: SiteProfile,
    compiled: CompiledProfile,
    origin: Url,
    image_dir: PathBuf,
    naming: ImageNaming,
}

impl ProfileExtractor {
    /// Creates an extractor for a built-in platform profile
    ///
    /// # Arguments
    ///
    /// * `platform` - The site dialect
    /// * `origin` - Overrides the profile origin for link resolution
    /// * `image_dir` - Directory local image paths are computed under
    /// * `naming` - Local image naming strategy
    pub fn new(
        platform: Platform,
        origin: Option<&str>,
        image_dir: impl Into<PathBuf>,
        naming: ImageNaming,
    ) -> Result<Self, CatalogError> {
        Self::with_profile(*profile_for(platform), origin, image_dir, naming)
    }

    /// Creates an extractor for an arbitrary profile
    pub fn with_profile(
        profile: SiteProfile,
        origin: Option<&str>,
        image_dir: impl Into<PathBuf>,
        naming: ImageNaming,
    ) -> Result<Self, CatalogError> {
        let origin = Url::parse(origin.unwrap_or(profile.origin))?;
        let compiled = CompiledProfile::new(&profile)?;

        Ok(Self {
            profile,
            compiled,
            origin,
            image_dir: image_dir.into(),
            naming,
        })
    }

    /// Extracts one product node, or `None` when title or link is missing
    fn extract_product(&self, node: ElementRef<'_>, category: &str) -> Option<NormalizedProduct> {
        let title = first_match(&self.compiled.title, node).unwrap_or_else(|| MISSING.to_string());

        let price = first_match(&self.compiled.price, node)
            .map(|raw| self.clean_price(&raw))
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| MISSING.to_string());

        let source_url = all_matches(&self.compiled.link, node)
            .find_map(|href| canonical_product_url(&href, &self.origin).ok())
            .map(|u| u.to_string())
            .unwrap_or_else(|| MISSING.to_string());

        let image_url = all_matches(&self.compiled.image, node)
            .find_map(|src| resolve_image_url(&src, &self.origin));

        if title == MISSING || source_url == MISSING {
            tracing::warn!(
                "Skipping {} product due to missing title or link (title: {})",
                self.profile.platform,
                title
            );
            return None;
        }

        if price == MISSING {
            tracing::debug!("Price not found for '{}'", truncate(&title, 30));
        }
        if image_url.is_none() {
            tracing::debug!("Image URL not found for '{}'", truncate(&title, 30));
        }

        let local_image_path = image_path(&self.image_dir, &title, &source_url, self.naming);

        Some(NormalizedProduct {
            title,
            price,
            source_url,
            image_url,
            local_image_path,
            platform: self.profile.platform,
            category: category.to_string(),
        })
    }

    fn clean_price(&self, raw: &str) -> String {
        let mut price = raw.to_string();
        for token in self.profile.price_strip {
            price = price.replace(token, "");
        }
        price.trim().to_string()
    }
}

impl Extractor for ProfileExtractor {
    fn platform(&self) -> Platform {
        self.profile.platform
    }

    fn has_pagination_control(&self) -> bool {
        self.profile.next_page.is_some()
    }

    fn parse_page(&self, markup: &str, category: &str) -> ListingPage {
        let document = Html::parse_document(markup);

        let no_results = self.compiled.has_no_results_marker(&document);
        let has_next_page = self.compiled.has_next_page(&document);

        let mut node_count = 0;
        let mut products = Vec::new();
        for node in document.select(&self.compiled.product) {
            node_count += 1;
            if let Some(product) = self.extract_product(node, category) {
                products.push(product);
            }
        }

        ListingPage {
            products,
            node_count,
            no_results,
            has_next_page,
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
