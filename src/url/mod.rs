//! URL handling module for Catalog-Crawler
//!
//! Listing pages reference products and images with absolute, relative and
//! protocol-relative URLs, often decorated with tracking suffixes. This module
//! turns them into canonical absolute URLs.

mod normalize;

pub use normalize::{canonical_product_url, normalize_image_url, resolve_image_url};

/// Substitutes `{page}` and `{id}` in a category URL template
///
/// # Examples
///
/// ```
/// use catalog_crawler::url::render_template;
///
/// let url = render_template("https://shop.example/s?rh={id}&page={page}", Some("n1"), 3);
/// assert_eq!(url, "https://shop.example/s?rh=n1&page=3");
/// ```
pub fn render_template(template: &str, id: Option<&str>, page: u32) -> String {
    let rendered = template.replace("{page}", &page.to_string());
    match id {
        Some(id) => rendered.replace("{id}", id),
        None => rendered,
    }
}
