use crate::{UrlError, UrlResult};
use url::Url;

/// Path marker after which catalog links carry only tracking data
const REF_MARKER: &str = "/ref=";

/// Resolves a product link against the site origin and strips tracking data
///
/// # Normalization Steps
///
/// 1. Reject empty, fragment-only and non-navigational hrefs
///    (`javascript:`, `mailto:`, `tel:`, `data:`)
/// 2. Resolve relative and protocol-relative hrefs against the origin
/// 3. Require an HTTP(S) scheme after resolution
/// 4. Cut the path at the first `/ref=` segment
/// 5. Remove query string and fragment
///
/// # Examples
///
/// ```
/// use catalog_crawler::url::canonical_product_url;
/// use url::Url;
///
/// let origin = Url::parse("https://shop.example").unwrap();
/// let url = canonical_product_url("/Mouse/dp/B01/ref=sr_1_1?keywords=mouse", &origin).unwrap();
/// assert_eq!(url.as_str(), "https://shop.example/Mouse/dp/B01");
/// ```
pub fn canonical_product_url(href: &str, origin: &Url) -> UrlResult<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return Err(UrlError::Unsupported(href.to_string()));
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return Err(UrlError::InvalidScheme(href.to_string()));
    }

    let mut url = origin
        .join(href)
        .map_err(|e| UrlError::Parse(format!("{}: {}", href, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if let Some(idx) = url.path().find(REF_MARKER) {
        let trimmed = url.path()[..idx].to_string();
        url.set_path(&trimmed);
    }

    url.set_query(None);
    url.set_fragment(None);

    Ok(url)
}

/// Resolves an image reference found in listing markup
///
/// Protocol-relative references become `https:` URLs, relative references
/// are joined to the site origin. Returns `None` for empty or inline
/// (`data:`) references.
pub fn resolve_image_url(src: &str, origin: &Url) -> Option<String> {
    let src = src.trim();

    if src.is_empty() || src.starts_with("data:") {
        return None;
    }

    if src.starts_with("//") {
        return Some(format!("https:{}", src));
    }

    if src.starts_with("http://") || src.starts_with("https://") {
        return Some(src.to_string());
    }

    origin.join(src).ok().map(|u| u.to_string())
}

/// Validates an image URL right before download
///
/// Accepts absolute HTTP(S) URLs and upgrades protocol-relative ones to
/// `https:`; everything else is rejected.
pub fn normalize_image_url(url: &str) -> UrlResult<String> {
    let url = url.trim();

    if url.starts_with("//") {
        return Ok(format!("https:{}", url));
    }

    if url.starts_with("http://") || url.starts_with("https://") {
        return Ok(url.to_string());
    }

    Err(UrlError::Unsupported(url.to_string()))
}
