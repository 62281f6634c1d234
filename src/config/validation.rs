use crate::config::types::{CategoryEntry, Config, CrawlerConfig, IngestConfig, OutputConfig, SiteEntry};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Largest accepted `retry-delay-ms`
pub const MAX_RETRY_DELAY_MS: u64 = 60_000;

/// Largest accepted `retry-multiplier`
pub const MAX_RETRY_MULTIPLIER: f64 = 100.0;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    validate_ingest_config(&config.ingest)?;
    validate_sites(&config.sites)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    if config.retry_delay_ms > MAX_RETRY_DELAY_MS {
        return Err(ConfigError::Validation(format!(
            "retry_delay_ms must be <= {}, got {}",
            MAX_RETRY_DELAY_MS, config.retry_delay_ms
        )));
    }

    if !(config.retry_multiplier.is_finite()
        && config.retry_multiplier > 0.0
        && config.retry_multiplier <= MAX_RETRY_MULTIPLIER)
    {
        return Err(ConfigError::Validation(format!(
            "retry_multiplier must be a positive number <= {}, got {}",
            MAX_RETRY_MULTIPLIER, config.retry_multiplier
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.image_dir.trim().is_empty() {
        return Err(ConfigError::Validation(
            "image_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the ingestion endpoint, if one is configured
fn validate_ingest_config(config: &IngestConfig) -> Result<(), ConfigError> {
    if config.url.is_empty() {
        return Ok(());
    }

    validate_http_url(&config.url, "ingest url")?;

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "ingest timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates site entries
fn validate_sites(sites: &[SiteEntry]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for site in sites {
        if !seen.insert(site.platform) {
            return Err(ConfigError::Validation(format!(
                "Platform '{}' is configured more than once",
                site.platform.as_key()
            )));
        }

        if let Some(origin) = &site.origin {
            validate_http_url(origin, "site origin")?;
        }

        if site.max_retries == Some(0) {
            return Err(ConfigError::Validation(format!(
                "max_retries for '{}' must be >= 1",
                site.platform.as_key()
            )));
        }

        if site.require_headers && site.headers_file.is_none() && site.user_agent.is_none() {
            return Err(ConfigError::Validation(format!(
                "Site '{}' requires headers but configures neither headers_file nor user_agent",
                site.platform.as_key()
            )));
        }

        if site.categories.is_empty() {
            return Err(ConfigError::Validation(format!(
                "Site '{}' must have at least one category",
                site.platform.as_key()
            )));
        }

        for category in &site.categories {
            validate_category(category)?;
        }
    }

    Ok(())
}

/// Validates one category entry and its URL template
fn validate_category(category: &CategoryEntry) -> Result<(), ConfigError> {
    if category.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "Category name cannot be empty".to_string(),
        ));
    }

    if !category.url_template.contains("{page}") {
        return Err(ConfigError::Validation(format!(
            "URL template for '{}' must contain a {{page}} placeholder",
            category.name
        )));
    }

    if category.url_template.contains("{id}") && category.id.is_none() {
        return Err(ConfigError::Validation(format!(
            "URL template for '{}' uses {{id}} but the category has no id",
            category.name
        )));
    }

    let sample = category
        .url_template
        .replace("{page}", "1")
        .replace("{id}", category.id.as_deref().unwrap_or_default());
    validate_http_url(&sample, "url template")
}

fn validate_http_url(value: &str, what: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", what, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            what, value
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Platform;

    fn category(template: &str, id: Option<&str>) -> CategoryEntry {
        CategoryEntry {
            name: "laptops".to_string(),
            id: id.map(str::to_string),
            url_template: template.to_string(),
        }
    }

    fn site(platform: Platform) -> SiteEntry {
        SiteEntry {
            platform,
            origin: None,
            headers_file: None,
            require_headers: false,
            user_agent: None,
            max_retries: None,
            categories: vec![category("https://shop.example/laptops?page={page}", None)],
        }
    }

    #[test]
    fn test_validate_category_template() {
        assert!(validate_category(&category("https://shop.example/x?page={page}", None)).is_ok());
        assert!(validate_category(&category("https://shop.example/s?rh={id}&page={page}", Some("n1"))).is_ok());

        assert!(validate_category(&category("https://shop.example/x", None)).is_err());
        assert!(validate_category(&category("https://shop.example/s?rh={id}&page={page}", None)).is_err());
        assert!(validate_category(&category("ftp://shop.example/x?page={page}", None)).is_err());
    }

    #[test]
    fn test_retry_backoff_bounds() {
        let mut crawler = CrawlerConfig::default();
        assert!(validate_crawler_config(&crawler).is_ok());

        crawler.retry_multiplier = 1e300;
        assert!(validate_crawler_config(&crawler).is_err());

        crawler.retry_multiplier = MAX_RETRY_MULTIPLIER;
        assert!(validate_crawler_config(&crawler).is_ok());

        crawler.retry_delay_ms = MAX_RETRY_DELAY_MS + 1;
        assert!(validate_crawler_config(&crawler).is_err());
    }

    #[test]
    fn test_duplicate_platform_rejected() {
        let sites = vec![site(Platform::SiteB), site(Platform::SiteB)];
        assert!(validate_sites(&sites).is_err());
    }

    #[test]
    fn test_site_without_categories_rejected() {
        let mut entry = site(Platform::SiteA);
        entry.categories.clear();
        assert!(validate_sites(&[entry]).is_err());
    }

    #[test]
    fn test_required_headers_need_a_source() {
        let mut entry = site(Platform::SiteA);
        entry.require_headers = true;
        assert!(validate_sites(&[entry.clone()]).is_err());

        entry.headers_file = Some("headers.json".to_string());
        assert!(validate_sites(&[entry]).is_ok());
    }

    #[test]
    fn test_validate_crawler_config() {
        let mut config = CrawlerConfig::default();
        assert!(validate_crawler_config(&config).is_ok());

        config.retry_multiplier = 0.0;
        assert!(validate_crawler_config(&config).is_err());

        config.retry_multiplier = 1.0;
        config.request_timeout_secs = 0;
        assert!(validate_crawler_config(&config).is_err());
    }

    #[test]
    fn test_validate_ingest_url() {
        let mut config = IngestConfig::default();
        assert!(validate_ingest_config(&config).is_ok());

        config.url = "not a url".to_string();
        assert!(validate_ingest_config(&config).is_err());

        config.url = "http://localhost:5000/api/DataIngestion/ingest".to_string();
        assert!(validate_ingest_config(&config).is_ok());
    }
}
