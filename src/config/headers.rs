//! Request header files
//!
//! Some catalog sites only answer requests that carry a browser-like header
//! set. Those headers live outside the main config in a JSON file of the form
//! `{"headers": {"User-Agent": "...", "Accept-Language": "..."}}`.

use crate::ConfigError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct HeadersFile {
    headers: BTreeMap<String, String>,
}

/// Loads a header-name to value mapping from a JSON headers file
///
/// A missing file, malformed JSON, or a file without a `headers` object is
/// an error; callers that require headers treat it as a precondition failure.
pub fn load_headers(path: &Path) -> Result<BTreeMap<String, String>, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let file: HeadersFile = serde_json::from_str(&content)
        .map_err(|e| ConfigError::Headers(format!("{}: {}", path.display(), e)))?;
    Ok(file.headers)
}

/// Converts a header mapping into a reqwest `HeaderMap`
pub fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap, ConfigError> {
    let mut map = HeaderMap::with_capacity(headers.len());

    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ConfigError::Headers(format!("invalid header name '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ConfigError::Headers(format!("invalid value for '{}': {}", name, e)))?;
        map.insert(name, value);
    }

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_headers() {
        let file = write_file(r#"{"headers": {"User-Agent": "Mozilla/5.0", "Accept-Language": "en-US"}}"#);
        let headers = load_headers(file.path()).unwrap();

        assert_eq!(headers.len(), 2);
        assert_eq!(headers["User-Agent"], "Mozilla/5.0");
    }

    #[test]
    fn test_missing_headers_object() {
        let file = write_file(r#"{"User-Agent": "Mozilla/5.0"}"#);
        assert!(matches!(load_headers(file.path()), Err(ConfigError::Headers(_))));
    }

    #[test]
    fn test_malformed_json() {
        let file = write_file("{not json");
        assert!(load_headers(file.path()).is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = load_headers(Path::new("/nonexistent/headers.json"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_header_map() {
        let mut headers = BTreeMap::new();
        headers.insert("user-agent".to_string(), "TestAgent/1.0".to_string());
        let map = header_map(&headers).unwrap();
        assert_eq!(map.get("user-agent").unwrap(), "TestAgent/1.0");

        headers.insert("bad header".to_string(), "x".to_string());
        assert!(header_map(&headers).is_err());
    }
}
