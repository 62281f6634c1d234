//! Image fetcher
//!
//! Downloads one product image to disk. The fetcher never returns an error:
//! every failure is logged and reported as an `ImageOutcome` so a broken
//! image can never fail the record it belongs to.

use crate::url::normalize_image_url;
use futures_util::StreamExt;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufWriter};

/// Size of the buffered writes to disk
const CHUNK_SIZE: usize = 8192;

/// Result of a single image fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    /// No image URL was given
    NoUrl,

    /// A file already exists at the destination; no request was made
    AlreadyPresent,

    /// The image was written to disk
    Downloaded {
        /// Bytes written
        bytes: u64,
    },

    /// The URL is neither absolute HTTP(S) nor protocol-relative
    Rejected,

    /// Network, HTTP status or IO failure
    Failed(String),
}

/// Downloads product images with skip-if-exists semantics
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    client: Client,
    timeout: Duration,
}

impl ImageFetcher {
    /// Creates a fetcher that applies `timeout` to every image request
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Downloads `url` to `dest`
    ///
    /// # Behavior
    ///
    /// | Condition | Outcome |
    /// |-----------|---------|
    /// | `url` absent or empty | `NoUrl` |
    /// | file exists at `dest` | `AlreadyPresent`, no request |
    /// | URL not http(s) or `//` | `Rejected` |
    /// | request, status or write error | `Failed` |
    ///
    /// An existing file is never refreshed, even if it is stale.
    pub async fn fetch(&self, url: Option<&str>, dest: &Path) -> ImageOutcome {
        let url = match url.map(str::trim) {
            Some(u) if !u.is_empty() => u,
            _ => {
                tracing::debug!("No image URL for {}", dest.display());
                return ImageOutcome::NoUrl;
            }
        };

        if tokio::fs::try_exists(dest).await.unwrap_or(false) {
            return ImageOutcome::AlreadyPresent;
        }

        let url = match normalize_image_url(url) {
            Ok(u) => u,
            Err(e) => {
                tracing::warn!("Skipping download for invalid image URL: {}", e);
                return ImageOutcome::Rejected;
            }
        };

        match self.download(&url, dest).await {
            Ok(bytes) => {
                tracing::debug!("Downloaded {} ({} bytes) to {}", url, bytes, dest.display());
                ImageOutcome::Downloaded { bytes }
            }
            Err(e) => {
                tracing::warn!("Failed to download image {}: {}", url, e);
                ImageOutcome::Failed(e)
            }
        }
    }

    /// Streams the response body to `dest` in buffered chunks
    async fn download(&self, url: &str, dest: &Path) -> Result<u64, String> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| e.to_string())?;

        let file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| format!("cannot create {}: {}", dest.display(), e))?;

        match write_body(response, BufWriter::with_capacity(CHUNK_SIZE, file)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                // A truncated file would otherwise short-circuit every later run.
                let _ = tokio::fs::remove_file(dest).await;
                Err(e)
            }
        }
    }
}

async fn write_body(
    response: reqwest::Response,
    mut writer: BufWriter<tokio::fs::File>,
) -> Result<u64, String> {
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| e.to_string())?;
        writer.write_all(&chunk).await.map_err(|e| e.to_string())?;
        bytes_written += chunk.len() as u64;
    }

    writer.flush().await.map_err(|e| e.to_string())?;
    Ok(bytes_written)
}
