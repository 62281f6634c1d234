//! Filesystem-safe names for downloaded images

use crate::config::ImageNaming;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Upper bound for a generated file name, extension included
pub const MAX_FILE_LENGTH: usize = 100;

/// Room reserved for the extension
const EXTENSION_RESERVE: usize = 5;

/// Characters rejected by at least one common filesystem
const ILLEGAL_CHARS: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// Extension used for every downloaded image
const IMAGE_EXTENSION: &str = "jpg";

/// Hex characters of the URL digest appended by `ImageNaming::TitleHash`
const HASH_LEN: usize = 8;

/// Turns arbitrary text into a path segment of at most
/// `MAX_FILE_LENGTH - 5` characters
///
/// Illegal characters are removed, every whitespace run becomes a single
/// underscore, and the result is truncated. May return an empty string.
///
/// # Examples
///
/// ```
/// use catalog_crawler::download::sanitize_filename;
///
/// assert_eq!(sanitize_filename("HP 15\" Laptop: i5 / 8GB"), "HP_15_Laptop_i5_8GB");
/// ```
pub fn sanitize_filename(text: &str) -> String {
    let limit = MAX_FILE_LENGTH - EXTENSION_RESERVE;
    let mut out = String::with_capacity(text.len().min(limit));
    let mut count = 0;
    let mut in_whitespace = false;

    for c in text.chars() {
        if count >= limit {
            break;
        }

        if ILLEGAL_CHARS.contains(&c) {
            continue;
        }

        if c.is_whitespace() {
            if !in_whitespace {
                out.push('_');
                count += 1;
                in_whitespace = true;
            }
            continue;
        }

        in_whitespace = false;
        out.push(c);
        count += 1;
    }

    out
}

/// Computes the local image path for a product
///
/// With `ImageNaming::Title` two titles that sanitize identically share one
/// file, and whichever download lands first wins.
pub fn image_path(dir: &Path, title: &str, source_url: &str, naming: ImageNaming) -> PathBuf {
    let stem = match naming {
        ImageNaming::Title => sanitize_filename(title),
        ImageNaming::TitleHash => {
            let digest = hex::encode(Sha256::digest(source_url.as_bytes()));
            let budget = MAX_FILE_LENGTH - EXTENSION_RESERVE - HASH_LEN - 1;
            let title_part: String = sanitize_filename(title).chars().take(budget).collect();
            format!("{}_{}", title_part, &digest[..HASH_LEN])
        }
    };

    dir.join(format!("{}.{}", stem, IMAGE_EXTENSION))
}
