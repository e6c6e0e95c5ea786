//! URL helpers for product pages and download destinations.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static ITEM_PATH_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/(\d+)\.htm").expect("static regex")
});

static IMAGE_EXTENSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\.(jpg|jpeg|png|webp|gif)$").expect("static regex")
});

/// Check if a URL is a fetchable http(s) URL
#[must_use]
pub fn is_valid_url(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }

    if url.starts_with("data:") || url.starts_with("javascript:") || url.starts_with("mailto:") {
        return false;
    }

    match Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

/// Product detail pages are served under `/item.htm`
#[must_use]
pub fn is_product_page(url: &str) -> bool {
    url.contains("/item.htm")
}

/// Product id carried by the page URL itself.
///
/// The `id` query parameter wins; otherwise a numeric path segment right
/// before `.htm` (e.g. `/item/612345.htm`) is used.
#[must_use]
pub fn product_id_from_url(page_url: &str) -> Option<String> {
    let parsed = Url::parse(page_url).ok()?;

    if let Some((_, id)) = parsed.query_pairs().find(|(k, _)| k == "id")
        && !id.is_empty()
    {
        return Some(id.into_owned());
    }

    ITEM_PATH_ID
        .captures(parsed.path())
        .map(|caps| caps[1].to_string())
}

/// File extension for a downloaded image, derived from the URL path.
///
/// Only well-known image extensions are accepted; everything else,
/// including unparseable URLs, falls back to `jpg`.
#[must_use]
pub fn image_extension(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            let path = u.path().to_lowercase();
            IMAGE_EXTENSION.captures(&path).map(|c| c[1].to_string())
        })
        .unwrap_or_else(|| "jpg".to_string())
}
