//! Image URL resolution
//!
//! Pulls a usable source out of an `<img>` element, makes it absolute and
//! strips the CDN resize suffixes so the original asset is fetched.
//!
//! Alibaba's CDN encodes resize and re-encode requests in the file name:
//! `O1CN01x.jpg_q50.jpg_.webp`, `a_200x200.jpg_.webp`, `b_960x960q90.jpg_.webp`
//! and so on. Suffixes are removed repeatedly until the path stops changing,
//! which makes [`ImageUrlResolver::normalize`] idempotent.

use std::collections::HashSet;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::page::ProductPage;

/// Lazy-loading attributes, checked in order after the rendered `src`
pub const LAZY_SOURCE_ATTRIBUTES: [&str; 6] = [
    "data-src",
    "data-original",
    "data-lazy-src",
    "data-url",
    "data-img",
    "data-image",
];

/// Base for relative sources when the page URL is unusable
static MARKETPLACE_BASE: Lazy<Url> =
    Lazy::new(|| Url::parse("https://detail.tmall.com/").expect("static URL"));

/// Shortest string accepted as an image URL
const MIN_CANDIDATE_LEN: usize = 10;

const REJECTED_FRAGMENTS: [&str; 3] = ["data:image", "placeholder", "loading"];

static SIZE_SUFFIX_RULES: Lazy<Vec<Regex>> = Lazy::new(|| {
    const EXT: &str = "(jpe?g|png|webp|gif)";
    [
        format!(r"(?i)_\d+x\d+q\d+\.{EXT}_\.{EXT}$"),
        format!(r"(?i)_q\d+\.{EXT}_\.{EXT}$"),
        format!(r"(?i)_\d+x\d+\.{EXT}_\.{EXT}$"),
        format!(r"(?i)_\d+x\d+\.{EXT}$"),
        format!(r"(?i)_\d+\.{EXT}$"),
        format!(r"(?i)\.{EXT}_\.{EXT}$"),
        format!(r"(?i)\.{EXT}\.{EXT}$"),
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("static regex"))
    .collect()
});

/// Whether a raw attribute value can be an image URL at all
#[must_use]
pub fn is_valid_candidate(candidate: &str) -> bool {
    candidate.chars().count() >= MIN_CANDIDATE_LEN
        && !REJECTED_FRAGMENTS
            .iter()
            .any(|fragment| candidate.contains(fragment))
}

/// Remove CDN resize suffixes from a URL path until none applies
#[must_use]
pub fn strip_size_suffixes(path: &str) -> String {
    let mut current = path.to_string();
    loop {
        let stripped = SIZE_SUFFIX_RULES
            .iter()
            .fold(current.clone(), |acc, rule| {
                rule.replace(&acc, ".$1").into_owned()
            });
        if stripped == current {
            return current;
        }
        current = stripped;
    }
}

/// Candidate sources in priority order: rendered `src`, the known lazy
/// attributes, then any other `data-*` attribute whose name mentions
/// `src`, `url` or `img`.
#[must_use]
pub fn candidate_sources(rendered_src: Option<String>, attributes: &[(String, String)]) -> Vec<String> {
    let lookup = |name: &str| {
        attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.clone())
    };

    let mut candidates: Vec<String> = rendered_src.into_iter().chain(lookup("src")).collect();
    candidates.extend(LAZY_SOURCE_ATTRIBUTES.iter().filter_map(|name| lookup(name)));
    candidates.extend(attributes.iter().filter_map(|(key, value)| {
        let key = key.to_ascii_lowercase();
        let is_other_data = key.starts_with("data-")
            && !LAZY_SOURCE_ATTRIBUTES.contains(&key.as_str())
            && ["src", "url", "img"].iter().any(|hint| key[5..].contains(hint));
        is_other_data.then(|| value.clone())
    }));
    candidates
}

/// Resolves image sources relative to one product page
#[derive(Debug, Clone)]
pub struct ImageUrlResolver {
    page_url: Url,
}

impl ImageUrlResolver {
    pub fn new(page_url: &str) -> Result<Self> {
        let page_url =
            Url::parse(page_url).with_context(|| format!("Invalid page URL: {page_url}"))?;
        Ok(Self { page_url })
    }

    /// Resolver for a page whose URL is unknown
    #[must_use]
    pub fn marketplace_default() -> Self {
        Self {
            page_url: MARKETPLACE_BASE.clone(),
        }
    }

    #[must_use]
    pub fn page_url(&self) -> &Url {
        &self.page_url
    }

    /// Make `raw` absolute without touching the file name
    #[must_use]
    pub fn absolutize(&self, raw: &str) -> Option<Url> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        let absolute = if let Some(rest) = raw.strip_prefix("//") {
            Url::parse(&format!("https://{rest}"))
        } else if raw.starts_with('/') {
            Url::parse(&format!(
                "{}{raw}",
                self.page_url.origin().ascii_serialization()
            ))
        } else if raw.starts_with("http://") || raw.starts_with("https://") {
            Url::parse(raw)
        } else {
            self.page_url.join(raw)
        };
        absolute.ok()
    }

    /// Absolute URL of the original asset behind `raw`
    #[must_use]
    pub fn normalize(&self, raw: &str) -> Option<String> {
        let mut url = self.absolutize(raw)?;
        let path = strip_size_suffixes(url.path());
        url.set_path(&path);
        Some(url.to_string())
    }

    /// First valid candidate source of `img`, normalized
    pub async fn resolve<P: ProductPage>(&self, page: &P, img: &P::Element) -> Result<Option<String>> {
        let rendered = page.rendered_src(img).await?;
        let attributes = page.attributes(img).await?;
        Ok(candidate_sources(rendered, &attributes)
            .iter()
            .find(|candidate| is_valid_candidate(candidate))
            .and_then(|candidate| self.normalize(candidate)))
    }
}

/// Insertion-ordered set of URLs
#[derive(Debug, Default, Clone)]
pub struct UrlSet {
    seen: HashSet<String>,
    ordered: Vec<String>,
}

impl UrlSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `url`; returns `false` if it was already present
    pub fn insert(&mut self, url: String) -> bool {
        if self.seen.contains(&url) {
            return false;
        }
        self.seen.insert(url.clone());
        self.ordered.push(url);
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        self.ordered
    }
}
