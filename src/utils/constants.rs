//! Shared configuration constants for tmall_collect
//!
//! This module contains default values, page markers and selectors used
//! throughout the codebase to ensure consistency and avoid magic numbers.

use std::time::Duration;

/// Default number of downloads in flight per batch
///
/// Kept low on purpose: the image CDN throttles aggressive clients and the
/// storage layer serializes writes anyway.
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 2;

/// Attempts per URL before it is recorded as failed
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Linear backoff unit: attempt `n` waits `n * DEFAULT_RETRY_BACKOFF` before retrying
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// Pause between consecutive batches
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_secs(1);

/// How long to wait for a terminal transfer state before assuming completion
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// TCP connect limit of the image HTTP client
pub const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Whole-request limit of the image HTTP client, body included
pub const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Settle delay after scrolling a lazy image into view
pub const DEFAULT_REVEAL_SETTLE: Duration = Duration::from_millis(200);

/// Poll interval while waiting for a lazy image source
pub const DEFAULT_REVEAL_POLL_INTERVAL: Duration = Duration::from_millis(300);

/// Maximum polls while waiting for a lazy image source
pub const DEFAULT_REVEAL_MAX_ATTEMPTS: u32 = 10;

/// Hard cap on a single reveal
pub const DEFAULT_REVEAL_TIMEOUT: Duration = Duration::from_secs(3);

/// Pacing delay between detail images
pub const DEFAULT_DETAIL_PACING: Duration = Duration::from_millis(200);

/// Wait for the price to re-render after selecting a variant
pub const DEFAULT_SKU_SETTLE: Duration = Duration::from_millis(900);

/// Throttle between variant clicks
pub const DEFAULT_SKU_THROTTLE: Duration = Duration::from_millis(300);

/// Default root for everything written to disk
pub const DEFAULT_DOWNLOAD_ROOT: &str = "tmall-downloads";

/// Product id used in paths when none could be collected
pub const UNKNOWN_PRODUCT_ID: &str = "0";

/// Longest title kept, in characters
pub const TITLE_MAX_CHARS: usize = 50;

/// Marketplace suffix appended to every product page title
pub const TITLE_MARKETPLACE_SUFFIX: &str = "-tmall.com天猫";

/// 1x1 separator image used between detail images
pub const SEPARATOR_SENTINEL_URL: &str = "https://g.alicdn.com/s.gif";

// Page markers. The markup uses hashed CSS-module class names, so every
// selector matches on a stable class-name fragment.

pub const VIDEO_SELECTOR: &str = "video";
pub const VIDEO_SOURCE_SELECTOR: &str = "source";
pub const THUMBNAILS_SELECTOR: &str = "ul[class*=\"thumbnails\"]";
pub const THUMBNAIL_ITEM_SELECTOR: &str = "li";
pub const IMG_SELECTOR: &str = "img";
pub const DETAIL_IMAGE_SELECTOR: &str = "img.descV8-singleImage-image.lazyload";
pub const PARAMETERS_SELECTOR: &str = "div[class*=\"baseDropsInfo\"]";
pub const ITEM_ID_SELECTOR: &str = "[data-item-id]";
pub const SCRIPT_SELECTOR: &str = "script";
pub const VARIANT_SELECTOR: &str = "div[class*=\"valueItem\"]";
pub const VARIANT_LABEL_SELECTOR: &str = "span[title]";
pub const PRICE_SELECTOR: &str = "div[class*=\"MiniPrice\"] span[class*=\"priceText\"]";

/// Class fragment flagging a variant that cannot be selected
pub const DISABLED_CLASS_MARKER: &str = "isDisabled";

/// Class fragment flagging the currently selected variant
pub const SELECTED_CLASS_MARKER: &str = "isSelected";

/// Label of the binary "button switch" option
pub const TOGGLE_SWITCH_LABEL: &str = "按钮开关";

/// Chrome user agent string for stealth mode
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";
