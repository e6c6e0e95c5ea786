//! Core configuration types for product collection
//!
//! This module contains the main `CollectConfig` struct and the policy
//! structs handed to the individual components.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::utils::constants::{
    DEFAULT_BATCH_DELAY, DEFAULT_CONCURRENCY_LIMIT, DEFAULT_DETAIL_PACING,
    DEFAULT_DOWNLOAD_ROOT, DEFAULT_DOWNLOAD_TIMEOUT, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_RETRY_BACKOFF, DEFAULT_REVEAL_MAX_ATTEMPTS, DEFAULT_REVEAL_POLL_INTERVAL,
    DEFAULT_REVEAL_SETTLE, DEFAULT_REVEAL_TIMEOUT, DEFAULT_SKU_SETTLE, DEFAULT_SKU_THROTTLE,
};

/// Timing of the lazy-load reveal sequence for a single image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealPolicy {
    /// Wait after scrolling the element into view
    pub settle: Duration,
    /// Interval between source polls
    pub poll_interval: Duration,
    /// Maximum number of source polls
    pub max_attempts: u32,
    /// Hard cap on the whole poll phase
    pub timeout: Duration,
}

impl Default for RevealPolicy {
    fn default() -> Self {
        Self {
            settle: DEFAULT_REVEAL_SETTLE,
            poll_interval: DEFAULT_REVEAL_POLL_INTERVAL,
            max_attempts: DEFAULT_REVEAL_MAX_ATTEMPTS,
            timeout: DEFAULT_REVEAL_TIMEOUT,
        }
    }
}

/// Delays used while walking SKU variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkuTiming {
    /// Wait for the price to re-render after a click
    pub settle: Duration,
    /// Extra delay between two variant clicks
    pub throttle: Duration,
}

impl Default for SkuTiming {
    fn default() -> Self {
        Self {
            settle: DEFAULT_SKU_SETTLE,
            throttle: DEFAULT_SKU_THROTTLE,
        }
    }
}

/// Batching and retry policy of the download orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadPolicy {
    /// Downloads in flight per batch
    pub concurrency_limit: usize,
    /// Attempts per URL, first attempt included
    pub max_attempts: u32,
    /// Backoff unit; attempt `n` is followed by a `n * retry_backoff` pause
    pub retry_backoff: Duration,
    /// Pause between two batches
    pub batch_delay: Duration,
    /// Wait for a terminal transfer state before assuming completion
    pub completion_timeout: Duration,
}

impl Default for DownloadPolicy {
    fn default() -> Self {
        Self {
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            batch_delay: DEFAULT_BATCH_DELAY,
            completion_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
        }
    }
}

/// Main configuration struct for collection runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectConfig {
    /// Root directory for images, product records and generated documents.
    pub(crate) download_root: PathBuf,

    /// Run Chromium without a window
    pub(crate) headless: bool,

    /// Chrome user data directory; a per-process temp dir when unset
    pub(crate) chrome_data_dir: Option<PathBuf>,

    /// Timeout in seconds for opening the product page
    ///
    /// Default: 30 seconds
    pub(crate) page_load_timeout_secs: u64,

    /// Base URL the detail images are re-hosted under.
    ///
    /// When set, the generated parameters document lists
    /// `{base}/{product_id}/detail/image-{n}.webp` for every detail image.
    pub(crate) detail_image_cdn: Option<String>,

    pub(crate) reveal: RevealPolicy,
    pub(crate) detail_pacing: Duration,
    pub(crate) sku: SkuTiming,
    pub(crate) download: DownloadPolicy,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            download_root: PathBuf::from(DEFAULT_DOWNLOAD_ROOT),
            headless: true,
            chrome_data_dir: None,
            page_load_timeout_secs: 30,
            detail_image_cdn: None,
            reveal: RevealPolicy::default(),
            detail_pacing: DEFAULT_DETAIL_PACING,
            sku: SkuTiming::default(),
            download: DownloadPolicy::default(),
        }
    }
}

impl CollectConfig {
    /// Reject limits that would stall a run
    pub fn validate(&self) -> Result<()> {
        if self.download.concurrency_limit == 0 {
            bail!("concurrency_limit must be at least 1");
        }
        if self.download.max_attempts == 0 {
            bail!("max_attempts must be at least 1");
        }
        if self.reveal.max_attempts == 0 {
            bail!("reveal max_attempts must be at least 1");
        }
        Ok(())
    }
}
