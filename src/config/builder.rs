//! Type-safe builder for `CollectConfig` using the typestate pattern
//!
//! The download root is the only required field; `build()` is available only
//! once it has been set.

use anyhow::{Result, anyhow};
use std::marker::PhantomData;
use std::path::PathBuf;
use std::time::Duration;

use super::types::{CollectConfig, DownloadPolicy, RevealPolicy, SkuTiming};

// Type states for the builder
pub struct WithDownloadRoot;

pub struct CollectConfigBuilder<State = ()> {
    pub(crate) download_root: Option<PathBuf>,
    pub(crate) headless: bool,
    pub(crate) chrome_data_dir: Option<PathBuf>,
    pub(crate) page_load_timeout_secs: u64,
    pub(crate) detail_image_cdn: Option<String>,
    pub(crate) reveal: RevealPolicy,
    pub(crate) detail_pacing: Duration,
    pub(crate) sku: SkuTiming,
    pub(crate) download: DownloadPolicy,
    pub(crate) _phantom: PhantomData<State>,
}

impl Default for CollectConfigBuilder<()> {
    fn default() -> Self {
        let defaults = CollectConfig::default();
        Self {
            download_root: None,
            headless: defaults.headless,
            chrome_data_dir: None,
            page_load_timeout_secs: defaults.page_load_timeout_secs,
            detail_image_cdn: None,
            reveal: defaults.reveal,
            detail_pacing: defaults.detail_pacing,
            sku: defaults.sku,
            download: defaults.download,
            _phantom: PhantomData,
        }
    }
}

impl CollectConfig {
    /// Create a builder for configuring a `CollectConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> CollectConfigBuilder<()> {
        CollectConfigBuilder::default()
    }
}

impl CollectConfigBuilder<()> {
    pub fn download_root(self, dir: impl Into<PathBuf>) -> CollectConfigBuilder<WithDownloadRoot> {
        CollectConfigBuilder {
            download_root: Some(dir.into()),
            headless: self.headless,
            chrome_data_dir: self.chrome_data_dir,
            page_load_timeout_secs: self.page_load_timeout_secs,
            detail_image_cdn: self.detail_image_cdn,
            reveal: self.reveal,
            detail_pacing: self.detail_pacing,
            sku: self.sku,
            download: self.download,
            _phantom: PhantomData,
        }
    }
}

// Build method only available when all required fields are set
impl CollectConfigBuilder<WithDownloadRoot> {
    pub fn build(self) -> Result<CollectConfig> {
        let detail_image_cdn = self
            .detail_image_cdn
            .map(|base| base.trim_end_matches('/').to_string())
            .filter(|base| !base.is_empty());

        let config = CollectConfig {
            download_root: self
                .download_root
                .ok_or_else(|| anyhow!("download_root is required"))?,
            headless: self.headless,
            chrome_data_dir: self.chrome_data_dir,
            page_load_timeout_secs: self.page_load_timeout_secs,
            detail_image_cdn,
            reveal: self.reveal,
            detail_pacing: self.detail_pacing,
            sku: self.sku,
            download: self.download,
        };
        config.validate()?;
        Ok(config)
    }
}

// Builder methods available at any state
impl<State> CollectConfigBuilder<State> {
    /// Set browser headless mode (visible vs invisible browser window)
    ///
    /// Headed mode is handy when a login or slider captcha has to be solved by
    /// hand before collection starts.
    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    #[must_use]
    pub fn chrome_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.chrome_data_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn page_load_timeout_secs(mut self, secs: u64) -> Self {
        self.page_load_timeout_secs = secs;
        self
    }

    /// Base URL used for the image stack of the parameters document
    ///
    /// # Example
    /// ```rust
    /// # use tmall_collect::config::CollectConfig;
    /// # fn main() -> anyhow::Result<()> {
    /// let config = CollectConfig::builder()
    ///     .download_root("./tmall-downloads")
    ///     .detail_image_cdn("https://cdn.example.com/")
    ///     .build()?;
    /// assert_eq!(config.detail_image_cdn(), Some("https://cdn.example.com"));
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn detail_image_cdn(mut self, base: impl Into<String>) -> Self {
        self.detail_image_cdn = Some(base.into());
        self
    }

    #[must_use]
    pub fn reveal_policy(mut self, policy: RevealPolicy) -> Self {
        self.reveal = policy;
        self
    }

    #[must_use]
    pub fn detail_pacing(mut self, pacing: Duration) -> Self {
        self.detail_pacing = pacing;
        self
    }

    #[must_use]
    pub fn sku_timing(mut self, timing: SkuTiming) -> Self {
        self.sku = timing;
        self
    }

    #[must_use]
    pub fn download_policy(mut self, policy: DownloadPolicy) -> Self {
        self.download = policy;
        self
    }

    /// Downloads in flight per batch (default: 2)
    #[must_use]
    pub fn concurrency_limit(mut self, limit: usize) -> Self {
        self.download.concurrency_limit = limit;
        self
    }

    /// Attempts per URL including the first one (default: 3)
    #[must_use]
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.download.max_attempts = attempts;
        self
    }
}
