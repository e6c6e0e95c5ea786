//! Getter methods for `CollectConfig`

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::types::{CollectConfig, DownloadPolicy, RevealPolicy, SkuTiming};

impl CollectConfig {
    #[must_use]
    pub fn download_root(&self) -> &Path {
        &self.download_root
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }

    /// Get the Chrome user data directory if configured
    #[must_use]
    pub fn chrome_data_dir(&self) -> Option<&PathBuf> {
        self.chrome_data_dir.as_ref()
    }

    #[must_use]
    pub fn page_load_timeout_secs(&self) -> u64 {
        self.page_load_timeout_secs
    }

    #[must_use]
    pub fn detail_image_cdn(&self) -> Option<&str> {
        self.detail_image_cdn.as_deref()
    }

    #[must_use]
    pub fn reveal(&self) -> RevealPolicy {
        self.reveal
    }

    #[must_use]
    pub fn detail_pacing(&self) -> Duration {
        self.detail_pacing
    }

    #[must_use]
    pub fn sku(&self) -> SkuTiming {
        self.sku
    }

    #[must_use]
    pub fn download(&self) -> DownloadPolicy {
        self.download
    }
}
