//! Download jobs and their reports

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::utils::constants::UNKNOWN_PRODUCT_ID;
use crate::utils::image_extension;

/// Terminal result of one transfer attempt.
///
/// A transfer that reports no terminal state within the completion timeout
/// is assumed to have finished: the file keeps arriving in the background
/// and treating it as failed would only trigger a duplicate download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DownloadOutcome {
    Completed,
    Interrupted,
    AssumedCompleteOnTimeout,
}

impl DownloadOutcome {
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Completed | Self::AssumedCompleteOnTimeout)
    }
}

/// One image list to fetch for one product
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub urls: Vec<String>,
    pub is_main_set: bool,
    pub product_id: Option<String>,
    pub concurrency_limit: usize,
}

impl DownloadJob {
    #[must_use]
    pub fn new(
        urls: Vec<String>,
        is_main_set: bool,
        product_id: Option<String>,
        concurrency_limit: usize,
    ) -> Self {
        Self {
            urls,
            is_main_set,
            product_id,
            concurrency_limit,
        }
    }

    #[must_use]
    pub fn path_id(&self) -> &str {
        self.product_id.as_deref().unwrap_or(UNKNOWN_PRODUCT_ID)
    }

    /// `main` for gallery images, `image` for detail images
    #[must_use]
    pub fn file_prefix(&self) -> &'static str {
        if self.is_main_set { "main" } else { "image" }
    }

    /// Target path of the `index`-th (0-based) URL inside `dir`
    #[must_use]
    pub fn destination(&self, dir: &Path, index: usize, url: &str) -> PathBuf {
        dir.join(format!(
            "{}-{}.{}",
            self.file_prefix(),
            index + 1,
            image_extension(url)
        ))
    }
}

/// Aggregate result of a job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failed_urls: Vec<String>,
    /// Successes that never reported a terminal state
    pub assumed_complete: usize,
    pub saved_files: Vec<PathBuf>,
}
