//! Batched download of a product's image list
//!
//! The list is cut into batches of `concurrency_limit` URLs. A batch is
//! awaited as a whole, progress is reported, and the next batch starts after
//! a short pause. Every URL gets a bounded number of attempts with a linearly
//! growing pause in between; a URL that exhausts its attempts is recorded as
//! failed and the job carries on.

use std::path::{Path, PathBuf};

use futures::future::join_all;

use super::backend::DownloadBackend;
use super::job::{DownloadJob, DownloadOutcome, DownloadReport};
use crate::config::{CollectConfig, DownloadPolicy};
use crate::error::DownloadError;

/// How a single URL ended up
#[derive(Debug)]
enum ItemResult {
    Saved {
        path: PathBuf,
        outcome: DownloadOutcome,
    },
    Failed {
        url: String,
        reason: String,
    },
}

pub struct DownloadOrchestrator<B> {
    backend: B,
    download_root: PathBuf,
    policy: DownloadPolicy,
}

impl<B: DownloadBackend> DownloadOrchestrator<B> {
    #[must_use]
    pub fn new(backend: B, config: &CollectConfig) -> Self {
        Self {
            backend,
            download_root: config.download_root().to_path_buf(),
            policy: config.download(),
        }
    }

    #[must_use]
    pub fn with_policy(backend: B, download_root: impl Into<PathBuf>, policy: DownloadPolicy) -> Self {
        Self {
            backend,
            download_root: download_root.into(),
            policy,
        }
    }

    /// Directory the job's files go to
    #[must_use]
    pub fn job_dir(&self, job: &DownloadJob) -> PathBuf {
        let product_dir = self.download_root.join(job.path_id());
        if job.is_main_set {
            product_dir
        } else {
            product_dir.join("detail")
        }
    }

    /// Run `job` to completion.
    ///
    /// `on_progress` receives the completed percentage after every batch and
    /// a final 100 once the job is done, even for an empty list.
    pub async fn run<F>(&self, job: &DownloadJob, mut on_progress: F) -> DownloadReport
    where
        F: FnMut(f64) + Send,
    {
        let total = job.urls.len();
        let batch_size = job.concurrency_limit.max(1);
        let dir = self.job_dir(job);
        let mut report = DownloadReport {
            total,
            ..DownloadReport::default()
        };

        log::info!(
            "Downloading {total} images to {} ({batch_size} at a time)",
            dir.display()
        );

        let mut processed = 0;
        for (batch_index, batch) in job.urls.chunks(batch_size).enumerate() {
            let offset = batch_index * batch_size;
            let attempts = batch.iter().enumerate().map(|(i, url)| {
                let destination = job.destination(&dir, offset + i, url);
                async move { self.fetch_with_retry(url, destination).await }
            });

            for result in join_all(attempts).await {
                match result {
                    ItemResult::Saved { path, outcome } => {
                        report.succeeded += 1;
                        if outcome == DownloadOutcome::AssumedCompleteOnTimeout {
                            report.assumed_complete += 1;
                        }
                        report.saved_files.push(path);
                    }
                    ItemResult::Failed { url, reason } => {
                        log::error!("Giving up on {url}: {reason}");
                        report.failed += 1;
                        report.failed_urls.push(url);
                    }
                }
            }

            processed += batch.len();
            on_progress(((processed as f64 / total as f64) * 100.0).min(100.0));

            if processed < total {
                tokio::time::sleep(self.policy.batch_delay).await;
            }
        }

        log::info!(
            "Download finished: {} succeeded, {} failed",
            report.succeeded,
            report.failed
        );
        on_progress(100.0);
        report
    }

    async fn fetch_with_retry(&self, url: &str, destination: PathBuf) -> ItemResult {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut reason = String::new();

        for attempt in 1..=max_attempts {
            log::debug!("Attempt {attempt}/{max_attempts} for {url}");
            match self.fetch_once(url, &destination).await {
                Ok((path, outcome)) if outcome.is_success() => {
                    return ItemResult::Saved { path, outcome };
                }
                Ok((_, outcome)) => reason = format!("transfer ended as {outcome:?}"),
                Err(DownloadError::InvalidUrl(bad)) => {
                    return ItemResult::Failed {
                        url: url.to_string(),
                        reason: format!("invalid image URL {bad}"),
                    };
                }
                Err(e) => reason = e.to_string(),
            }

            log::warn!("Attempt {attempt} for {url} failed: {reason}");
            if attempt < max_attempts {
                tokio::time::sleep(self.policy.retry_backoff * attempt).await;
            }
        }

        ItemResult::Failed {
            url: url.to_string(),
            reason,
        }
    }

    async fn fetch_once(
        &self,
        url: &str,
        destination: &Path,
    ) -> Result<(PathBuf, DownloadOutcome), DownloadError> {
        let limit = self.policy.completion_timeout;
        let handle = tokio::time::timeout(limit, self.backend.start(url, destination))
            .await
            .map_err(|_| DownloadError::NoResponse(limit))??;
        let path = handle.path.clone();
        let outcome = handle.outcome(self.policy.completion_timeout).await;
        Ok((path, outcome))
    }
}
