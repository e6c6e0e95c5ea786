//! Storage backends that carry out single transfers

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use futures::StreamExt;
use reqwest::Client;
use reqwest::header::ACCEPT;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::oneshot;

use super::job::DownloadOutcome;
use super::storage::create_unique;
use crate::error::DownloadError;
use crate::utils::constants::{CHROME_USER_AGENT, HTTP_CONNECT_TIMEOUT, HTTP_REQUEST_TIMEOUT};

/// Terminal state a transfer reports on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Complete,
    Interrupted,
}

/// A started transfer
#[derive(Debug)]
pub struct TransferHandle {
    pub path: PathBuf,
    terminal: oneshot::Receiver<TransferState>,
}

impl TransferHandle {
    /// Handle for a transfer writing to `path`, plus the sender the transfer
    /// reports its terminal state through
    #[must_use]
    pub fn channel(path: PathBuf) -> (Self, oneshot::Sender<TransferState>) {
        let (tx, rx) = oneshot::channel();
        (Self { path, terminal: rx }, tx)
    }

    /// Wait up to `timeout` for a terminal state.
    ///
    /// A transfer whose reporter went away without a state counts as
    /// interrupted; one that stays silent past the timeout is assumed done.
    pub async fn outcome(self, timeout: Duration) -> DownloadOutcome {
        match tokio::time::timeout(timeout, self.terminal).await {
            Ok(Ok(TransferState::Complete)) => DownloadOutcome::Completed,
            Ok(Ok(TransferState::Interrupted)) | Ok(Err(_)) => DownloadOutcome::Interrupted,
            Err(_) => DownloadOutcome::AssumedCompleteOnTimeout,
        }
    }
}

/// Starts transfers; completion is reported through the returned handle
pub trait DownloadBackend: Send + Sync {
    fn start(
        &self,
        url: &str,
        destination: &Path,
    ) -> impl Future<Output = Result<TransferHandle, DownloadError>> + Send;
}

impl<B: DownloadBackend> DownloadBackend for Arc<B> {
    fn start(
        &self,
        url: &str,
        destination: &Path,
    ) -> impl Future<Output = Result<TransferHandle, DownloadError>> + Send {
        (**self).start(url, destination)
    }
}

/// Streams images over HTTP straight into their destination file
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    pub fn new() -> Result<Self, DownloadError> {
        let client = Client::builder()
            .user_agent(CHROME_USER_AGENT)
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .timeout(HTTP_REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }

    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl DownloadBackend for HttpDownloader {
    fn start(
        &self,
        url: &str,
        destination: &Path,
    ) -> impl Future<Output = Result<TransferHandle, DownloadError>> + Send {
        let client = self.client.clone();
        let url = url.to_string();
        let destination = destination.to_path_buf();

        async move {
            if !url.starts_with("http") {
                return Err(DownloadError::InvalidUrl(url));
            }

            let response = client
                .get(&url)
                .header(ACCEPT, "image/avif,image/webp,image/apng,image/*,*/*;q=0.8")
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(DownloadError::Status(response.status().as_u16()));
            }

            let (path, file) =
                create_unique(&destination)
                    .await
                    .map_err(|source| DownloadError::Write {
                        path: destination.display().to_string(),
                        source,
                    })?;

            let (handle, reporter) = TransferHandle::channel(path.clone());
            tokio::spawn(async move {
                let state = match stream_to_file(response, file).await {
                    Ok(bytes) => {
                        log::debug!("Saved {} ({bytes} bytes)", path.display());
                        TransferState::Complete
                    }
                    Err(e) => {
                        log::warn!("Transfer to {} interrupted: {e:#}", path.display());
                        if let Err(e) = tokio::fs::remove_file(&path).await {
                            log::debug!("Could not remove partial file {}: {e}", path.display());
                        }
                        TransferState::Interrupted
                    }
                };
                // The waiter may already have given up
                let _ = reporter.send(state);
            });

            Ok(handle)
        }
    }
}

async fn stream_to_file(response: reqwest::Response, mut file: File) -> anyhow::Result<u64> {
    let mut stream = response.bytes_stream();
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("Failed to read image chunk")?;
        file.write_all(&chunk)
            .await
            .context("Failed to write image chunk")?;
        written += chunk.len() as u64;
    }
    file.flush().await.context("Failed to flush image file")?;
    Ok(written)
}
