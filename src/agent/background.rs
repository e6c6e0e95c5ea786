//! Background-side request handling
//!
//! Every [`BackgroundRequest`] runs on its own task. Image lists become a
//! [`DownloadJob`]; generated documents are written below the download root.
//! Progress and results go out as [`Outbound`] broadcasts.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};

use crate::config::CollectConfig;
use crate::download::{DownloadBackend, DownloadJob, DownloadOrchestrator, write_generated_file};
use crate::relay::{BackgroundRequest, MessageRelay, Outbound, Publisher};

pub struct BackgroundAgent<B> {
    orchestrator: Arc<DownloadOrchestrator<B>>,
    relay: Publisher,
    download_root: PathBuf,
    concurrency_limit: usize,
    jobs: JoinSet<()>,
}

impl<B: DownloadBackend + 'static> BackgroundAgent<B> {
    #[must_use]
    pub fn new(backend: B, config: &CollectConfig, relay: &MessageRelay) -> Self {
        Self {
            orchestrator: Arc::new(DownloadOrchestrator::new(backend, config)),
            relay: relay.publisher(),
            download_root: config.download_root().to_path_buf(),
            concurrency_limit: config.download().concurrency_limit,
            jobs: JoinSet::new(),
        }
    }

    /// Jobs spawned and not yet reaped
    #[must_use]
    pub fn running_jobs(&self) -> usize {
        self.jobs.len()
    }

    /// Serve requests until every sender is gone, then wait for the jobs
    /// still running
    pub async fn run(mut self, mut requests: mpsc::Receiver<BackgroundRequest>) {
        while self.step(&mut requests).await {}
        while let Some(joined) = self.jobs.join_next().await {
            reaped(joined);
        }
        log::debug!("Background agent stopped");
    }

    /// Take the next request or reap the next finished job, whichever comes
    /// first. Returns `false` once the request queue is closed.
    async fn step(&mut self, requests: &mut mpsc::Receiver<BackgroundRequest>) -> bool {
        tokio::select! {
            request = requests.recv() => match request {
                Some(request) => {
                    self.spawn(request);
                    true
                }
                None => false,
            },
            Some(joined) = self.jobs.join_next() => {
                reaped(joined);
                true
            }
        }
    }

    fn spawn(&mut self, request: BackgroundRequest) {
        let relay = self.relay.clone();
        match request {
            BackgroundRequest::DownloadImages {
                images,
                is_main,
                product_id,
            } => {
                let orchestrator = Arc::clone(&self.orchestrator);
                let job = DownloadJob::new(images, is_main, product_id, self.concurrency_limit);
                self.jobs.spawn(async move {
                    let progress_relay = relay.clone();
                    let report = orchestrator
                        .run(&job, move |progress| {
                            progress_relay.publish(Outbound::DownloadProgress { progress });
                        })
                        .await;
                    if report.failed > 0 {
                        relay.publish(Outbound::DownloadError {
                            error: format!(
                                "{} of {} images failed to download",
                                report.failed, report.total
                            ),
                        });
                    }
                    relay.publish(Outbound::DownloadFinished { report });
                });
            }
            BackgroundRequest::DownloadFile {
                content,
                filename,
                mime_type,
            } => {
                let root = self.download_root.clone();
                self.jobs.spawn(async move {
                    log::debug!("Saving {filename} ({mime_type})");
                    if let Err(e) = write_generated_file(&root, &filename, content.as_bytes()).await {
                        log::error!("Failed to save {filename}: {e:#}");
                        relay.publish(Outbound::DownloadError {
                            error: format!("Failed to save {filename}: {e}"),
                        });
                    }
                });
            }
        }
    }
}

fn reaped(joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        log::error!("Background job panicked: {e}");
    }
}
