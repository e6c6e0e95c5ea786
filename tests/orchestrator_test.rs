//! Batching, retry and progress behaviour of the download orchestrator

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tmall_collect::config::DownloadPolicy;
use tmall_collect::download::{DownloadJob, DownloadOrchestrator};
use tokio::time::Instant;

mod common;
use common::*;

fn urls(n: usize) -> Vec<String> {
    (1..=n)
        .map(|i| format!("https://img.alicdn.com/imgextra/p{i}.jpg"))
        .collect()
}

/// `at` lies within a few milliseconds after `start + offset`
fn assert_at(at: Instant, start: Instant, offset: Duration) {
    let elapsed = at - start;
    assert!(
        elapsed >= offset && elapsed < offset + Duration::from_millis(50),
        "expected ~{offset:?}, got {elapsed:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn failing_url_is_reported_and_the_rest_saved() {
    let urls = urls(5);
    let backend = Arc::new(ScriptedBackend::new().script(&urls[2], Script::Reject));
    let orchestrator =
        DownloadOrchestrator::with_policy(Arc::clone(&backend), "/downloads", policy(2));
    let job = DownloadJob::new(urls.clone(), true, Some("612345".to_string()), 2);

    let progress = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&progress);
    let report = orchestrator
        .run(&job, move |p| seen.lock().unwrap().push(p))
        .await;

    assert_eq!(report.total, 5);
    assert_eq!(report.succeeded, 4);
    assert_eq!(report.failed, 1);
    assert_eq!(report.failed_urls, vec![urls[2].clone()]);
    assert_eq!(report.saved_files.len(), 4);
    assert_eq!(backend.starts_of(&urls[2]).len(), 3);

    let progress = progress.lock().unwrap().clone();
    assert_eq!(progress, vec![40.0, 80.0, 100.0, 100.0]);
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test(start_paused = true)]
async fn batches_start_together_and_wait_for_each_other() {
    let urls = urls(5);
    let backend = Arc::new(
        ScriptedBackend::new()
            .script(&urls[0], Script::Complete(Duration::from_secs(5)))
            .script(&urls[1], Script::Complete(Duration::from_millis(10))),
    );
    let orchestrator =
        DownloadOrchestrator::with_policy(Arc::clone(&backend), "/downloads", policy(2));
    let job = DownloadJob::new(urls.clone(), false, Some("612345".to_string()), 2);

    let start = Instant::now();
    let report = orchestrator.run(&job, |_| {}).await;
    assert_eq!(report.succeeded, 5);

    let starts = backend.starts();
    assert_eq!(starts.len(), 5);
    // Batch 1 lasts as long as its slowest transfer, then the batch delay
    assert_at(starts[0].1, start, Duration::ZERO);
    assert_at(starts[1].1, start, Duration::ZERO);
    assert_at(starts[2].1, start, Duration::from_secs(6));
    assert_at(starts[3].1, start, Duration::from_secs(6));
    assert_at(starts[4].1, start, Duration::from_secs(7));
}

#[tokio::test(start_paused = true)]
async fn retries_back_off_linearly() {
    let url = "https://img.alicdn.com/imgextra/broken.jpg";
    let backend = Arc::new(ScriptedBackend::new().script(url, Script::Interrupt));
    let orchestrator =
        DownloadOrchestrator::with_policy(Arc::clone(&backend), "/downloads", policy(2));
    let job = DownloadJob::new(vec![url.to_string()], true, None, 2);

    let start = Instant::now();
    let report = orchestrator.run(&job, |_| {}).await;
    assert_eq!(report.failed, 1);

    let attempts = backend.starts_of(url);
    assert_eq!(attempts.len(), 3);
    assert_at(attempts[0], start, Duration::ZERO);
    assert_at(attempts[1], start, Duration::from_secs(2));
    assert_at(attempts[2], start, Duration::from_secs(6));
}

#[tokio::test(start_paused = true)]
async fn invalid_url_is_not_retried() {
    let url = "img.alicdn.com/no-scheme.jpg";
    let backend = Arc::new(ScriptedBackend::new().script(url, Script::Invalid));
    let orchestrator =
        DownloadOrchestrator::with_policy(Arc::clone(&backend), "/downloads", policy(2));
    let job = DownloadJob::new(vec![url.to_string()], true, None, 2);

    let start = Instant::now();
    let report = orchestrator.run(&job, |_| {}).await;

    assert_eq!(report.failed, 1);
    assert_eq!(report.failed_urls, vec![url.to_string()]);
    assert_eq!(backend.starts().len(), 1);
    assert_at(Instant::now(), start, Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn silent_transfer_counts_as_assumed_complete() {
    let url = "https://img.alicdn.com/imgextra/slow.jpg";
    let backend = Arc::new(ScriptedBackend::new().script(url, Script::Hang));
    let orchestrator = DownloadOrchestrator::with_policy(
        Arc::clone(&backend),
        "/downloads",
        DownloadPolicy {
            completion_timeout: Duration::from_secs(30),
            ..policy(2)
        },
    );
    let job = DownloadJob::new(vec![url.to_string()], true, None, 2);

    let start = Instant::now();
    let report = orchestrator.run(&job, |_| {}).await;

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.assumed_complete, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(backend.starts().len(), 1);
    assert_at(Instant::now(), start, Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn files_are_numbered_under_the_product_directory() {
    let urls = vec![
        "https://img.alicdn.com/imgextra/a.png".to_string(),
        "https://img.alicdn.com/imgextra/b".to_string(),
    ];
    let orchestrator =
        DownloadOrchestrator::with_policy(ScriptedBackend::new(), "/downloads", policy(2));

    let main = DownloadJob::new(urls.clone(), true, Some("612345".to_string()), 2);
    let report = orchestrator.run(&main, |_| {}).await;
    assert_eq!(
        report.saved_files,
        vec![
            std::path::PathBuf::from("/downloads/612345/main-1.png"),
            std::path::PathBuf::from("/downloads/612345/main-2.jpg"),
        ]
    );

    let detail = DownloadJob::new(urls, false, None, 2);
    let report = orchestrator.run(&detail, |_| {}).await;
    assert_eq!(
        report.saved_files[0],
        std::path::PathBuf::from("/downloads/0/detail/image-1.png")
    );
}

#[tokio::test(start_paused = true)]
async fn empty_job_still_reports_completion() {
    let orchestrator =
        DownloadOrchestrator::with_policy(ScriptedBackend::new(), "/downloads", policy(2));
    let job = DownloadJob::new(Vec::new(), true, None, 2);

    let mut progress = Vec::new();
    let report = orchestrator.run(&job, |p| progress.push(p)).await;

    assert_eq!(progress, vec![100.0]);
    assert_eq!(report.total, 0);
    assert_eq!(report.succeeded, 0);
}

#[tokio::test(start_paused = true)]
async fn unanswered_request_is_retried_and_does_not_block_the_job() {
    let urls = urls(3);
    let backend = Arc::new(ScriptedBackend::new().script(&urls[0], Script::Stall));
    let orchestrator =
        DownloadOrchestrator::with_policy(Arc::clone(&backend), "/downloads", policy(2));
    let job = DownloadJob::new(urls.clone(), true, Some("612345".to_string()), 2);

    let start = Instant::now();
    let mut progress = Vec::new();
    let report = orchestrator.run(&job, |p| progress.push(p)).await;

    assert_eq!(report.failed_urls, vec![urls[0].clone()]);
    assert_eq!(report.succeeded, 2);
    assert_eq!(progress.last(), Some(&100.0));

    // Each attempt is cut off after the completion timeout, then backs off
    let attempts = backend.starts_of(&urls[0]);
    assert_eq!(attempts.len(), 3);
    assert_at(attempts[0], start, Duration::ZERO);
    assert_at(attempts[1], start, Duration::from_secs(32));
    assert_at(attempts[2], start, Duration::from_secs(66));

    // The second batch starts once the stalled URL gave up
    assert_at(backend.starts_of(&urls[2])[0], start, Duration::from_secs(97));
}
