//! HTTP transfers against a local mock server

use std::time::Duration;

use tempfile::TempDir;
use tmall_collect::config::DownloadPolicy;
use tmall_collect::download::{
    DownloadBackend, DownloadJob, DownloadOrchestrator, DownloadOutcome, HttpDownloader,
};
use tmall_collect::error::DownloadError;

mod common;

const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

#[tokio::test]
async fn streams_the_body_into_the_destination() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/imgextra/a.jpg")
        .with_status(200)
        .with_header("content-type", "image/jpeg")
        .with_body(JPEG_BYTES)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let destination = dir.path().join("612345").join("main-1.jpg");
    let downloader = HttpDownloader::new().unwrap();

    let handle = downloader
        .start(&format!("{}/imgextra/a.jpg", server.url()), &destination)
        .await
        .unwrap();
    let path = handle.path.clone();
    assert_eq!(
        handle.outcome(Duration::from_secs(10)).await,
        DownloadOutcome::Completed
    );

    mock.assert_async().await;
    assert_eq!(path, destination);
    assert_eq!(tokio::fs::read(&path).await.unwrap(), JPEG_BYTES);
}

#[tokio::test]
async fn error_status_is_reported_without_creating_a_file() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/missing.jpg")
        .with_status(404)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let destination = dir.path().join("main-1.jpg");
    let result = HttpDownloader::new()
        .unwrap()
        .start(&format!("{}/missing.jpg", server.url()), &destination)
        .await;

    assert!(matches!(result, Err(DownloadError::Status(404))));
    assert!(!destination.exists());
}

#[tokio::test]
async fn non_http_urls_are_rejected() {
    let dir = TempDir::new().unwrap();
    let result = HttpDownloader::new()
        .unwrap()
        .start("ftp://img.alicdn.com/a.jpg", &dir.path().join("a.jpg"))
        .await;
    assert!(matches!(result, Err(DownloadError::InvalidUrl(_))));
}

#[tokio::test]
async fn existing_files_are_never_overwritten() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/a.jpg")
        .with_status(200)
        .with_body(JPEG_BYTES)
        .expect(2)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let destination = dir.path().join("main-1.jpg");
    tokio::fs::write(&destination, b"older").await.unwrap();

    let downloader = HttpDownloader::new().unwrap();
    let url = format!("{}/a.jpg", server.url());
    let first = downloader.start(&url, &destination).await.unwrap();
    let first_path = first.path.clone();
    first.outcome(Duration::from_secs(10)).await;
    let second = downloader.start(&url, &destination).await.unwrap();
    let second_path = second.path.clone();
    second.outcome(Duration::from_secs(10)).await;

    assert_eq!(first_path, dir.path().join("main-1 (1).jpg"));
    assert_eq!(second_path, dir.path().join("main-1 (2).jpg"));
    assert_eq!(tokio::fs::read(&destination).await.unwrap(), b"older");
}

#[tokio::test]
async fn orchestrated_job_lands_in_the_product_directory() {
    let mut server = mockito::Server::new_async().await;
    for path in ["/a.jpg", "/b.png"] {
        server
            .mock("GET", path)
            .with_status(200)
            .with_body(JPEG_BYTES)
            .create_async()
            .await;
    }

    let dir = TempDir::new().unwrap();
    let config = common::test_config(dir.path());
    let orchestrator = DownloadOrchestrator::new(HttpDownloader::new().unwrap(), &config);
    let job = DownloadJob::new(
        vec![
            format!("{}/a.jpg", server.url()),
            format!("{}/b.png", server.url()),
        ],
        false,
        Some("612345".to_string()),
        2,
    );

    let report = orchestrator.run(&job, |_| {}).await;
    assert_eq!(report.succeeded, 2);
    assert!(dir.path().join("612345/detail/image-1.jpg").exists());
    assert!(dir.path().join("612345/detail/image-2.png").exists());
}

#[tokio::test]
async fn server_that_never_answers_fails_the_item_instead_of_hanging() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut open = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            open.push(socket);
        }
    });

    let dir = TempDir::new().unwrap();
    let policy = DownloadPolicy {
        concurrency_limit: 1,
        max_attempts: 3,
        retry_backoff: Duration::from_millis(10),
        batch_delay: Duration::ZERO,
        completion_timeout: Duration::from_secs(1),
    };
    let orchestrator =
        DownloadOrchestrator::with_policy(HttpDownloader::new().unwrap(), dir.path(), policy);
    let url = format!("http://{addr}/imgextra/a.jpg");
    let job = DownloadJob::new(vec![url.clone()], true, Some("612345".to_string()), 1);

    let mut progress = Vec::new();
    let report = tokio::time::timeout(
        Duration::from_secs(20),
        orchestrator.run(&job, |p| progress.push(p)),
    )
    .await
    .expect("job finishes despite the silent server");

    assert_eq!(report.failed, 1);
    assert_eq!(report.failed_urls, vec![url]);
    assert_eq!(progress.last(), Some(&100.0));
    assert!(!dir.path().join("612345/main-1.jpg").exists());
}
