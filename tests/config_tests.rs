//! Tests for the type-safe configuration builder pattern

use std::path::Path;
use std::time::Duration;

use tempfile::TempDir;
use tmall_collect::config::{CollectConfig, DownloadPolicy, RevealPolicy, SkuTiming};

#[test]
fn test_builder_requires_download_root() {
    // This should not compile if uncommented - download_root is required
    // let config = CollectConfig::builder().build();

    let temp_dir = TempDir::new().unwrap();
    let config = CollectConfig::builder()
        .download_root(temp_dir.path())
        .build()
        .unwrap();

    assert_eq!(config.download_root(), temp_dir.path());
}

#[test]
fn test_builder_optional_fields_have_defaults() {
    let config = CollectConfig::builder()
        .download_root("tmall-downloads")
        .build()
        .unwrap();

    assert!(config.headless());
    assert_eq!(config.chrome_data_dir(), None);
    assert_eq!(config.page_load_timeout_secs(), 30);
    assert_eq!(config.detail_image_cdn(), None);
    assert_eq!(config.detail_pacing(), Duration::from_millis(200));

    let download = config.download();
    assert_eq!(download.concurrency_limit, 2);
    assert_eq!(download.max_attempts, 3);
    assert_eq!(download.retry_backoff, Duration::from_secs(2));
    assert_eq!(download.batch_delay, Duration::from_secs(1));
    assert_eq!(download.completion_timeout, Duration::from_secs(30));

    let reveal = config.reveal();
    assert_eq!(reveal.settle, Duration::from_millis(200));
    assert_eq!(reveal.poll_interval, Duration::from_millis(300));
    assert_eq!(reveal.max_attempts, 10);
    assert_eq!(reveal.timeout, Duration::from_secs(3));

    assert_eq!(config.sku(), SkuTiming::default());
}

#[test]
fn test_builder_with_all_optional_fields() {
    let policy = DownloadPolicy {
        concurrency_limit: 4,
        max_attempts: 5,
        retry_backoff: Duration::from_millis(500),
        batch_delay: Duration::ZERO,
        completion_timeout: Duration::from_secs(5),
    };
    let reveal = RevealPolicy {
        settle: Duration::ZERO,
        poll_interval: Duration::from_millis(50),
        max_attempts: 2,
        timeout: Duration::from_millis(200),
    };

    let config = CollectConfig::builder()
        .download_root("/srv/tmall")
        .headless(false)
        .chrome_data_dir("/tmp/profile")
        .page_load_timeout_secs(90)
        .detail_image_cdn("https://cdn.example.com")
        .download_policy(policy)
        .reveal_policy(reveal)
        .detail_pacing(Duration::ZERO)
        .build()
        .unwrap();

    assert!(!config.headless());
    assert_eq!(
        config.chrome_data_dir().map(|p| p.as_path()),
        Some(Path::new("/tmp/profile"))
    );
    assert_eq!(config.page_load_timeout_secs(), 90);
    assert_eq!(config.download(), policy);
    assert_eq!(config.reveal(), reveal);
    assert_eq!(config.detail_pacing(), Duration::ZERO);
}

#[test]
fn test_cdn_base_loses_trailing_slashes() {
    let config = CollectConfig::builder()
        .download_root("out")
        .detail_image_cdn("https://cdn.example.com/tmall//")
        .build()
        .unwrap();
    assert_eq!(config.detail_image_cdn(), Some("https://cdn.example.com/tmall"));

    let config = CollectConfig::builder()
        .download_root("out")
        .detail_image_cdn("/")
        .build()
        .unwrap();
    assert_eq!(config.detail_image_cdn(), None);
}

#[test]
fn test_builder_rejects_zero_limits() {
    let zero_concurrency = CollectConfig::builder()
        .download_root("out")
        .concurrency_limit(0)
        .build();
    assert!(zero_concurrency.is_err());

    let zero_attempts = CollectConfig::builder()
        .download_root("out")
        .max_attempts(0)
        .build();
    assert!(zero_attempts.is_err());

    let zero_polls = CollectConfig::builder()
        .download_root("out")
        .reveal_policy(RevealPolicy {
            max_attempts: 0,
            ..RevealPolicy::default()
        })
        .build();
    assert!(zero_polls.is_err());
}

#[test]
fn test_config_serializes_for_logging() {
    let config = CollectConfig::builder()
        .download_root("out")
        .concurrency_limit(3)
        .build()
        .unwrap();
    let json = serde_json::to_value(&config).unwrap();
    assert_eq!(json["download"]["concurrency_limit"], 3);
    assert_eq!(json["download_root"], "out");
}
