//! Product data collection for Tmall item pages.
//!
//! A [`PageAgent`] extracts a [`ProductRecord`] from a live
//! ([`ChromiumPage`]) or captured ([`SnapshotPage`]) product page and hands
//! image lists and generated documents to a [`BackgroundAgent`], which
//! downloads them in small retrying batches.

pub mod agent;
pub mod browser_setup;
pub mod config;
pub mod download;
pub mod error;
pub mod extractor;
pub mod page;
pub mod relay;
pub mod utils;

pub use agent::{BackgroundAgent, PageAgent};
pub use browser_setup::{
    BrowserSession, apply_stealth_measures, download_managed_browser, find_browser_executable,
    launch_browser,
};
pub use config::CollectConfig;
pub use download::{DownloadOrchestrator, DownloadReport, HttpDownloader};
pub use error::{CollectError, CollectResult, DownloadError};
pub use extractor::{ProductExtractor, ProductRecord, SkuVariant};
pub use page::{ChromiumPage, ProductPage, SnapshotPage};
pub use relay::{MessageRelay, Outbound, PageAction};
