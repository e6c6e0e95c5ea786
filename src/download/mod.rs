//! Image download orchestration
//!
//! [`DownloadOrchestrator`] runs one [`DownloadJob`] over a
//! [`DownloadBackend`]; [`HttpDownloader`] is the production backend.

pub mod backend;
pub mod job;
pub mod orchestrator;
pub mod storage;

pub use backend::{DownloadBackend, HttpDownloader, TransferHandle, TransferState};
pub use job::{DownloadJob, DownloadOutcome, DownloadReport};
pub use orchestrator::DownloadOrchestrator;
pub use storage::{create_unique, write_generated_file};
