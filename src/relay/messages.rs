//! Wire messages between the page agent, the background agent and listeners
//!
//! All messages serialize as JSON objects tagged by an `action` field.

use serde::{Deserialize, Serialize};

use crate::download::DownloadReport;

/// Request handled by the page agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum PageAction {
    CollectData,
    GetProductId,
    /// Page type, URL, title and whether a download is in flight
    GetPageInfo,
    DownloadMainImages,
    /// Download the detail images
    StartDownload,
    DownloadProductParameters,
}

/// Reply to a [`PageAction`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Envelope {
    #[must_use]
    pub fn ok(message: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data,
            error: None,
        }
    }

    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Work shipped to the background agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum BackgroundRequest {
    #[serde(rename_all = "camelCase")]
    DownloadImages {
        images: Vec<String>,
        is_main: bool,
        product_id: Option<String>,
    },
    /// Save a generated document under the download root
    #[serde(rename_all = "camelCase")]
    DownloadFile {
        content: String,
        filename: String,
        mime_type: String,
    },
}

/// Broadcast from the background agent to whoever listens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Outbound {
    DownloadProgress { progress: f64 },
    DownloadError { error: String },
    DownloadFinished { report: DownloadReport },
}
