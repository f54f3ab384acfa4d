//! Download strategies and their normalized outcome
//!
//! Both strategies share the same contract: given a source URI and an
//! existing directory, produce a [`DownloadOutcome`]. Every failure is an
//! outcome value with a status code, never a panic or an `Err`.

pub mod http;
pub mod s3;

pub use http::HttpStrategy;
pub use s3::{AmazonS3Provider, S3Location, S3Strategy, StoreProvider};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::job::JobResponse;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("HTTP client setup failed: {0}")]
    ClientSetup(String),

    #[error("Object store setup failed: {0}")]
    StoreSetup(#[from] object_store::Error),
}

/// Failure while moving bytes from the source into the target file
#[derive(Debug, Error)]
pub(crate) enum TransferError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Object store error: {0}")]
    Store(#[from] object_store::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// HTTP-style status of a download attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "u16")]
pub enum OutcomeStatus {
    Success,
    /// Target file already present (legacy HTTP variant)
    AlreadyDownloaded,
    BadRequest,
    Forbidden,
    NotFound,
    InternalError,
    /// No response was received from the source at all
    NetworkError,
    IncompleteTransfer,
    /// The source answered with a 500
    SourceUnavailable,
}

impl OutcomeStatus {
    pub fn code(&self) -> u16 {
        match self {
            OutcomeStatus::Success => 200,
            OutcomeStatus::AlreadyDownloaded => 201,
            OutcomeStatus::BadRequest => 400,
            OutcomeStatus::Forbidden => 403,
            OutcomeStatus::NotFound => 404,
            OutcomeStatus::InternalError | OutcomeStatus::NetworkError => 500,
            OutcomeStatus::IncompleteTransfer => 502,
            OutcomeStatus::SourceUnavailable => 503,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, OutcomeStatus::Success | OutcomeStatus::AlreadyDownloaded)
    }
}

impl From<OutcomeStatus> for u16 {
    fn from(status: OutcomeStatus) -> Self {
        status.code()
    }
}

/// File metadata reported with a successful download
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub file_type: String,
    #[serde(rename = "Content-Type", default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(rename = "Content-Length", default, skip_serializing_if = "Option::is_none")]
    pub content_length: Option<u64>,
}

impl FileInfo {
    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// Result of one download attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadOutcome {
    pub download_file_path: Option<PathBuf>,
    pub status: OutcomeStatus,
    pub message: String,
    pub already_downloaded: bool,
    pub file_info: Option<FileInfo>,
}

impl DownloadOutcome {
    pub fn success(path: PathBuf, file_info: FileInfo) -> Self {
        Self {
            download_file_path: Some(path),
            status: OutcomeStatus::Success,
            message: "Success".to_string(),
            already_downloaded: false,
            file_info: Some(file_info),
        }
    }

    /// The target file exists already; nothing was transferred.
    pub fn already_present(path: PathBuf, status: OutcomeStatus) -> Self {
        Self {
            message: format!("{} was already downloaded", path.display()),
            download_file_path: Some(path),
            status,
            already_downloaded: true,
            file_info: None,
        }
    }

    pub fn failure(
        status: OutcomeStatus,
        message: impl Into<String>,
        path: Option<PathBuf>,
    ) -> Self {
        Self {
            download_file_path: path,
            status,
            message: message.into(),
            already_downloaded: false,
            file_info: None,
        }
    }

    /// `file_path` plus file info, as stored and reported
    pub fn payload(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        if let Some(path) = &self.download_file_path {
            payload.insert(
                "file_path".to_string(),
                Value::String(path.display().to_string()),
            );
        }
        if let Some(file_info) = &self.file_info {
            payload.extend(file_info.to_map());
        }
        payload
    }

    pub fn to_response(&self) -> JobResponse {
        let response = JobResponse::new(self.status.code(), self.message.clone());
        if self.status.is_success() {
            response.with_details(self.payload())
        } else {
            response
        }
    }
}

/// Transfer a source into a directory
#[async_trait]
pub trait DownloadStrategy: Send + Sync {
    async fn fetch(&self, uri: &str, directory: &Path) -> DownloadOutcome;
}

/// Remove a partially written target so it cannot pass for a finished download
pub(crate) async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed partial download"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove partial download"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_codes() {
        assert_eq!(OutcomeStatus::Success.code(), 200);
        assert_eq!(OutcomeStatus::AlreadyDownloaded.code(), 201);
        assert_eq!(OutcomeStatus::NetworkError.code(), 500);
        assert_eq!(OutcomeStatus::IncompleteTransfer.code(), 502);
        assert_eq!(OutcomeStatus::SourceUnavailable.code(), 503);
        assert!(!OutcomeStatus::NotFound.is_success());
    }

    #[test]
    fn test_success_response_carries_file_info() {
        let outcome = DownloadOutcome::success(
            PathBuf::from("/data/b8/21/63/doc/dummy.mp3"),
            FileInfo {
                file_type: "audio".to_string(),
                content_type: Some("audio/mpeg".to_string()),
                content_length: Some(5747355),
            },
        );

        let value = serde_json::to_value(outcome.to_response()).unwrap();
        assert_eq!(
            value,
            json!({
                "state": 200,
                "message": "Success",
                "file_path": "/data/b8/21/63/doc/dummy.mp3",
                "file_type": "audio",
                "Content-Type": "audio/mpeg",
                "Content-Length": 5747355
            })
        );
    }

    #[test]
    fn test_failure_response_has_no_details() {
        let outcome = DownloadOutcome::failure(
            OutcomeStatus::NotFound,
            "Not Found",
            Some(PathBuf::from("/data/x.mp3")),
        );
        let response = outcome.to_response();
        assert_eq!(response.state, 404);
        assert!(response.details.is_empty());
    }

    #[test]
    fn test_already_present_outcome() {
        let outcome = DownloadOutcome::already_present(
            PathBuf::from("/data/x.mp3"),
            OutcomeStatus::AlreadyDownloaded,
        );
        assert!(outcome.already_downloaded);
        assert!(outcome.file_info.is_none());
        assert_eq!(outcome.to_response().state, 201);
        assert_eq!(outcome.message, "/data/x.mp3 was already downloaded");
    }

    #[test]
    fn test_outcome_serializes_status_as_code() {
        let outcome = DownloadOutcome::failure(OutcomeStatus::BadRequest, "bad", None);
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], json!(400));
        assert_eq!(value["download_file_path"], Value::Null);
    }
}
