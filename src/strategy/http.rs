//! HTTP(S) download strategy

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap};
use reqwest::{Client, Response, StatusCode};
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::{
    DownloadError, DownloadOutcome, DownloadStrategy, FileInfo, OutcomeStatus, TransferError,
    remove_partial,
};
use crate::config::HttpConfig;
use crate::content_type::{essence, file_type_from_mime, has_extension, resolve_extension};
use crate::filename::{append_extension, url_to_safe_filename};

/// Streams an HTTP(S) resource into the download directory
pub struct HttpStrategy {
    client: Client,
}

impl HttpStrategy {
    pub fn new(config: &HttpConfig) -> Result<Self, DownloadError> {
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(10));

        if let Some(secs) = config.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let client = builder
            .build()
            .map_err(|e| DownloadError::ClientSetup(e.to_string()))?;

        Ok(Self { client })
    }

    /// Safe file name for `url`, with an extension probed via HEAD when the
    /// URL itself carries none.
    async fn target_filename(&self, url: &str) -> String {
        let name = url_to_safe_filename(url);
        if name.is_empty() || has_extension(&name) {
            return name;
        }

        match self.client.head(url).send().await {
            Ok(response) if response.status().is_success() => {
                let extension = resolve_extension(response.headers());
                debug!(url, extension = %extension, "Resolved extension from HEAD");
                append_extension(&name, &extension)
            }
            Ok(response) => {
                warn!(
                    url,
                    status = response.status().as_u16(),
                    "HEAD request refused, keeping bare name"
                );
                name
            }
            Err(e) => {
                warn!(url, error = %e, "HEAD request failed, keeping bare name");
                name
            }
        }
    }
}

#[async_trait]
impl DownloadStrategy for HttpStrategy {
    async fn fetch(&self, url: &str, directory: &Path) -> DownloadOutcome {
        let filename = self.target_filename(url).await;
        if filename.is_empty() {
            return DownloadOutcome::failure(
                OutcomeStatus::BadRequest,
                format!("Could not derive a file name from {}", url),
                None,
            );
        }

        let path = directory.join(&filename);
        if path.exists() {
            info!(url, path = %path.display(), "File already downloaded");
            return DownloadOutcome::already_present(path, OutcomeStatus::AlreadyDownloaded);
        }

        debug!(url, path = %path.display(), "Starting download");

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(url, error = %e, "Request failed");
                return DownloadOutcome::failure(
                    OutcomeStatus::NetworkError,
                    format!("Network error: {}", e),
                    Some(path),
                );
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(url, status = status.as_u16(), "Source refused download");
            let (status, message) = map_http_error(status);
            return DownloadOutcome::failure(status, message, Some(path));
        }

        let headers = response.headers().clone();
        let advertised = content_length(&headers);

        let mut written = 0u64;
        if let Err(e) = stream_to_file(response, &path, &mut written).await {
            warn!(url, path = %path.display(), written, error = %e, "Transfer failed");
            remove_partial(&path).await;

            // a body cut short before the advertised length is a truncation
            let (status, message) = match (&e, verify_complete(&filename, written, advertised)) {
                (TransferError::Network(_), Err(message)) => {
                    (OutcomeStatus::IncompleteTransfer, message)
                }
                (TransferError::Network(_), Ok(())) => (OutcomeStatus::NetworkError, e.to_string()),
                _ => (OutcomeStatus::InternalError, e.to_string()),
            };
            return DownloadOutcome::failure(status, message, Some(path));
        }

        if let Err(message) = verify_complete(&filename, written, advertised) {
            warn!(url, written, expected = advertised, "Incomplete transfer");
            remove_partial(&path).await;
            return DownloadOutcome::failure(
                OutcomeStatus::IncompleteTransfer,
                message,
                Some(path),
            );
        }

        info!(url, path = %path.display(), bytes = written, "Download completed");
        DownloadOutcome::success(path, file_info(&headers))
    }
}

/// Stream the body into `path`. `written` counts the bytes on disk, also
/// when the transfer fails halfway.
async fn stream_to_file(
    response: Response,
    path: &Path,
    written: &mut u64,
) -> Result<(), TransferError> {
    let mut file = File::create(path).await?;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk: Bytes = chunk?;
        file.write_all(&chunk).await?;
        *written += chunk.len() as u64;
    }

    file.flush().await?;
    Ok(())
}

/// Status and message for a non-success HTTP answer
fn map_http_error(status: StatusCode) -> (OutcomeStatus, String) {
    let reason = status.canonical_reason().unwrap_or("Unknown");
    match status {
        StatusCode::NOT_FOUND => (OutcomeStatus::NotFound, reason.to_string()),
        StatusCode::INTERNAL_SERVER_ERROR => (
            OutcomeStatus::SourceUnavailable,
            format!("Source returned 500: {}", reason),
        ),
        other => (
            OutcomeStatus::InternalError,
            format!("Unknown {} error: {}", other.as_u16(), reason),
        ),
    }
}

/// Written bytes must match an advertised Content-Length.
fn verify_complete(filename: &str, written: u64, advertised: Option<u64>) -> Result<(), String> {
    match advertised {
        Some(expected) if expected != written => Err(format!(
            "Received incomplete file: {} ({} out of {} bytes)",
            filename, written, expected
        )),
        _ => Ok(()),
    }
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

fn file_info(headers: &HeaderMap) -> FileInfo {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(essence)
        .filter(|value| !value.is_empty());

    FileInfo {
        file_type: content_type
            .as_deref()
            .map(file_type_from_mime)
            .unwrap_or_else(|| "unknown".to_string()),
        content_type,
        content_length: content_length(headers),
    }
}
