//! S3 download strategy backed by `object_store`

use async_trait::async_trait;
use futures_util::StreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::{Attribute, ObjectStore, path::Path as StoragePath};
use std::path::Path;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::{
    DownloadError, DownloadOutcome, DownloadStrategy, FileInfo, OutcomeStatus, TransferError,
    remove_partial,
};
use crate::config::S3Config;
use crate::content_type::{essence, file_type_from_mime};

const S3_SCHEME: &str = "s3://";

/// Bucket, key and local file name of an `s3://bucket/key` URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Location {
    pub bucket: String,
    pub key: String,
    pub file_name: String,
}

/// `s3://` followed by a non-empty bucket, a `/` and a non-empty key.
pub fn validate_s3_uri(uri: &str) -> bool {
    deconstruct_s3_uri(uri).is_some()
}

pub fn deconstruct_s3_uri(uri: &str) -> Option<S3Location> {
    let rest = uri.strip_prefix(S3_SCHEME)?;
    let (bucket, key) = rest.split_once('/')?;
    if bucket.is_empty() || key.is_empty() {
        return None;
    }

    let file_name = key.rsplit('/').next().unwrap_or_default();
    if file_name.is_empty() || file_name.chars().all(|c| c == '.') {
        return None;
    }

    Some(S3Location {
        bucket: bucket.to_string(),
        key: key.to_string(),
        file_name: file_name.to_string(),
    })
}

/// Produces an object store client scoped to one bucket
pub trait StoreProvider: Send + Sync {
    fn store_for_bucket(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>, DownloadError>;
}

/// Amazon S3 (or compatible) stores configured from the environment and `[s3]`
#[derive(Debug, Clone, Default)]
pub struct AmazonS3Provider {
    config: S3Config,
}

impl AmazonS3Provider {
    pub fn new(config: S3Config) -> Self {
        Self { config }
    }
}

impl StoreProvider for AmazonS3Provider {
    fn store_for_bucket(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>, DownloadError> {
        let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);

        if let Some(region) = &self.config.region {
            builder = builder.with_region(region);
        }
        if let Some(endpoint) = &self.config.endpoint {
            builder = builder.with_endpoint(endpoint);
        }
        if self.config.allow_http {
            builder = builder.with_allow_http(true);
        }
        if let Some(access_key) = &self.config.access_key {
            builder = builder.with_access_key_id(access_key);
        }
        if let Some(secret_key) = &self.config.secret_key {
            builder = builder.with_secret_access_key(secret_key);
        }

        Ok(Arc::new(builder.build()?))
    }
}

/// Copies an S3 object into the download directory
pub struct S3Strategy {
    provider: Arc<dyn StoreProvider>,
}

impl S3Strategy {
    pub fn new(provider: Arc<dyn StoreProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl DownloadStrategy for S3Strategy {
    async fn fetch(&self, uri: &str, directory: &Path) -> DownloadOutcome {
        let Some(location) = deconstruct_s3_uri(uri) else {
            warn!(uri, "Invalid S3 URI");
            return DownloadOutcome::failure(
                OutcomeStatus::BadRequest,
                format!("Invalid S3 URI: {}", uri),
                None,
            );
        };

        if !directory.is_dir() {
            warn!(uri, dir = %directory.display(), "Download directory does not exist");
            return DownloadOutcome::failure(
                OutcomeStatus::BadRequest,
                format!("Download directory {} does not exist", directory.display()),
                None,
            );
        }

        let path = directory.join(&location.file_name);
        if path.exists() {
            info!(uri, path = %path.display(), "Object already downloaded");
            return DownloadOutcome::already_present(path, OutcomeStatus::Success);
        }

        let store = match self.provider.store_for_bucket(&location.bucket) {
            Ok(store) => store,
            Err(e) => {
                warn!(uri, bucket = %location.bucket, error = %e, "Could not create S3 client");
                return DownloadOutcome::failure(
                    OutcomeStatus::InternalError,
                    format!("Unknown error: {}", e),
                    Some(path),
                );
            }
        };

        debug!(
            bucket = %location.bucket,
            key = %location.key,
            path = %path.display(),
            "Starting S3 download"
        );

        match copy_object(store.as_ref(), &location.key, &path).await {
            Ok(file_info) => {
                info!(
                    uri,
                    path = %path.display(),
                    bytes = file_info.content_length,
                    "S3 download completed"
                );
                DownloadOutcome::success(path, file_info)
            }
            Err(e) => {
                warn!(uri, error = %e, "S3 download failed");
                remove_partial(&path).await;
                DownloadOutcome::failure(
                    OutcomeStatus::InternalError,
                    format!("Unknown error: {}", e),
                    Some(path),
                )
            }
        }
    }
}

async fn copy_object(
    store: &dyn ObjectStore,
    key: &str,
    path: &Path,
) -> Result<FileInfo, TransferError> {
    let result = store.get(&StoragePath::from(key)).await?;

    let content_type = result
        .attributes
        .get(&Attribute::ContentType)
        .map(|value| {
            let value: &str = value.as_ref();
            essence(value)
        })
        .filter(|value| !value.is_empty());
    let size = result.meta.size as u64;

    let mut file = File::create(path).await?;
    let mut stream = result.into_stream();
    while let Some(chunk) = stream.next().await {
        file.write_all(&chunk?).await?;
    }
    file.flush().await?;

    Ok(FileInfo {
        file_type: content_type
            .as_deref()
            .map(file_type_from_mime)
            .unwrap_or_else(|| "unknown".to_string()),
        content_type,
        content_length: Some(size),
    })
}
