//! Wiring of production components and job feeds

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::admission::{DiskSpaceGate, WhitelistGate};
use crate::config::Config;
use crate::dirs::{DownloadDirResolver, ShardedAllocator};
use crate::job::Job;
use crate::ledger::ResultStore;
use crate::orchestrator::DownloadOrchestrator;
use crate::reuse::PriorResultCache;
use crate::strategy::{AmazonS3Provider, DownloadError, HttpStrategy, S3Strategy};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid job on line {line}: {source}")]
    InvalidJob {
        line: usize,
        source: serde_json::Error,
    },

    #[error("Worker stopped before all jobs were sent")]
    WorkerGone,
}

/// Build an orchestrator from validated configuration
pub fn build_orchestrator(
    config: &Config,
    store: Arc<dyn ResultStore>,
) -> Result<DownloadOrchestrator, DownloadError> {
    let downloader = &config.downloader;
    let allocator = ShardedAllocator::new(&config.paths.temp_folder, &config.paths.out_folder);

    Ok(DownloadOrchestrator::builder()
        .whitelist(WhitelistGate::new(&downloader.whitelist))
        .disk_gate(DiskSpaceGate::new(downloader.fs_threshold))
        .dirs(DownloadDirResolver::new(Arc::new(allocator)))
        .http(Arc::new(HttpStrategy::new(&downloader.http)?))
        .s3(Arc::new(S3Strategy::new(Arc::new(AmazonS3Provider::new(
            config.s3.clone(),
        )))))
        .prior_results(PriorResultCache::new(store, &config.result_store.task_kind))
        .build())
}

/// Send every job of a JSON-lines file to the worker; blank lines are skipped.
pub async fn feed_jobs_from_file(
    path: &Path,
    sender: mpsc::Sender<Job>,
) -> Result<usize, FeedError> {
    let file = File::open(path).await?;
    let mut lines = BufReader::new(file).lines();
    let mut line_no = 0;
    let mut sent = 0;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }

        let job: Job = serde_json::from_str(&line).map_err(|source| {
            warn!(line = line_no, error = %source, "Invalid job line");
            FeedError::InvalidJob {
                line: line_no,
                source,
            }
        })?;
        debug!(task_id = %job.task.id, "Queueing job");

        sender.send(job).await.map_err(|_| FeedError::WorkerGone)?;
        sent += 1;
    }

    Ok(sent)
}
