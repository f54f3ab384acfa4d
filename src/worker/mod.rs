//! Download worker loop
//!
//! Receives jobs from an mpsc channel and runs them one at a time through
//! the orchestrator, reporting each outcome on the message channel.

pub mod runner;

pub use runner::{FeedError, build_orchestrator, feed_jobs_from_file};

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info};

use crate::job::Job;
use crate::messaging::MessageChannel;
use crate::observability::MetricsSnapshot;
use crate::orchestrator::{DownloadOrchestrator, JobOutcome};

pub struct Worker {
    orchestrator: Arc<DownloadOrchestrator>,
    channel: Arc<dyn MessageChannel>,
}

impl Worker {
    pub fn new(orchestrator: Arc<DownloadOrchestrator>, channel: Arc<dyn MessageChannel>) -> Self {
        Self {
            orchestrator,
            channel,
        }
    }

    /// Process one job and report its outcome
    pub async fn handle(&self, job: &Job) -> JobOutcome {
        let outcome = self.orchestrator.process(job).await;

        let reported = match &outcome {
            JobOutcome::RequeueRequested { reason } => {
                info!(task_id = %job.task.id, reason = %reason, "Requeueing job");
                self.channel.requeue(job).await
            }
            other => match other.response() {
                Some(response) => self.channel.publish_response(job, response).await,
                None => Ok(()),
            },
        };

        if let Err(e) = reported {
            error!(task_id = %job.task.id, error = %e, "Failed to report job outcome");
        }
        outcome
    }

    /// Drain `receiver` until all senders are dropped
    pub async fn run(&self, mut receiver: mpsc::Receiver<Job>) -> MetricsSnapshot {
        info!("Worker started");
        while let Some(job) = receiver.recv().await {
            self.handle(&job).await;
        }

        let snapshot = self.orchestrator.metrics().snapshot();
        info!(?snapshot, "Worker stopped");
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::{DiskSpaceGate, WhitelistGate};
    use crate::dirs::{DownloadDirResolver, ShardedAllocator};
    use crate::job::{Creator, Document, Target, Task, TaskArgs};
    use crate::ledger::FjallStore;
    use crate::messaging::{ChannelMessage, RecordingChannel};
    use crate::reuse::PriorResultCache;
    use crate::strategy::{DownloadOutcome, DownloadStrategy, OutcomeStatus};
    use async_trait::async_trait;
    use std::path::Path;
    use tempfile::TempDir;

    struct NotFound;

    #[async_trait]
    impl DownloadStrategy for NotFound {
        async fn fetch(&self, _uri: &str, _directory: &Path) -> DownloadOutcome {
            DownloadOutcome::failure(OutcomeStatus::NotFound, "Not Found", None)
        }
    }

    fn job(id: &str, url: &str) -> Job {
        Job {
            task: Task {
                id: id.to_string(),
                key: "DOWNLOAD".to_string(),
                args: TaskArgs::default(),
            },
            document: Document {
                id: "abcdef".to_string(),
                target: Target {
                    id: "t".to_string(),
                    url: url.to_string(),
                    kind: String::new(),
                },
                creator: Creator {
                    id: "c".to_string(),
                    kind: String::new(),
                },
            },
        }
    }

    #[tokio::test]
    async fn test_run_reports_every_job() {
        let temp_dir = TempDir::new().unwrap();
        let allocator = ShardedAllocator::new(temp_dir.path(), temp_dir.path());
        std::fs::create_dir_all(temp_dir.path().join("ab/cd/ef/abcdef")).unwrap();
        let store = Arc::new(FjallStore::open(temp_dir.path().join("results")).unwrap());

        let orchestrator = DownloadOrchestrator::builder()
            .whitelist(WhitelistGate::new(["dummy.nl"]))
            .disk_gate(DiskSpaceGate::new(None))
            .dirs(DownloadDirResolver::new(Arc::new(allocator)))
            .http(Arc::new(NotFound))
            .s3(Arc::new(NotFound))
            .prior_results(PriorResultCache::new(store, "DOWNLOAD"))
            .build();

        let channel = Arc::new(RecordingChannel::new());
        let worker = Worker::new(Arc::new(orchestrator), channel.clone());

        let (sender, receiver) = mpsc::channel(4);
        sender.send(job("t1", "http://dummy.nl/a.mp3")).await.unwrap();
        sender.send(job("t2", "http://other.nl/a.mp3")).await.unwrap();
        drop(sender);

        let snapshot = worker.run(receiver).await;

        assert_eq!(snapshot.jobs_received, 2);
        assert_eq!(snapshot.remote_errors, 1);
        assert_eq!(snapshot.jobs_rejected, 1);

        let states: Vec<(String, u16)> = channel
            .messages()
            .into_iter()
            .map(|message| match message {
                ChannelMessage::Response { task_id, response } => (task_id, response.state),
                ChannelMessage::Requeue { task_id } => (task_id, 0),
            })
            .collect();
        assert_eq!(states, vec![("t1".to_string(), 404), ("t2".to_string(), 403)]);
    }
}
