//! Job callback: admission, directory, dedup, dispatch, recording
//!
//! Each job runs `received → whitelist checked → dir resolved → space checked
//! → dedup checked → reused | fetched → reported`, and ends as a
//! [`JobOutcome`]. Insufficient disk space is the only path that asks for
//! redelivery instead of reporting.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::admission::{DiskSpaceGate, WhitelistGate};
use crate::dirs::DownloadDirResolver;
use crate::job::{Job, JobResponse, SourceDescriptor, SourceKind};
use crate::ledger::ResultRecord;
use crate::observability::Metrics;
use crate::reuse::PriorResultCache;
use crate::strategy::{DownloadStrategy, OutcomeStatus};

/// Terminal state of one job
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// 200 or 201
    Success(JobResponse),
    /// 400 or 403; retrying will not help
    Rejected(JobResponse),
    /// Any other status; the framework applies its own retry policy
    RemoteError(JobResponse),
    /// Refuse the job for now and have it delivered again later
    RequeueRequested { reason: String },
}

impl JobOutcome {
    pub fn from_response(response: JobResponse) -> Self {
        match response.state {
            200 | 201 => JobOutcome::Success(response),
            400 | 403 => JobOutcome::Rejected(response),
            _ => JobOutcome::RemoteError(response),
        }
    }

    pub fn response(&self) -> Option<&JobResponse> {
        match self {
            JobOutcome::Success(response)
            | JobOutcome::Rejected(response)
            | JobOutcome::RemoteError(response) => Some(response),
            JobOutcome::RequeueRequested { .. } => None,
        }
    }
}

#[derive(bon::Builder)]
pub struct DownloadOrchestrator {
    whitelist: WhitelistGate,
    disk_gate: DiskSpaceGate,
    dirs: DownloadDirResolver,
    http: Arc<dyn DownloadStrategy>,
    s3: Arc<dyn DownloadStrategy>,
    prior_results: PriorResultCache,
    #[builder(default)]
    metrics: Arc<Metrics>,
}

impl DownloadOrchestrator {
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub async fn process(&self, job: &Job) -> JobOutcome {
        self.metrics.job_received();
        let outcome = self.run(job).await;

        match &outcome {
            JobOutcome::Rejected(_) => self.metrics.job_rejected(),
            JobOutcome::RemoteError(_) => self.metrics.remote_error(),
            JobOutcome::RequeueRequested { .. } => self.metrics.job_requeued(),
            JobOutcome::Success(_) => {}
        }
        outcome
    }

    async fn run(&self, job: &Job) -> JobOutcome {
        let source = SourceDescriptor::from(&job.document);
        info!(
            task_id = %job.task.id,
            doc_id = %source.document_id,
            collection_id = %source.collection_id,
            uri = %source.source_uri,
            "Processing download job"
        );

        let Some(kind) = SourceKind::from_uri(&source.source_uri) else {
            warn!(uri = %source.source_uri, "Unsupported source URI");
            return reject(
                OutcomeStatus::BadRequest,
                format!("Unsupported source URI: {}", source.source_uri),
            );
        };

        if kind == SourceKind::Http {
            let decision = self.whitelist.check(&source.source_uri);
            if !decision.admitted {
                warn!(
                    uri = %source.source_uri,
                    subject = %decision.subject,
                    "Source not whitelisted"
                );
                return reject(
                    OutcomeStatus::Forbidden,
                    format!(
                        "Source {} is not whitelisted: {}",
                        source.source_uri, decision.subject
                    ),
                );
            }
        }

        let Some(directory) = self.dirs.resolve(&job.task, &job.document) else {
            return reject(
                OutcomeStatus::BadRequest,
                format!("No download directory available for document {}", source.document_id),
            );
        };

        let decision = self.disk_gate.check(&directory);
        if !decision.admitted {
            warn!(
                dir = %directory.display(),
                subject = %decision.subject,
                "Refusing job, requeue requested"
            );
            return JobOutcome::RequeueRequested {
                reason: format!("Insufficient disk space: {}", decision.subject),
            };
        }

        if contains_regular_file(&directory) {
            debug!(
                dir = %directory.display(),
                "Download directory not empty, checking prior results"
            );
            if let Some(reused) = self.prior_results.try_reuse(&source.document_id, &job.task) {
                self.metrics.result_reused();
                return JobOutcome::Success(
                    JobResponse::new(200, "Success").with_details(reused.payload),
                );
            }
        }

        let strategy = match kind {
            SourceKind::Http => &self.http,
            SourceKind::S3 => &self.s3,
        };
        let outcome = strategy.fetch(&source.source_uri, &directory).await;

        if outcome.already_downloaded {
            self.metrics.already_present();
        } else if outcome.status == OutcomeStatus::Success {
            self.metrics.download_completed();
            self.prior_results.record(&ResultRecord::new(
                job.task.id.clone(),
                source.document_id.clone(),
                self.prior_results.task_kind(),
                outcome.payload(),
            ));
        }

        info!(
            task_id = %job.task.id,
            state = outcome.status.code(),
            message = %outcome.message,
            "Download job finished"
        );
        JobOutcome::from_response(outcome.to_response())
    }
}

fn reject(status: OutcomeStatus, message: String) -> JobOutcome {
    JobOutcome::from_response(JobResponse::new(status.code(), message))
}

fn contains_regular_file(directory: &Path) -> bool {
    match std::fs::read_dir(directory) {
        Ok(entries) => entries
            .flatten()
            .any(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false)),
        Err(e) => {
            warn!(dir = %directory.display(), error = %e, "Could not list download directory");
            false
        }
    }
}
