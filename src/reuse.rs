//! Reuse of earlier results for the same document
//!
//! When a source is already on disk, a completed result from an earlier task
//! on the same document is copied to the current task instead of downloading
//! again. Any prior result is taken as equivalent; the first hit wins.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::job::Task;
use crate::ledger::{ResultRecord, ResultStore};

#[derive(Clone)]
pub struct PriorResultCache {
    store: Arc<dyn ResultStore>,
    task_kind: String,
}

impl PriorResultCache {
    pub fn new(store: Arc<dyn ResultStore>, task_kind: impl Into<String>) -> Self {
        Self {
            store,
            task_kind: task_kind.into(),
        }
    }

    pub fn task_kind(&self) -> &str {
        &self.task_kind
    }

    /// Copy a prior result to `task`, returning the saved copy.
    ///
    /// `None` means there was nothing to reuse or it could not be saved; the
    /// caller should then download afresh.
    pub fn try_reuse(&self, document_id: &str, task: &Task) -> Option<ResultRecord> {
        let prior = match self.store.search_prior_results(document_id, &self.task_kind) {
            Ok(prior) => prior,
            Err(e) => {
                warn!(document_id, error = %e, "Prior result search failed");
                return None;
            }
        };

        let Some(first) = prior.into_iter().next() else {
            debug!(document_id, "No prior results");
            return None;
        };

        let copy = first.copy_for_task(task.id.clone());
        match self.store.save_result(&copy) {
            Ok(()) => {
                info!(
                    document_id,
                    task_id = %task.id,
                    from_task = %first.task_id,
                    "Reused prior result"
                );
                Some(copy)
            }
            Err(e) if e.is_benign() => {
                debug!(document_id, task_id = %task.id, error = %e, "Could not claim prior result");
                None
            }
            Err(e) => {
                warn!(document_id, task_id = %task.id, error = %e, "Saving reused result failed");
                None
            }
        }
    }

    /// Record a fresh result; failures are logged only.
    pub fn record(&self, record: &ResultRecord) {
        match self.store.save_result(record) {
            Ok(()) => debug!(task_id = %record.task_id, "Recorded result"),
            Err(e) if e.is_benign() => {
                debug!(task_id = %record.task_id, error = %e, "Result not recorded")
            }
            Err(e) => warn!(task_id = %record.task_id, error = %e, "Recording result failed"),
        }
    }
}
