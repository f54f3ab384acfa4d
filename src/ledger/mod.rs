//! Result ledger: prior task results per document
//!
//! The worker consults the ledger before re-downloading a source that is
//! already on disk, and records every fresh download in it. [`FjallStore`]
//! keeps results in an embedded Fjall keyspace:
//!
//! - `results` - one JSON [`ResultRecord`] per (task kind, document, task)
//! - `tasks` - which result a task id produced, so a task saves at most once
//!
//! ```rust,ignore
//! use download_worker::ledger::{FjallStore, ResultStore};
//!
//! let store = FjallStore::open("data/results")?;
//! let prior = store.search_prior_results("doc_123", "DOWNLOAD")?;
//! ```

pub mod error;
pub mod partitions;
pub mod store;

pub use error::{LedgerError, Result};
pub use store::FjallStore;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A completed task result for one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub task_id: String,
    pub document_id: String,
    pub task_kind: String,
    pub generator: String,
    pub payload: Map<String, Value>,
    pub created_at: String,
}

impl ResultRecord {
    pub fn new(
        task_id: impl Into<String>,
        document_id: impl Into<String>,
        task_kind: impl Into<String>,
        payload: Map<String, Value>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            document_id: document_id.into(),
            task_kind: task_kind.into(),
            generator: generator(),
            payload,
            created_at: now_rfc3339(),
        }
    }

    /// Same payload attributed to another task
    pub fn copy_for_task(&self, task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            generator: generator(),
            created_at: now_rfc3339(),
            ..self.clone()
        }
    }
}

/// Storage of task results, searchable by document
pub trait ResultStore: Send + Sync {
    /// Results of earlier tasks of `task_kind` on `document_id`, in no
    /// particular order.
    fn search_prior_results(&self, document_id: &str, task_kind: &str) -> Result<Vec<ResultRecord>>;

    /// Fails with [`LedgerError::ResultExists`] when the task already has one.
    fn save_result(&self, record: &ResultRecord) -> Result<()>;
}

fn generator() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}
