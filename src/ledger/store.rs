use std::path::Path;

use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use tracing::{debug, info};

use super::error::{LedgerError, Result};
use super::partitions::{encode_result_key, encode_result_prefix, encode_task_key};
use super::{ResultRecord, ResultStore};

/// Fjall-backed persistent storage for task results
#[derive(Clone)]
pub struct FjallStore {
    keyspace: Keyspace,
    results: PartitionHandle,
    tasks: PartitionHandle,
}

impl FjallStore {
    /// Open or create a Fjall store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening result store at: {}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let keyspace = Config::new(path).open()?;
        let results = keyspace.open_partition("results", PartitionCreateOptions::default())?;
        let tasks = keyspace.open_partition("tasks", PartitionCreateOptions::default())?;

        Ok(Self {
            keyspace,
            results,
            tasks,
        })
    }

    /// Result saved by a task, if any
    pub fn result_for_task(&self, task_id: &str) -> Result<Option<ResultRecord>> {
        let Some(result_key) = self.tasks.get(encode_task_key(task_id))? else {
            return Ok(None);
        };
        match self.results.get(result_key)? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    /// Persist all pending writes to disk
    pub fn persist(&self) -> Result<()> {
        self.keyspace.persist(fjall::PersistMode::SyncAll)?;
        Ok(())
    }
}

impl ResultStore for FjallStore {
    fn search_prior_results(
        &self,
        document_id: &str,
        task_kind: &str,
    ) -> Result<Vec<ResultRecord>> {
        let prefix = encode_result_prefix(task_kind, document_id);
        let mut records = Vec::new();
        for item in self.results.prefix(prefix) {
            let (_, value) = item?;
            records.push(serde_json::from_slice(&value)?);
        }
        debug!(document_id, task_kind, count = records.len(), "Searched prior results");
        Ok(records)
    }

    fn save_result(&self, record: &ResultRecord) -> Result<()> {
        let task_key = encode_task_key(&record.task_id);
        if self.tasks.contains_key(&task_key)? {
            return Err(LedgerError::ResultExists(record.task_id.clone()));
        }

        let result_key = encode_result_key(&record.task_kind, &record.document_id, &record.task_id);
        let value = serde_json::to_vec(record)?;

        let mut batch = self.keyspace.batch();
        batch.insert(&self.results, result_key.clone(), value);
        batch.insert(&self.tasks, task_key, result_key);
        batch.commit()?;

        debug!(task_id = %record.task_id, document_id = %record.document_id, "Saved result");
        Ok(())
    }
}
