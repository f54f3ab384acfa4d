//! Job envelope exchanged with the task-distribution framework
//!
//! A job is a `(Task, Document)` pair. The document names the source
//! resource, the task names the kind of processing and may carry a
//! directory hint under `args.PATHS.TEMP_FOLDER`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Task kind handled by this worker
pub const DOWNLOAD_TASK_KIND: &str = "DOWNLOAD";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Target {
    pub id: String,
    pub url: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Creator {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// The framework's record of a source resource
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    #[serde(rename = "_id")]
    pub id: String,
    pub target: Target,
    pub creator: Creator,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskPaths {
    #[serde(rename = "TEMP_FOLDER", default, skip_serializing_if = "Option::is_none")]
    pub temp_folder: Option<PathBuf>,
    #[serde(rename = "OUT_FOLDER", default, skip_serializing_if = "Option::is_none")]
    pub out_folder: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskArgs {
    #[serde(rename = "PATHS", default, skip_serializing_if = "Option::is_none")]
    pub paths: Option<TaskPaths>,
}

/// A unit of work naming a kind of processing for one document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    #[serde(rename = "_id")]
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub args: TaskArgs,
}

impl Task {
    /// Directory hint supplied with the task, if any
    pub fn temp_folder_hint(&self) -> Option<&PathBuf> {
        self.args.paths.as_ref()?.temp_folder.as_ref()
    }
}

/// What the worker receives from the message channel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub task: Task,
    pub document: Document,
}

/// Identity and location of the resource a job asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub document_id: String,
    pub collection_id: String,
    pub source_uri: String,
}

impl From<&Document> for SourceDescriptor {
    fn from(document: &Document) -> Self {
        Self {
            document_id: document.id.clone(),
            collection_id: document.creator.id.clone(),
            source_uri: document.target.url.trim().to_string(),
        }
    }
}

/// Which download strategy a source URI needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Http,
    S3,
}

impl SourceKind {
    pub fn from_uri(uri: &str) -> Option<Self> {
        let lower = uri.trim_start().to_ascii_lowercase();
        if lower.starts_with("s3://") {
            Some(SourceKind::S3)
        } else if lower.starts_with("http://") || lower.starts_with("https://") {
            Some(SourceKind::Http)
        } else {
            None
        }
    }
}

/// Framework-facing response: `{state, message, ...details}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobResponse {
    pub state: u16,
    pub message: String,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl JobResponse {
    pub fn new(state: u16, message: impl Into<String>) -> Self {
        Self {
            state,
            message: message.into(),
            details: Map::new(),
        }
    }

    pub fn with_details(mut self, details: Map<String, Value>) -> Self {
        self.details.extend(details);
        self
    }
}
