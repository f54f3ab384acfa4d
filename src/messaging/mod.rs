//! Channel the worker reports job results through

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Mutex;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::job::{Job, JobResponse};

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Publish failed: {0}")]
    PublishFailed(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ChannelError>;

/// Outbound side of the task framework
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Report a terminal response for a job
    async fn publish_response(&self, job: &Job, response: &JobResponse) -> Result<()>;

    /// Refuse a job so that it is delivered again later
    async fn requeue(&self, job: &Job) -> Result<()>;
}

#[derive(Serialize)]
struct RequeueLine<'a> {
    requeue: &'a str,
}

/// Prints one JSON line per message to stdout
#[derive(Debug, Clone, Default)]
pub struct StdoutChannel;

impl StdoutChannel {
    pub fn new() -> Self {
        Self
    }

    async fn write_line(line: String) -> Result<()> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(line.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl MessageChannel for StdoutChannel {
    async fn publish_response(&self, job: &Job, response: &JobResponse) -> Result<()> {
        tracing::debug!(task_id = %job.task.id, state = response.state, "Publishing response");
        Self::write_line(serde_json::to_string(response)?).await
    }

    async fn requeue(&self, job: &Job) -> Result<()> {
        tracing::debug!(task_id = %job.task.id, "Publishing requeue");
        Self::write_line(serde_json::to_string(&RequeueLine {
            requeue: &job.task.id,
        })?)
        .await
    }
}

/// What a [`RecordingChannel`] saw
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelMessage {
    Response { task_id: String, response: JobResponse },
    Requeue { task_id: String },
}

/// Keeps every message in memory, for tests and dry runs
#[derive(Debug, Default)]
pub struct RecordingChannel {
    messages: Mutex<Vec<ChannelMessage>>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<ChannelMessage> {
        self.messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }

    fn push(&self, message: ChannelMessage) -> Result<()> {
        self.messages
            .lock()
            .map_err(|e| ChannelError::PublishFailed(e.to_string()))?
            .push(message);
        Ok(())
    }
}

#[async_trait]
impl MessageChannel for RecordingChannel {
    async fn publish_response(&self, job: &Job, response: &JobResponse) -> Result<()> {
        self.push(ChannelMessage::Response {
            task_id: job.task.id.clone(),
            response: response.clone(),
        })
    }

    async fn requeue(&self, job: &Job) -> Result<()> {
        self.push(ChannelMessage::Requeue {
            task_id: job.task.id.clone(),
        })
    }
}
