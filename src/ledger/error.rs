use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Result already exists for task: {0}")]
    ResultExists(String),

    #[error("Task is assigned elsewhere: {0}")]
    TaskAssigned(String),

    #[error("Fjall error: {0}")]
    Fjall(#[from] fjall::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LedgerError {
    /// Conditions a caller may fall through on rather than treat as failures
    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            LedgerError::ResultExists(_) | LedgerError::TaskAssigned(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
