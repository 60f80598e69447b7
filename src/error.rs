use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage failure: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("document encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("invalid record {id}: {reason}")]
    InvalidRecord { id: String, reason: String },
    #[error("store schema is invalid: {0}")]
    Schema(String),
    #[error("store connection lock poisoned")]
    LockPoisoned,
    #[error("store task failed: {0}")]
    Task(String),
}

/// Import rejected before anything was written.
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("backup is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid file structure")]
    InvalidStructure,
}

#[derive(Debug, Error)]
pub enum RestoreError {
    #[error(transparent)]
    Rejected(#[from] BackupError),
    /// The transaction rolled back; the previous local data is untouched.
    #[error("restore aborted, local data unchanged: {0}")]
    Aborted(#[source] StoreError),
    /// The prior state is gone and the new one did not fully land.
    #[error("restore left the store incomplete: expected {expected} records, found {found}")]
    DataLoss { expected: usize, found: usize },
    /// Committed, but the record count could not be read back.
    #[error("restore committed but could not be verified: {0}")]
    Unverified(#[source] StoreError),
}

impl RestoreError {
    /// Errors after which the local data may no longer match either side.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            RestoreError::DataLoss { .. } | RestoreError::Unverified(_)
        )
    }
}
