use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("LOCKED: another instance already holds {0}")]
    Locked(String),

    #[error("UnitOfWork is read-only; write operations are blocked")]
    ReadOnlyViolation,

    #[error("role/db path mismatch: role {role} requires a db path containing '{expected}', got {path}")]
    RoleMismatch { role: String, expected: String, path: String },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
