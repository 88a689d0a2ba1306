/// Errors from index store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A dataset or permission refers to a base URI that was never registered.
    #[error("base URI is not registered: {0}")]
    BaseUriNotRegistered(String),

    /// Failure reported by SQLite.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored document could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A previous holder of the store lock panicked.
    #[error("store lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
