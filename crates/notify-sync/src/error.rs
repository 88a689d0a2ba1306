use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// An authoritative notification named a bucket with no base URI.
    #[error("bucket is not configured: {0}")]
    UnknownBucket(String),

    /// A configured base URI is missing from the relational index.
    #[error("base URI is not registered: {0}")]
    BaseUriNotRegistered(String),

    #[error("invalid dataset identity: {0}")]
    Identity(#[from] notify_types::TypeError),

    #[error("store error: {0}")]
    Store(#[from] notify_store::StoreError),

    #[error("package error: {0}")]
    Package(#[from] notify_package::PackageError),
}

impl SyncError {
    /// Misconfiguration rather than a transient or request failure.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::BaseUriNotRegistered(_)
                | Self::Store(notify_store::StoreError::BaseUriNotRegistered(_))
        )
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
