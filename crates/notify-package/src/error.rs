use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("dataset not found: {0}")]
    NotFound(String),

    #[error("unsupported URI scheme for {uri}: {scheme}")]
    UnsupportedScheme { uri: String, scheme: String },

    #[error("invalid dataset URI {uri}: {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("malformed {file} in {uri}: {reason}")]
    Malformed {
        uri: String,
        file: &'static str,
        reason: String,
    },

    #[error("invalid dataset identity: {0}")]
    Identity(#[from] notify_types::TypeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

pub type PackageResult<T> = Result<T, PackageError>;
