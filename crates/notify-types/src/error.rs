use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid base URI {uri}: {reason}")]
    InvalidBaseUri { uri: String, reason: String },

    #[error("dataset name must not be empty")]
    EmptyName,

    #[error("dataset uuid must not be empty")]
    EmptyUuid,

    #[error("notification payload is missing the bucket name")]
    MissingBucket,

    #[error("malformed notification payload: {0}")]
    MalformedPayload(String),
}

pub type TypeResult<T> = Result<T, TypeError>;
