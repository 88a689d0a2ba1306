use notify_types::DatasetRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StoreResult;

/// Users allowed to search and register datasets under one base URI.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasePermissions {
    pub base_uri: String,
    #[serde(default)]
    pub users_with_search_permissions: Vec<String>,
    #[serde(default)]
    pub users_with_register_permissions: Vec<String>,
}

impl BasePermissions {
    pub fn new(base_uri: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into(),
            ..Self::default()
        }
    }

    pub fn with_search(mut self, user: impl Into<String>) -> Self {
        self.users_with_search_permissions.push(user.into());
        self
    }

    pub fn with_register(mut self, user: impl Into<String>) -> Self {
        self.users_with_register_permissions.push(user.into());
        self
    }
}

/// The SQL-backed index of dataset records.
///
/// All implementations must satisfy these invariants:
/// - A dataset is only stored under a registered base URI.
/// - `uri` is unique: [`upsert`](Self::upsert) with an existing URI replaces
///   that row, so repeating it with identical input changes nothing.
/// - Every mutation is committed before the call returns.
pub trait RelationalIndex: Send + Sync {
    /// Register a base URI. Returns `false` if it was already registered.
    fn register_base_uri(&self, base_uri: &str) -> StoreResult<bool>;

    fn base_uri_exists(&self, base_uri: &str) -> StoreResult<bool>;

    /// All registered base URIs in sorted order.
    fn list_base_uris(&self) -> StoreResult<Vec<String>>;

    /// Replace the permission lists of a registered base URI.
    fn update_permissions(&self, permissions: &BasePermissions) -> StoreResult<()>;

    /// Permissions of a base URI, `None` if it is not registered.
    fn permissions(&self, base_uri: &str) -> StoreResult<Option<BasePermissions>>;

    /// Records with this uuid under this base URI, oldest first.
    fn find_by_uuid(&self, uuid: &str, base_uri: &str) -> StoreResult<Vec<DatasetRecord>>;

    /// Insert the record, or replace the row with the same URI.
    ///
    /// Fails with [`StoreError::BaseUriNotRegistered`](crate::StoreError::BaseUriNotRegistered)
    /// if the record's base URI is unknown.
    fn upsert(&self, record: &DatasetRecord) -> StoreResult<()>;

    /// Delete all rows with exactly this URI. Returns how many were removed.
    fn delete_by_uri(&self, uri: &str) -> StoreResult<usize>;

    /// Records under every base URI `username` may search.
    fn list_datasets_by_user(&self, username: &str) -> StoreResult<Vec<DatasetRecord>>;

    /// Total number of dataset rows.
    fn count(&self) -> StoreResult<usize>;
}

/// The secondary search index of full registration documents, keyed by URI.
pub trait DocumentIndex: Send + Sync {
    /// Create or fully replace the document for `uri`.
    fn upsert(&self, uri: &str, document: &Value) -> StoreResult<()>;

    /// Delete the document(s) for exactly this URI. Returns how many were removed.
    fn delete_by_uri(&self, uri: &str) -> StoreResult<usize>;

    fn get(&self, uri: &str) -> StoreResult<Option<Value>>;

    fn count(&self) -> StoreResult<usize>;
}
