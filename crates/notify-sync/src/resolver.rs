use std::sync::Arc;

use notify_store::RelationalIndex;
use notify_types::derive_uri;

use crate::error::{SyncError, SyncResult};

/// Reconstructs dataset URIs from `(base URI, uuid)`.
///
/// The object key carries the uuid but not the dataset name, and disk URIs
/// depend on the name, so the name has to come from the relational index.
#[derive(Clone)]
pub struct IdentityResolver {
    relational: Arc<dyn RelationalIndex>,
}

impl IdentityResolver {
    pub fn new(relational: Arc<dyn RelationalIndex>) -> Self {
        Self { relational }
    }

    /// URI of the dataset `uuid` registered under `base_uri`.
    ///
    /// Returns `Ok(None)` when no such dataset is registered. Fails with
    /// [`SyncError::BaseUriNotRegistered`] when `base_uri` itself is unknown
    /// to the index. If several rows match, the oldest wins.
    pub fn resolve_uri(&self, base_uri: &str, uuid: &str) -> SyncResult<Option<String>> {
        if !self.relational.base_uri_exists(base_uri)? {
            return Err(SyncError::BaseUriNotRegistered(base_uri.to_string()));
        }

        let rows = self.relational.find_by_uuid(uuid, base_uri)?;
        if rows.len() > 1 {
            tracing::warn!(uuid, base_uri, matches = rows.len(), "multiple records for one dataset");
        }
        match rows.first() {
            Some(row) => Ok(Some(derive_uri(&row.name, &row.uuid, base_uri)?)),
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for IdentityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityResolver").finish_non_exhaustive()
    }
}
