use std::sync::Arc;

use notify_store::{DocumentIndex, RelationalIndex};
use notify_types::DatasetInfo;
use serde::Serialize;

use crate::error::SyncResult;

/// Rows removed by [`DualStore::remove`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RemoveReport {
    pub relational: usize,
    pub documents: usize,
}

impl RemoveReport {
    pub fn is_empty(&self) -> bool {
        self.relational == 0 && self.documents == 0
    }
}

/// Result of [`DualStore::upsert`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UpsertReport {
    pub uri: String,
    /// URIs of the same dataset under an earlier name, now removed.
    pub replaced_uris: Vec<String>,
}

/// The relational and document indexes, updated as one logical unit.
///
/// There is no transaction spanning both. The relational index is written
/// first in every operation, so a failure in between leaves at most a stale
/// or missing document-index entry, never a relational row pointing at a
/// purged document. Such drift is not repaired here.
#[derive(Clone)]
pub struct DualStore {
    relational: Arc<dyn RelationalIndex>,
    documents: Arc<dyn DocumentIndex>,
}

impl DualStore {
    pub fn new(relational: Arc<dyn RelationalIndex>, documents: Arc<dyn DocumentIndex>) -> Self {
        Self {
            relational,
            documents,
        }
    }

    pub fn relational(&self) -> &Arc<dyn RelationalIndex> {
        &self.relational
    }

    pub fn documents(&self) -> &Arc<dyn DocumentIndex> {
        &self.documents
    }

    /// Create or fully replace the registration of `info` in both stores.
    ///
    /// Records of the same uuid under the same base URI but a different URI
    /// (the dataset was renamed) are removed first, so a dataset never has
    /// more than one registration per base URI. Repeating the call with the
    /// same input leaves both stores unchanged.
    pub fn upsert(&self, info: &DatasetInfo) -> SyncResult<UpsertReport> {
        let record = &info.record;
        let mut replaced_uris = Vec::new();
        for stale in self.relational.find_by_uuid(&record.uuid, &record.base_uri)? {
            if stale.uri != record.uri {
                tracing::info!(old = %stale.uri, new = %record.uri, "dataset URI changed");
                self.remove(&stale.uri)?;
                replaced_uris.push(stale.uri);
            }
        }

        self.relational.upsert(record)?;
        self.documents.upsert(&record.uri, &info.to_document())?;

        Ok(UpsertReport {
            uri: record.uri.clone(),
            replaced_uris,
        })
    }

    /// Delete every registration with exactly this URI.
    ///
    /// The relational delete is committed before the document delete is
    /// attempted.
    pub fn remove(&self, uri: &str) -> SyncResult<RemoveReport> {
        let relational = self.relational.delete_by_uri(uri)?;
        let documents = self.documents.delete_by_uri(uri)?;
        if relational != documents {
            tracing::warn!(uri, relational, documents, "stores disagreed on removed entries");
        }
        Ok(RemoveReport {
            relational,
            documents,
        })
    }
}

impl std::fmt::Debug for DualStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DualStore").finish_non_exhaustive()
    }
}
