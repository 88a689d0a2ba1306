use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use notify_types::DatasetRecord;
use serde_json::Value;

use crate::error::{StoreError, StoreResult};
use crate::traits::{BasePermissions, DocumentIndex, RelationalIndex};

fn read<T>(lock: &RwLock<T>) -> StoreResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|e| StoreError::LockPoisoned(e.to_string()))
}

fn write<T>(lock: &RwLock<T>) -> StoreResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|e| StoreError::LockPoisoned(e.to_string()))
}

#[derive(Debug, Default)]
struct Tables {
    /// Base URI to its permissions.
    base_uris: BTreeMap<String, BasePermissions>,
    /// Dataset rows in insertion order.
    datasets: Vec<DatasetRecord>,
}

/// In-memory implementation of [`RelationalIndex`].
///
/// Intended for tests and embedding. Data is lost when the index is dropped.
#[derive(Debug, Default)]
pub struct InMemoryRelationalIndex {
    tables: RwLock<Tables>,
}

impl InMemoryRelationalIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RelationalIndex for InMemoryRelationalIndex {
    fn register_base_uri(&self, base_uri: &str) -> StoreResult<bool> {
        let mut tables = write(&self.tables)?;
        if tables.base_uris.contains_key(base_uri) {
            return Ok(false);
        }
        tables
            .base_uris
            .insert(base_uri.to_string(), BasePermissions::new(base_uri));
        Ok(true)
    }

    fn base_uri_exists(&self, base_uri: &str) -> StoreResult<bool> {
        Ok(read(&self.tables)?.base_uris.contains_key(base_uri))
    }

    fn list_base_uris(&self) -> StoreResult<Vec<String>> {
        Ok(read(&self.tables)?.base_uris.keys().cloned().collect())
    }

    fn update_permissions(&self, permissions: &BasePermissions) -> StoreResult<()> {
        let mut tables = write(&self.tables)?;
        let slot = tables
            .base_uris
            .get_mut(&permissions.base_uri)
            .ok_or_else(|| StoreError::BaseUriNotRegistered(permissions.base_uri.clone()))?;
        *slot = permissions.clone();
        Ok(())
    }

    fn permissions(&self, base_uri: &str) -> StoreResult<Option<BasePermissions>> {
        Ok(read(&self.tables)?.base_uris.get(base_uri).cloned())
    }

    fn find_by_uuid(&self, uuid: &str, base_uri: &str) -> StoreResult<Vec<DatasetRecord>> {
        Ok(read(&self.tables)?
            .datasets
            .iter()
            .filter(|r| r.uuid == uuid && r.base_uri == base_uri)
            .cloned()
            .collect())
    }

    fn upsert(&self, record: &DatasetRecord) -> StoreResult<()> {
        let mut tables = write(&self.tables)?;
        if !tables.base_uris.contains_key(&record.base_uri) {
            return Err(StoreError::BaseUriNotRegistered(record.base_uri.clone()));
        }
        match tables.datasets.iter_mut().find(|r| r.uri == record.uri) {
            Some(existing) => *existing = record.clone(),
            None => tables.datasets.push(record.clone()),
        }
        Ok(())
    }

    fn delete_by_uri(&self, uri: &str) -> StoreResult<usize> {
        let mut tables = write(&self.tables)?;
        let before = tables.datasets.len();
        tables.datasets.retain(|r| r.uri != uri);
        Ok(before - tables.datasets.len())
    }

    fn list_datasets_by_user(&self, username: &str) -> StoreResult<Vec<DatasetRecord>> {
        let tables = read(&self.tables)?;
        Ok(tables
            .datasets
            .iter()
            .filter(|r| {
                tables.base_uris.get(&r.base_uri).is_some_and(|p| {
                    p.users_with_search_permissions.iter().any(|u| u == username)
                })
            })
            .cloned()
            .collect())
    }

    fn count(&self) -> StoreResult<usize> {
        Ok(read(&self.tables)?.datasets.len())
    }
}

/// In-memory implementation of [`DocumentIndex`].
#[derive(Debug, Default)]
pub struct InMemoryDocumentIndex {
    documents: RwLock<HashMap<String, Value>>,
}

impl InMemoryDocumentIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentIndex for InMemoryDocumentIndex {
    fn upsert(&self, uri: &str, document: &Value) -> StoreResult<()> {
        write(&self.documents)?.insert(uri.to_string(), document.clone());
        Ok(())
    }

    fn delete_by_uri(&self, uri: &str) -> StoreResult<usize> {
        Ok(usize::from(write(&self.documents)?.remove(uri).is_some()))
    }

    fn get(&self, uri: &str) -> StoreResult<Option<Value>> {
        Ok(read(&self.documents)?.get(uri).cloned())
    }

    fn count(&self) -> StoreResult<usize> {
        Ok(read(&self.documents)?.len())
    }
}
