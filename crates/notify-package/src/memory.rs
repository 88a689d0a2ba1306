use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{PackageError, PackageResult};
use crate::package::Package;
use crate::reader::{PackageRead, PackageReader};

type Packages = HashMap<String, PackageRead>;

fn read(lock: &RwLock<Packages>) -> PackageResult<RwLockReadGuard<'_, Packages>> {
    lock.read()
        .map_err(|e| PackageError::LockPoisoned(e.to_string()))
}

fn write(lock: &RwLock<Packages>) -> PackageResult<RwLockWriteGuard<'_, Packages>> {
    lock.write()
        .map_err(|e| PackageError::LockPoisoned(e.to_string()))
}

/// A [`PackageReader`] over packages held in memory.
///
/// Intended for tests: packages are inserted explicitly, optionally in an
/// incomplete state. Unknown URIs read as [`PackageError::NotFound`].
#[derive(Debug, Default)]
pub struct InMemoryPackageReader {
    packages: RwLock<Packages>,
}

impl InMemoryPackageReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `package` readable at its URI.
    pub fn insert(&self, package: Package) -> PackageResult<()> {
        write(&self.packages)?.insert(package.uri.clone(), PackageRead::Ready(package));
        Ok(())
    }

    /// Mark `uri` as holding a partially written package.
    pub fn insert_incomplete(&self, uri: &str) -> PackageResult<()> {
        write(&self.packages)?
            .insert(uri.to_string(), PackageRead::incomplete(uri, "still being written"));
        Ok(())
    }

    pub fn remove(&self, uri: &str) -> PackageResult<bool> {
        Ok(write(&self.packages)?.remove(uri).is_some())
    }
}

impl PackageReader for InMemoryPackageReader {
    fn read(&self, uri: &str) -> PackageResult<PackageRead> {
        read(&self.packages)?
            .get(uri)
            .cloned()
            .ok_or_else(|| PackageError::NotFound(uri.to_string()))
    }
}
