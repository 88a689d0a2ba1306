use crate::error::PackageResult;
use crate::package::Package;

/// Outcome of reading a dataset package.
#[derive(Clone, Debug, PartialEq)]
pub enum PackageRead {
    /// The package is complete and frozen.
    Ready(Package),
    /// Some objects of the package are not written yet. The storage system
    /// will send another notification once they are.
    NotYetComplete { uri: String, reason: String },
}

impl PackageRead {
    pub fn incomplete(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NotYetComplete {
            uri: uri.into(),
            reason: reason.into(),
        }
    }
}

/// Reads the dataset package stored at a URI.
///
/// Implementations must return `Ok(NotYetComplete)` for a package caught
/// mid-write and reserve `Err` for genuine failures (unreadable storage,
/// corrupt metadata, unsupported URI).
pub trait PackageReader: Send + Sync {
    fn read(&self, uri: &str) -> PackageResult<PackageRead>;
}
