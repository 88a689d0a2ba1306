//! Dataset package reading.
//!
//! A dataset package is the set of objects written under a dataset URI:
//! admin metadata, manifest, README, tags and annotations. Readers return an
//! explicit [`PackageRead`] so that a package caught mid-write is a normal
//! outcome rather than an error.
//!
//! # Readers
//!
//! - [`DiskPackageReader`]: `file://` datasets laid out on a local filesystem
//! - [`InMemoryPackageReader`]: packages registered programmatically, for tests

pub mod disk;
pub mod error;
pub mod memory;
pub mod package;
pub mod reader;

pub use disk::DiskPackageReader;
pub use error::{PackageError, PackageResult};
pub use memory::InMemoryPackageReader;
pub use package::{AdminMetadata, Package, DATASET_TYPE, PROTO_DATASET_TYPE};
pub use reader::{PackageRead, PackageReader};
