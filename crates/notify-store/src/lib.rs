//! Dataset index storage for the notification receiver.
//!
//! Two independent stores hold every registered dataset:
//!
//! - a [`RelationalIndex`] of summary records, base URIs and per-user search
//!   permissions. It is the source of truth.
//! - a [`DocumentIndex`] of full registration documents keyed by URI, used
//!   for metadata search.
//!
//! # Storage Backends
//!
//! - [`InMemoryRelationalIndex`] / [`InMemoryDocumentIndex`]: for tests and embedding
//! - [`SqliteRelationalIndex`] / [`SqliteDocumentIndex`]: persistent, `rusqlite`-backed
//!
//! Every mutating call commits before it returns. There is no transaction
//! spanning both stores.

pub mod error;
pub mod memory;
pub mod sqlite;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::{InMemoryDocumentIndex, InMemoryRelationalIndex};
pub use sqlite::{SqliteDocumentIndex, SqliteRelationalIndex};
pub use traits::{BasePermissions, DocumentIndex, RelationalIndex};
