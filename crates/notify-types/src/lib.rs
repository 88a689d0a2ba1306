//! Foundation types for the storage notification receiver.
//!
//! This crate is pure: it performs no I/O. It maps object-storage paths to
//! dataset identities and derives canonical dataset URIs.
//!
//! # Key Types
//!
//! - [`BucketRegistry`]: Static bucket name to base URI mapping
//! - [`ParsedKey`] / [`EntryKind`]: Decomposed object key
//! - [`DatasetRecord`]: Summary row stored in the relational index
//! - [`DatasetInfo`]: Full registration document stored in the document index
//! - [`Notification`]: Discriminated shape of an incoming create/update event

pub mod error;
pub mod key;
pub mod notification;
pub mod record;
pub mod registry;
pub mod uri;

pub use error::{TypeError, TypeResult};
pub use key::{parse_obj_key, parse_objpath, EntryKind, ParsedKey, REGISTRATION_PREFIX};
pub use notification::{Notification, NotificationPayload};
pub use record::{DatasetInfo, DatasetRecord};
pub use registry::BucketRegistry;
pub use uri::{derive_uri, sanitise_base_uri};
