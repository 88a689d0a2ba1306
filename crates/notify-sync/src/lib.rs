//! Notification reconciliation.
//!
//! Turns object-storage change notifications into registrations and
//! deletions of datasets. Each notification walks
//! `received → parsed → resolved → registered | deleted | ignored`:
//!
//! - [`IdentityResolver`] maps `(base URI, uuid)` back to a dataset URI via
//!   the relational index.
//! - [`DualStore`] applies matched upserts and removals to the relational
//!   and document indexes. It is not atomic across the two; the relational
//!   index is the source of truth.
//! - [`Reconciler`] drives one notification to its terminal [`Outcome`].

pub mod error;
pub mod reconciler;
pub mod resolver;
pub mod synchronizer;

pub use error::{SyncError, SyncResult};
pub use reconciler::{IgnoreReason, Outcome, Reconciler};
pub use resolver::IdentityResolver;
pub use synchronizer::{DualStore, RemoveReport, UpsertReport};
