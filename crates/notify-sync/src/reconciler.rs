use std::fmt;
use std::sync::Arc;

use notify_package::{PackageRead, PackageReader};
use notify_store::{DocumentIndex, RelationalIndex};
use notify_types::{derive_uri, parse_objpath, BucketRegistry, EntryKind, Notification, ParsedKey};
use serde::Serialize;

use crate::error::{SyncError, SyncResult};
use crate::resolver::IdentityResolver;
use crate::synchronizer::DualStore;

/// Why a notification ended without touching the stores.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum IgnoreReason {
    /// The key has no recognizable dataset shape.
    UnrecognizedKey,
    /// No configured bucket prefixes the key.
    UnknownBucket,
    /// A create/update of an object that does not change dataset metadata.
    NotMetadataChange { kind: EntryKind },
    /// A delete of an object other than the dataset marker.
    NotMarker { kind: EntryKind },
    /// The dataset is not registered.
    NotRegistered { uuid: String },
    /// The package is still being written; a later notification will follow.
    PackageIncomplete { uri: String, detail: String },
    /// The package read at `uri` describes another dataset than requested.
    IdentityMismatch {
        uri: String,
        expected_uuid: String,
        found_uuid: String,
        found_uri: String,
    },
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnrecognizedKey => write!(f, "unrecognized key"),
            Self::UnknownBucket => write!(f, "unknown bucket"),
            Self::NotMetadataChange { kind } => write!(f, "{kind} change needs no registration"),
            Self::NotMarker { kind } => write!(f, "deleting {kind} does not delete the dataset"),
            Self::NotRegistered { uuid } => write!(f, "dataset {uuid} is not registered"),
            Self::PackageIncomplete { uri, detail } => write!(f, "{uri} incomplete: {detail}"),
            Self::IdentityMismatch {
                uri,
                expected_uuid,
                found_uuid,
                found_uri,
            } => write!(
                f,
                "{uri} holds dataset {found_uuid} at {found_uri}, expected {expected_uuid}"
            ),
        }
    }
}

/// Terminal state of one notification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Registered { uri: String },
    Deleted { uri: String },
    Ignored(IgnoreReason),
}

/// Drives create/update and delete notifications to an [`Outcome`].
///
/// Holds no mutable state of its own; concurrent notifications for the same
/// dataset are not ordered against each other.
#[derive(Clone)]
pub struct Reconciler {
    registry: Arc<BucketRegistry>,
    resolver: IdentityResolver,
    store: DualStore,
    reader: Arc<dyn PackageReader>,
}

impl Reconciler {
    pub fn new(
        registry: Arc<BucketRegistry>,
        relational: Arc<dyn RelationalIndex>,
        documents: Arc<dyn DocumentIndex>,
        reader: Arc<dyn PackageReader>,
    ) -> Self {
        Self {
            registry,
            resolver: IdentityResolver::new(relational.clone()),
            store: DualStore::new(relational, documents),
            reader,
        }
    }

    pub fn registry(&self) -> &BucketRegistry {
        &self.registry
    }

    pub fn store(&self) -> &DualStore {
        &self.store
    }

    pub fn parse(&self, objpath: &str) -> ParsedKey {
        parse_objpath(objpath, &self.registry)
    }

    /// Handle an object created or updated.
    ///
    /// Inline metadata registers the named dataset directly. Otherwise only
    /// README, tag and annotation changes of an already registered dataset
    /// trigger re-registration.
    pub fn create_or_update(&self, notification: &Notification) -> SyncResult<Outcome> {
        match notification {
            Notification::InlineMetadata { bucket, uuid, name } => {
                let base_uri = self
                    .registry
                    .base_uri(bucket)
                    .ok_or_else(|| SyncError::UnknownBucket(bucket.clone()))?;
                let uri = derive_uri(name, uuid, base_uri)?;
                self.register(&uri, base_uri, uuid)
            }
            Notification::KeyOnly { objpath } => {
                let parsed = self.parse(objpath);
                let kind = match &parsed.kind {
                    None => return Ok(ignore(objpath, IgnoreReason::UnrecognizedKey)),
                    Some(kind) if !kind.is_metadata_change() => {
                        let reason = IgnoreReason::NotMetadataChange { kind: kind.clone() };
                        return Ok(ignore(objpath, reason));
                    }
                    Some(kind) => kind,
                };
                let Some((base_uri, uuid)) = identity(objpath, &parsed) else {
                    return Ok(ignore(objpath, unresolvable(&parsed)));
                };
                tracing::debug!(objpath, %kind, uuid, "metadata changed");
                match self.resolver.resolve_uri(base_uri, uuid)? {
                    Some(uri) => self.register(&uri, base_uri, uuid),
                    None => Ok(ignore(
                        objpath,
                        IgnoreReason::NotRegistered {
                            uuid: uuid.to_string(),
                        },
                    )),
                }
            }
        }
    }

    /// Handle an object deleted.
    ///
    /// Only removal of the dataset marker deletes the dataset. Deleting an
    /// unregistered dataset is a no-op.
    pub fn delete(&self, objpath: &str) -> SyncResult<Outcome> {
        let parsed = self.parse(objpath);
        match &parsed.kind {
            Some(EntryKind::Marker) => {}
            Some(kind) => {
                let reason = IgnoreReason::NotMarker { kind: kind.clone() };
                return Ok(ignore(objpath, reason));
            }
            None => return Ok(ignore(objpath, IgnoreReason::UnrecognizedKey)),
        }
        let Some((base_uri, uuid)) = identity(objpath, &parsed) else {
            return Ok(ignore(objpath, unresolvable(&parsed)));
        };

        let Some(uri) = self.resolver.resolve_uri(base_uri, uuid)? else {
            return Ok(ignore(
                objpath,
                IgnoreReason::NotRegistered {
                    uuid: uuid.to_string(),
                },
            ));
        };
        tracing::info!(%uri, "deleting dataset");
        let report = self.store.remove(&uri)?;
        tracing::debug!(%uri, relational = report.relational, documents = report.documents, "dataset deleted");
        Ok(Outcome::Deleted { uri })
    }

    /// Re-read the package at `uri` and register it under `base_uri`.
    ///
    /// The package must be dataset `uuid` and its admin metadata must derive
    /// back to `uri`; otherwise nothing is written.
    fn register(&self, uri: &str, base_uri: &str, uuid: &str) -> SyncResult<Outcome> {
        match self.reader.read(uri)? {
            PackageRead::Ready(package) => {
                let info = package.registration_info(base_uri)?;
                if info.uuid() != uuid || info.uri() != uri {
                    let reason = IgnoreReason::IdentityMismatch {
                        uri: uri.to_string(),
                        expected_uuid: uuid.to_string(),
                        found_uuid: info.uuid().to_string(),
                        found_uri: info.uri().to_string(),
                    };
                    tracing::warn!(%reason, "package identity does not match notification");
                    return Ok(Outcome::Ignored(reason));
                }
                tracing::info!(uri = %info.uri(), uuid = %info.uuid(), "registering dataset");
                let report = self.store.upsert(&info)?;
                Ok(Outcome::Registered { uri: report.uri })
            }
            PackageRead::NotYetComplete { uri, reason } => {
                tracing::warn!(%uri, %reason, "package not fully written, skipping registration");
                Ok(Outcome::Ignored(IgnoreReason::PackageIncomplete {
                    uri,
                    detail: reason,
                }))
            }
        }
    }
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("buckets", &self.registry.len())
            .finish_non_exhaustive()
    }
}

fn identity<'a>(objpath: &str, parsed: &'a ParsedKey) -> Option<(&'a str, &'a str)> {
    let identity = parsed.identity();
    if parsed.base_uri.is_none() {
        tracing::warn!(objpath, "no configured bucket matches key");
    }
    identity
}

fn unresolvable(parsed: &ParsedKey) -> IgnoreReason {
    if parsed.base_uri.is_none() {
        IgnoreReason::UnknownBucket
    } else {
        IgnoreReason::UnrecognizedKey
    }
}

fn ignore(objpath: &str, reason: IgnoreReason) -> Outcome {
    tracing::debug!(objpath, %reason, "ignoring notification");
    Outcome::Ignored(reason)
}
