//! Object-key parsing.
//!
//! Storage systems report changes by object path. A dataset stored in a
//! bucket lays its objects out as
//!
//! ```text
//! <bucket>_<uuid>/dtool
//! <bucket>_<uuid>/README.yml
//! <bucket>_<uuid>/data/<item>
//! <bucket>_<uuid>/tags/<tag>
//! <bucket>_<uuid>/annotations/<name>
//! dtool-<uuid>                      (registration marker)
//! ```
//!
//! Parsing recovers the dataset uuid and which part of the dataset changed.
//! It never fails: key shapes it does not understand yield no uuid and no
//! kind, and callers ignore them.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::registry::BucketRegistry;

/// Prefix of the one-segment key that marks an in-progress registration.
pub const REGISTRATION_PREFIX: &str = "dtool-";

/// Which part of a dataset an object key refers to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// An item under `data/`.
    Data,
    /// A tag under `tags/`.
    Tags,
    /// An annotation under `annotations/`.
    Annotations,
    /// The dataset README.
    Readme,
    /// The top-level `dtool` marker whose presence defines the dataset.
    Marker,
    /// The `dtool-<uuid>` registration key.
    Registration,
    /// Any other final path component (manifest, structure, ...).
    Other(String),
}

impl EntryKind {
    fn from_component(component: &str) -> Self {
        match component {
            "data" => Self::Data,
            "tags" => Self::Tags,
            "annotations" => Self::Annotations,
            "README.yml" => Self::Readme,
            "dtool" => Self::Marker,
            other => Self::Other(other.to_string()),
        }
    }

    /// The key component this kind was parsed from.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Data => "data",
            Self::Tags => "tags",
            Self::Annotations => "annotations",
            Self::Readme => "README.yml",
            Self::Marker => "dtool",
            Self::Registration => "__REGISTRATION_KEY__",
            Self::Other(s) => s,
        }
    }

    /// A change to dataset metadata that requires re-registration of an
    /// already registered dataset.
    pub fn is_metadata_change(&self) -> bool {
        matches!(self, Self::Readme | Self::Tags | Self::Annotations)
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EntryKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Result of decomposing an object path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ParsedKey {
    /// Base URI of the bucket prefixing the path, if any registered bucket did.
    pub base_uri: Option<String>,
    pub uuid: Option<String>,
    pub kind: Option<EntryKind>,
}

impl ParsedKey {
    /// Both a base URI and a uuid are known, so the dataset can be resolved.
    pub fn identity(&self) -> Option<(&str, &str)> {
        Some((self.base_uri.as_deref()?, self.uuid.as_deref()?))
    }
}

/// Decompose a key with the bucket prefix already removed.
///
/// With two or more components `[.., X, Y]`: if `X` is `data`, `tags` or
/// `annotations` the uuid is the component before `X` and the kind is `X`;
/// otherwise the uuid is `X` and the kind is `Y`. A single component starting
/// with `dtool-` is the registration marker.
pub fn parse_obj_key(key: &str) -> (Option<String>, Option<EntryKind>) {
    let components: Vec<&str> = key.split('/').collect();
    let n = components.len();

    if n > 1 {
        let second_last = components[n - 2];
        match second_last {
            "data" | "tags" | "annotations" => {
                let uuid = n.checked_sub(3).map(|i| components[i].to_string());
                (uuid, Some(EntryKind::from_component(second_last)))
            }
            _ => (
                Some(second_last.to_string()),
                Some(EntryKind::from_component(components[n - 1])),
            ),
        }
    } else {
        match key.strip_prefix(REGISTRATION_PREFIX) {
            Some(uuid) => (Some(uuid.to_string()), Some(EntryKind::Registration)),
            None => (None, None),
        }
    }
}

/// Decompose a full object path as delivered by the storage system.
///
/// The registered bucket prefixing the path supplies the base URI and is
/// stripped before [`parse_obj_key`] runs. Paths that no bucket prefixes are
/// parsed as-is and carry no base URI.
pub fn parse_objpath(objpath: &str, registry: &BucketRegistry) -> ParsedKey {
    let (base_uri, key) = match registry.strip_bucket(objpath) {
        Some((base_uri, rest)) => (Some(base_uri.to_string()), rest),
        None => (None, objpath),
    };
    let (uuid, kind) = parse_obj_key(key);
    ParsedKey {
        base_uri,
        uuid,
        kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn registry() -> BucketRegistry {
        BucketRegistry::new()
            .with("bucket", "s3://bucket")
            .with("archive", "ecs://archive")
    }

    #[test]
    fn marker_key() {
        let parsed = parse_objpath("bucket_1234/dtool", &registry());
        assert_eq!(parsed.base_uri.as_deref(), Some("s3://bucket"));
        assert_eq!(parsed.uuid.as_deref(), Some("1234"));
        assert_eq!(parsed.kind, Some(EntryKind::Marker));
        assert_eq!(parsed.identity(), Some(("s3://bucket", "1234")));
    }

    #[test]
    fn nested_entries() {
        assert_eq!(
            parse_obj_key("1234/data/some/nested/file.txt"),
            (Some("nested".into()), Some(EntryKind::Other("file.txt".into())))
        );
        assert_eq!(
            parse_obj_key("1234/data/file.txt"),
            (Some("1234".into()), Some(EntryKind::Data))
        );
        assert_eq!(
            parse_obj_key("1234/tags/production"),
            (Some("1234".into()), Some(EntryKind::Tags))
        );
        assert_eq!(
            parse_obj_key("1234/annotations/project.json"),
            (Some("1234".into()), Some(EntryKind::Annotations))
        );
        assert_eq!(
            parse_obj_key("1234/README.yml"),
            (Some("1234".into()), Some(EntryKind::Readme))
        );
        assert_eq!(
            parse_obj_key("1234/manifest.json"),
            (Some("1234".into()), Some(EntryKind::Other("manifest.json".into())))
        );
    }

    #[test]
    fn data_without_uuid_component() {
        assert_eq!(parse_obj_key("data/file.txt"), (None, Some(EntryKind::Data)));
    }

    #[test]
    fn registration_key() {
        assert_eq!(
            parse_obj_key("dtool-1234"),
            (Some("1234".into()), Some(EntryKind::Registration))
        );
        let parsed = parse_objpath("dtool-abcd", &BucketRegistry::new());
        assert_eq!(parsed.uuid.as_deref(), Some("abcd"));
        assert_eq!(parsed.kind, Some(EntryKind::Registration));
        assert!(parsed.base_uri.is_none());
    }

    #[test]
    fn unrecognized_single_component() {
        assert_eq!(parse_obj_key("something"), (None, None));
        let parsed = parse_objpath("bucket_something", &registry());
        assert_eq!(parsed.base_uri.as_deref(), Some("s3://bucket"));
        assert_eq!(parsed.kind, None);
        assert_eq!(parsed.identity(), None);
    }

    #[test]
    fn unknown_bucket_has_no_base_uri() {
        let parsed = parse_objpath("elsewhere_1234/dtool", &registry());
        assert!(parsed.base_uri.is_none());
        assert_eq!(parsed.uuid.as_deref(), Some("elsewhere_1234"));
        assert_eq!(parsed.identity(), None);
    }

    #[test]
    fn metadata_kinds() {
        assert!(EntryKind::Readme.is_metadata_change());
        assert!(EntryKind::Tags.is_metadata_change());
        assert!(EntryKind::Annotations.is_metadata_change());
        assert!(!EntryKind::Data.is_metadata_change());
        assert!(!EntryKind::Marker.is_metadata_change());
        assert_eq!(EntryKind::Marker.to_string(), "dtool");
    }

    proptest! {
        #[test]
        fn marker_roundtrip(bucket in "[a-z][a-z0-9-]{0,15}", uuid in "[0-9a-f-]{1,36}") {
            let reg = BucketRegistry::new().with(bucket.clone(), "s3://base");
            let parsed = parse_objpath(&format!("{bucket}_{uuid}/dtool"), &reg);
            prop_assert_eq!(parsed.base_uri.as_deref(), Some("s3://base"));
            prop_assert_eq!(parsed.uuid.as_deref(), Some(uuid.as_str()));
            prop_assert_eq!(parsed.kind, Some(EntryKind::Marker));
        }

        #[test]
        fn data_item(bucket in "[a-z][a-z0-9-]{0,15}", uuid in "[0-9a-f-]{1,36}", item in "[a-zA-Z0-9._]{1,20}") {
            let reg = BucketRegistry::new().with(bucket.clone(), "s3://base");
            let parsed = parse_objpath(&format!("{bucket}_{uuid}/data/{item}"), &reg);
            prop_assert_eq!(parsed.base_uri.as_deref(), Some("s3://base"));
            prop_assert_eq!(parsed.uuid.as_deref(), Some(uuid.as_str()));
            prop_assert_eq!(parsed.kind, Some(EntryKind::Data));
        }

        #[test]
        fn registration_ignores_registry(bucket in "[a-z]{1,8}") {
            let uuid = uuid::Uuid::new_v4().to_string();
            let reg = BucketRegistry::new().with(bucket, "s3://base");
            let parsed = parse_objpath(&format!("dtool-{uuid}"), &reg);
            prop_assert_eq!(parsed.uuid.as_deref(), Some(uuid.as_str()));
            prop_assert_eq!(parsed.kind, Some(EntryKind::Registration));
        }
    }
}
