//! Reader for datasets stored on a local filesystem.
//!
//! Layout under the dataset directory:
//!
//! ```text
//! .dtool/dtool                  admin metadata (JSON)
//! .dtool/manifest.json          item manifest (JSON)
//! .dtool/tags/<tag>             one empty file per tag
//! .dtool/annotations/<n>.json   one JSON value per annotation
//! README.yml
//! data/...
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;
use url::Url;

use crate::error::{PackageError, PackageResult};
use crate::package::{AdminMetadata, Package};
use crate::reader::{PackageRead, PackageReader};

const ADMIN_METADATA: &str = ".dtool/dtool";
const MANIFEST: &str = ".dtool/manifest.json";
const TAGS_DIR: &str = ".dtool/tags";
const ANNOTATIONS_DIR: &str = ".dtool/annotations";
const README: &str = "README.yml";

/// Reads `file://` URIs (or bare absolute paths) from the local filesystem.
#[derive(Debug, Default, Clone)]
pub struct DiskPackageReader;

impl DiskPackageReader {
    pub fn new() -> Self {
        Self
    }

    /// Local directory of a dataset URI. The host part of `file://host/path`
    /// is ignored and the path is percent-decoded.
    pub fn dataset_path(uri: &str) -> PackageResult<PathBuf> {
        if uri.starts_with('/') {
            return Ok(PathBuf::from(uri));
        }
        let url = Url::parse(uri).map_err(|e| PackageError::InvalidUri {
            uri: uri.to_string(),
            reason: e.to_string(),
        })?;
        if url.scheme() != "file" {
            return Err(PackageError::UnsupportedScheme {
                uri: uri.to_string(),
                scheme: url.scheme().to_string(),
            });
        }
        let invalid = |reason: String| PackageError::InvalidUri {
            uri: uri.to_string(),
            reason,
        };
        let local = Url::parse(&format!("file://{}", url.path()))
            .map_err(|e| invalid(e.to_string()))?;
        local
            .to_file_path()
            .map_err(|()| invalid("not a local path".into()))
    }
}

/// Read a file, mapping "not found" to `None`.
fn read_optional(path: &Path) -> PackageResult<Option<String>> {
    match fs::read_to_string(path) {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn malformed(uri: &str, file: &'static str, reason: impl ToString) -> PackageError {
    PackageError::Malformed {
        uri: uri.to_string(),
        file,
        reason: reason.to_string(),
    }
}

fn read_tags(root: &Path) -> PackageResult<Vec<String>> {
    let dir = root.join(TAGS_DIR);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut tags = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            tags.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    tags.sort();
    Ok(tags)
}

fn read_annotations(uri: &str, root: &Path) -> PackageResult<BTreeMap<String, Value>> {
    let dir = root.join(ANNOTATIONS_DIR);
    let mut annotations = BTreeMap::new();
    if !dir.is_dir() {
        return Ok(annotations);
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_suffix(".json"))
        else {
            continue;
        };
        let body = fs::read_to_string(&path)?;
        let value = serde_json::from_str(&body).map_err(|e| malformed(uri, "annotation", e))?;
        annotations.insert(name.to_string(), value);
    }
    Ok(annotations)
}

impl PackageReader for DiskPackageReader {
    fn read(&self, uri: &str) -> PackageResult<PackageRead> {
        let root = Self::dataset_path(uri)?;
        if !root.is_dir() {
            return Err(PackageError::NotFound(uri.to_string()));
        }

        let Some(admin) = read_optional(&root.join(ADMIN_METADATA))? else {
            return Ok(PackageRead::incomplete(uri, "admin metadata not written"));
        };
        let admin_metadata: AdminMetadata =
            serde_json::from_str(&admin).map_err(|e| malformed(uri, "admin metadata", e))?;
        if !admin_metadata.is_frozen() {
            return Ok(PackageRead::incomplete(
                uri,
                format!("dataset type is {:?}", admin_metadata.kind),
            ));
        }

        let Some(manifest) = read_optional(&root.join(MANIFEST))? else {
            return Ok(PackageRead::incomplete(uri, "manifest not written"));
        };
        let manifest: Value =
            serde_json::from_str(&manifest).map_err(|e| malformed(uri, "manifest", e))?;

        let readme = read_optional(&root.join(README))?.unwrap_or_default();

        Ok(PackageRead::Ready(Package {
            uri: uri.to_string(),
            admin_metadata,
            readme,
            manifest,
            tags: read_tags(&root)?,
            annotations: read_annotations(uri, &root)?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write(root: &Path, rel: &str, body: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    fn admin(kind: &str) -> String {
        json!({
            "uuid": "1b3c1ff1-47e9-4a55-9ae0-7c2d0a8e4b6f",
            "name": "my_dataset",
            "type": kind,
            "creator_username": "snow-white",
            "created_at": 1.5,
            "frozen_at": 2.5,
        })
        .to_string()
    }

    fn frozen_dataset(root: &Path) {
        write(root, ADMIN_METADATA, &admin("dataset"));
        write(
            root,
            MANIFEST,
            &json!({"items": {"abc": {"relpath": "tiny.png", "size_in_bytes": 276}}}).to_string(),
        );
        write(root, README, "abc: def\n");
        write(root, "data/tiny.png", "png");
        write(root, ".dtool/tags/raw", "");
        write(root, ".dtool/annotations/project.json", "\"lookup\"");
    }

    fn uri_of(path: &Path) -> String {
        format!("file://{}", path.display())
    }

    #[test]
    fn dataset_path_from_uri() {
        assert_eq!(
            DiskPackageReader::dataset_path("file:///tmp/x/ds").unwrap(),
            PathBuf::from("/tmp/x/ds")
        );
        assert_eq!(
            DiskPackageReader::dataset_path("file://host/tmp/x/ds").unwrap(),
            PathBuf::from("/tmp/x/ds")
        );
        assert_eq!(
            DiskPackageReader::dataset_path("/tmp/x/ds").unwrap(),
            PathBuf::from("/tmp/x/ds")
        );
        assert_eq!(
            DiskPackageReader::dataset_path("file:///tmp/my data/ds").unwrap(),
            PathBuf::from("/tmp/my data/ds")
        );
        assert_eq!(
            DiskPackageReader::dataset_path("file:///tmp/caf%C3%A9/ds").unwrap(),
            PathBuf::from("/tmp/café/ds")
        );
        assert!(matches!(
            DiskPackageReader::dataset_path("s3://bucket/u1"),
            Err(PackageError::UnsupportedScheme { .. })
        ));
    }

    #[test]
    fn reads_frozen_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("my_dataset");
        frozen_dataset(&root);

        let PackageRead::Ready(package) = DiskPackageReader::new().read(&uri_of(&root)).unwrap()
        else {
            panic!("expected a ready package");
        };
        assert_eq!(package.name(), "my_dataset");
        assert_eq!(package.number_of_items(), 1);
        assert_eq!(package.tags, vec!["raw".to_string()]);
        assert_eq!(package.annotations["project"], json!("lookup"));
        assert_eq!(package.readme, "abc: def\n");
    }

    #[test]
    fn reads_dataset_under_directory_with_space() {
        let dir = tempfile::tempdir().unwrap();
        let base = format!("file://{}", dir.path().join("my data").display());
        let uri = notify_types::derive_uri("my_dataset", "u1", &base).unwrap();
        frozen_dataset(&dir.path().join("my data").join("my_dataset"));

        let read = DiskPackageReader::new().read(&uri).unwrap();
        assert!(matches!(read, PackageRead::Ready(p) if p.name() == "my_dataset"));
    }

    #[test]
    fn proto_dataset_is_incomplete() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("my_dataset");
        write(&root, ADMIN_METADATA, &admin("protodataset"));
        let read = DiskPackageReader::new().read(&uri_of(&root)).unwrap();
        assert!(matches!(read, PackageRead::NotYetComplete { .. }));
    }

    #[test]
    fn missing_pieces_are_incomplete() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("my_dataset");
        write(&root, "data/tiny.png", "png");
        let reader = DiskPackageReader::new();
        assert!(matches!(
            reader.read(&uri_of(&root)).unwrap(),
            PackageRead::NotYetComplete { .. }
        ));

        write(&root, ADMIN_METADATA, &admin("dataset"));
        assert!(matches!(
            reader.read(&uri_of(&root)).unwrap(),
            PackageRead::NotYetComplete { .. }
        ));
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = DiskPackageReader::new()
            .read(&uri_of(&dir.path().join("absent")))
            .unwrap_err();
        assert!(matches!(err, PackageError::NotFound(_)));
    }

    #[test]
    fn corrupt_admin_metadata_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("my_dataset");
        write(&root, ADMIN_METADATA, "{not json");
        let err = DiskPackageReader::new().read(&uri_of(&root)).unwrap_err();
        assert!(matches!(err, PackageError::Malformed { file: "admin metadata", .. }));
    }
}
