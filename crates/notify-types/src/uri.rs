//! Canonical dataset URI derivation.
//!
//! Disk-backed datasets live in a directory named after the dataset, so their
//! URI depends on the name. Object-storage datasets are keyed by uuid. The
//! object key alone therefore cannot reconstruct a disk URI, which is why
//! resolution goes through the relational index.

use url::Url;

use crate::error::{TypeError, TypeResult};

/// Scheme of local filesystem base URIs.
pub const FILE_SCHEME: &str = "file";

/// Normalise a base URI: strip trailing slashes and turn bare absolute paths
/// into `file://` URIs.
pub fn sanitise_base_uri(base_uri: &str) -> TypeResult<String> {
    let trimmed = base_uri.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(TypeError::InvalidBaseUri {
            uri: base_uri.to_string(),
            reason: "empty".into(),
        });
    }
    if trimmed.starts_with('/') {
        return Ok(format!("{FILE_SCHEME}://{trimmed}"));
    }
    let parsed = Url::parse(trimmed).map_err(|e| TypeError::InvalidBaseUri {
        uri: base_uri.to_string(),
        reason: e.to_string(),
    })?;
    if parsed.scheme() != FILE_SCHEME && parsed.host_str().map_or(true, str::is_empty) {
        return Err(TypeError::InvalidBaseUri {
            uri: base_uri.to_string(),
            reason: "object storage base URI needs a bucket".into(),
        });
    }
    Ok(trimmed.to_string())
}

/// Scheme of a base URI, treating bare paths as `file`.
pub fn scheme_of(base_uri: &str) -> String {
    match Url::parse(base_uri) {
        Ok(url) => url.scheme().to_string(),
        Err(_) => FILE_SCHEME.to_string(),
    }
}

/// Derive the canonical URI of the dataset `name`/`uuid` under `base_uri`.
///
/// `file` base URIs yield `<base>/<name>`; every other scheme yields
/// `<base>/<uuid>`.
pub fn derive_uri(name: &str, uuid: &str, base_uri: &str) -> TypeResult<String> {
    if name.is_empty() {
        return Err(TypeError::EmptyName);
    }
    if uuid.is_empty() {
        return Err(TypeError::EmptyUuid);
    }
    let base = base_uri.trim_end_matches('/');
    let leaf = if scheme_of(base) == FILE_SCHEME { name } else { uuid };
    Ok(format!("{base}/{leaf}"))
}
