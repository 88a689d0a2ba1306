//! Static mapping from bucket names to base URIs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Separator between the bucket name and the dataset part of an object key.
pub const BUCKET_SEPARATOR: char = '_';

/// Maps each storage bucket to the base URI its datasets are registered under.
///
/// Loaded once from configuration and never mutated while serving. Every
/// bucket referenced by a notification must have an entry here, otherwise the
/// notification cannot be resolved to a dataset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BucketRegistry {
    buckets: BTreeMap<String, String>,
}

impl BucketRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the base URI for a bucket.
    pub fn insert(&mut self, bucket: impl Into<String>, base_uri: impl Into<String>) {
        self.buckets.insert(bucket.into(), base_uri.into());
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, bucket: impl Into<String>, base_uri: impl Into<String>) -> Self {
        self.insert(bucket, base_uri);
        self
    }

    /// Base URI registered for `bucket`.
    pub fn base_uri(&self, bucket: &str) -> Option<&str> {
        self.buckets.get(bucket).map(String::as_str)
    }

    /// Iterate `(bucket, base_uri)` pairs in bucket order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.buckets.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Find the bucket whose `<bucket>_` prefix starts `objpath`.
    ///
    /// When several buckets match, the longest name wins. Returns the base URI
    /// and the remainder of `objpath` after the prefix.
    pub fn strip_bucket<'a>(&'a self, objpath: &'a str) -> Option<(&'a str, &'a str)> {
        self.buckets
            .iter()
            .filter_map(|(bucket, base_uri)| {
                let rest = objpath.strip_prefix(bucket.as_str())?;
                let rest = rest.strip_prefix(BUCKET_SEPARATOR)?;
                Some((bucket.len(), base_uri.as_str(), rest))
            })
            .max_by_key(|(len, _, _)| *len)
            .map(|(_, base_uri, rest)| (base_uri, rest))
    }
}

impl FromIterator<(String, String)> for BucketRegistry {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            buckets: iter.into_iter().collect(),
        }
    }
}
