use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TypeResult;
use crate::uri::derive_uri;

/// A registered dataset as stored in the relational index.
///
/// `uuid` is the stable identity. `uri` is always derived from
/// `(base_uri, name, uuid)` through [`derive_uri`]; construct records with
/// [`DatasetRecord::new`] so it stays in sync.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub uuid: String,
    pub name: String,
    pub base_uri: String,
    pub uri: String,
    #[serde(default)]
    pub creator_username: Option<String>,
    /// Seconds since the epoch.
    #[serde(default)]
    pub frozen_at: Option<f64>,
    /// Seconds since the epoch.
    #[serde(default)]
    pub created_at: Option<f64>,
}

impl DatasetRecord {
    /// Create a record, deriving its URI.
    pub fn new(
        uuid: impl Into<String>,
        name: impl Into<String>,
        base_uri: impl Into<String>,
    ) -> TypeResult<Self> {
        let uuid = uuid.into();
        let name = name.into();
        let base_uri = base_uri.into();
        let uri = derive_uri(&name, &uuid, &base_uri)?;
        Ok(Self {
            uuid,
            name,
            base_uri,
            uri,
            creator_username: None,
            frozen_at: None,
            created_at: None,
        })
    }
}

/// Full registration information for a dataset.
///
/// The relational index keeps only [`DatasetRecord`]; the document index
/// keeps the whole structure for search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    #[serde(flatten)]
    pub record: DatasetRecord,
    /// Parsed README content, `null` if absent or unparsable.
    #[serde(default)]
    pub readme: Value,
    #[serde(default)]
    pub manifest: Value,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, Value>,
    #[serde(default)]
    pub number_of_items: usize,
    #[serde(default)]
    pub size_in_bytes: u64,
    #[serde(default)]
    pub dtoolcore_version: Option<String>,
}

impl DatasetInfo {
    /// Registration info carrying nothing but the record.
    pub fn bare(record: DatasetRecord) -> Self {
        Self {
            record,
            readme: Value::Null,
            manifest: Value::Null,
            tags: Vec::new(),
            annotations: BTreeMap::new(),
            number_of_items: 0,
            size_in_bytes: 0,
            dtoolcore_version: None,
        }
    }

    pub fn uri(&self) -> &str {
        &self.record.uri
    }

    pub fn uuid(&self) -> &str {
        &self.record.uuid
    }

    /// Serialize as the JSON document stored in the document index.
    pub fn to_document(&self) -> Value {
        // A struct of strings, numbers and JSON values always serializes.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
