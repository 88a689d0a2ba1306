use std::collections::BTreeMap;

use notify_types::{DatasetInfo, DatasetRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PackageResult;

/// `type` of a frozen, readable dataset.
pub const DATASET_TYPE: &str = "dataset";
/// `type` of a dataset that is still being written.
pub const PROTO_DATASET_TYPE: &str = "protodataset";

/// Administrative metadata written when a dataset is created and updated
/// when it is frozen.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdminMetadata {
    pub uuid: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub creator_username: Option<String>,
    #[serde(default)]
    pub created_at: Option<f64>,
    #[serde(default)]
    pub frozen_at: Option<f64>,
    #[serde(default)]
    pub dtoolcore_version: Option<String>,
}

impl AdminMetadata {
    pub fn is_frozen(&self) -> bool {
        self.kind == DATASET_TYPE
    }
}

/// A fully written dataset package.
#[derive(Clone, Debug, PartialEq)]
pub struct Package {
    pub uri: String,
    pub admin_metadata: AdminMetadata,
    /// Raw README text.
    pub readme: String,
    /// Manifest document with an `items` map.
    pub manifest: Value,
    pub tags: Vec<String>,
    pub annotations: BTreeMap<String, Value>,
}

impl Package {
    pub fn uuid(&self) -> &str {
        &self.admin_metadata.uuid
    }

    pub fn name(&self) -> &str {
        &self.admin_metadata.name
    }

    fn items(&self) -> impl Iterator<Item = &Value> {
        self.manifest
            .get("items")
            .and_then(Value::as_object)
            .into_iter()
            .flat_map(|items| items.values())
    }

    pub fn number_of_items(&self) -> usize {
        self.items().count()
    }

    pub fn size_in_bytes(&self) -> u64 {
        self.items()
            .filter_map(|item| item.get("size_in_bytes").and_then(Value::as_u64))
            .sum()
    }

    /// The README parsed as YAML, `null` when empty or unparsable.
    pub fn parsed_readme(&self) -> Value {
        if self.readme.trim().is_empty() {
            return Value::Null;
        }
        match serde_yaml::from_str::<Value>(&self.readme) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(uri = %self.uri, error = %e, "README is not valid YAML");
                Value::Null
            }
        }
    }

    /// Registration info for this package under `base_uri`.
    ///
    /// The URI is re-derived from the admin metadata rather than copied from
    /// where the package was read, so it can differ from [`Package::uri`].
    pub fn registration_info(&self, base_uri: &str) -> PackageResult<DatasetInfo> {
        let meta = &self.admin_metadata;
        let mut record = DatasetRecord::new(&meta.uuid, &meta.name, base_uri)?;
        record.creator_username = meta.creator_username.clone();
        record.created_at = meta.created_at;
        record.frozen_at = meta.frozen_at;

        Ok(DatasetInfo {
            record,
            readme: self.parsed_readme(),
            manifest: self.manifest.clone(),
            tags: self.tags.clone(),
            annotations: self.annotations.clone(),
            number_of_items: self.number_of_items(),
            size_in_bytes: self.size_in_bytes(),
            dtoolcore_version: meta.dtoolcore_version.clone(),
        })
    }
}
