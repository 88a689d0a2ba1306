//! Shapes of incoming create/update notifications.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{TypeError, TypeResult};

/// Raw JSON body of a create/update notification.
///
/// Storage systems send arbitrary object metadata; only `bucket` and the
/// `uuid`/`name` entries of `metadata` are interpreted.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NotificationPayload {
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

impl NotificationPayload {
    fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.as_ref()?.get(key)?.as_str()
    }
}

/// A create/update notification, discriminated at the request boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    /// The payload names the dataset directly. Sent when a package is
    /// finalized; authoritative, no key parsing needed.
    InlineMetadata {
        bucket: String,
        uuid: String,
        name: String,
    },
    /// Only the object path is meaningful.
    KeyOnly { objpath: String },
}

impl Notification {
    /// Classify a JSON body received for `objpath`.
    ///
    /// The body must be a JSON object. Metadata carrying both `uuid` and
    /// `name` makes the notification authoritative and then requires a
    /// `bucket`; anything else falls back to the object path.
    pub fn from_payload(objpath: &str, body: &Value) -> TypeResult<Self> {
        if !body.is_object() {
            return Err(TypeError::MalformedPayload(
                "expected a JSON object".into(),
            ));
        }
        let payload: NotificationPayload = serde_json::from_value(body.clone())
            .map_err(|e| TypeError::MalformedPayload(e.to_string()))?;

        match (payload.metadata_str("uuid"), payload.metadata_str("name")) {
            (Some(uuid), Some(name)) => {
                let bucket = payload.bucket.clone().ok_or(TypeError::MissingBucket)?;
                check_component("uuid", uuid)?;
                check_component("name", name)?;
                Ok(Self::InlineMetadata {
                    bucket,
                    uuid: uuid.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Ok(Self::KeyOnly {
                objpath: objpath.to_string(),
            }),
        }
    }
}

/// A single URI path component of `[A-Za-z0-9_.-]`, other than `.` and `..`.
fn check_component(field: &str, value: &str) -> TypeResult<()> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-');
    if value.is_empty() || value == "." || value == ".." || !value.chars().all(allowed) {
        return Err(TypeError::MalformedPayload(format!(
            "invalid dataset {field} {value:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn inline_metadata() {
        let body = json!({
            "bucket": "bucket",
            "metadata": {"uuid": "u1", "name": "ds", "creator_username": "snow-white"}
        });
        assert_eq!(
            Notification::from_payload("ds", &body).unwrap(),
            Notification::InlineMetadata {
                bucket: "bucket".into(),
                uuid: "u1".into(),
                name: "ds".into(),
            }
        );
    }

    #[test]
    fn inline_metadata_requires_bucket() {
        let body = json!({"metadata": {"uuid": "u1", "name": "ds"}});
        assert_eq!(
            Notification::from_payload("ds", &body),
            Err(TypeError::MissingBucket)
        );
    }

    #[test]
    fn partial_metadata_falls_back_to_key() {
        let body = json!({"bucket": "bucket", "metadata": {"uuid": "u1"}});
        assert_eq!(
            Notification::from_payload("bucket_u1/README.yml", &body).unwrap(),
            Notification::KeyOnly {
                objpath: "bucket_u1/README.yml".into()
            }
        );
        assert!(matches!(
            Notification::from_payload("k", &json!({})).unwrap(),
            Notification::KeyOnly { .. }
        ));
    }

    #[test]
    fn non_object_rejected() {
        assert!(matches!(
            Notification::from_payload("k", &json!([1, 2])),
            Err(TypeError::MalformedPayload(_))
        ));
        assert!(matches!(
            Notification::from_payload("k", &json!({"bucket": 3})),
            Err(TypeError::MalformedPayload(_))
        ));
    }

    #[test]
    fn path_like_names_rejected() {
        for name in ["../x", "a/b", "..", "", "my data"] {
            let body = json!({"bucket": "bucket", "metadata": {"uuid": "u1", "name": name}});
            assert!(
                matches!(
                    Notification::from_payload("ds", &body),
                    Err(TypeError::MalformedPayload(_))
                ),
                "{name:?}"
            );
        }
        let body = json!({"bucket": "bucket", "metadata": {"uuid": "../u1", "name": "ds"}});
        assert!(Notification::from_payload("ds", &body).is_err());

        let body = json!({"bucket": "bucket", "metadata": {"uuid": "u1", "name": "run-2.v_1"}});
        assert!(Notification::from_payload("ds", &body).is_ok());
    }
}
