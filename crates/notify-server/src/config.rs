use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use notify_types::{sanitise_base_uri, BucketRegistry, TypeError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::access::AllowList;
use crate::error::{ServerError, ServerResult};

/// JSON object mapping bucket names to base URIs.
pub const ENV_BUCKET_TO_BASE_URI: &str = "DTOOL_LOOKUP_SERVER_NOTIFY_BUCKET_TO_BASE_URI";
/// Comma- or whitespace-separated addresses and CIDR ranges.
pub const ENV_ALLOW_ACCESS_FROM: &str = "DTOOL_LOOKUP_SERVER_NOTIFY_ALLOW_ACCESS_FROM";

/// Server configuration. Loaded once at startup and shared read-only.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Prefix all routes are mounted under.
    pub url_prefix: String,
    pub bucket_to_base_uri: BucketRegistry,
    pub allow_access_from: AllowList,
    /// SQLite file of the relational index.
    pub relational_db: PathBuf,
    /// SQLite file of the document index.
    pub document_db: PathBuf,
    /// Bearer-token verification for `/config`. Without it every token is refused.
    pub jwt: Option<JwtConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            url_prefix: "/elastic-search".into(),
            bucket_to_base_uri: BucketRegistry::new().with("bucket", "s3://bucket"),
            allow_access_from: AllowList::default(),
            relational_db: PathBuf::from("lookup.sqlite"),
            document_db: PathBuf::from("documents.sqlite"),
            jwt: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum JwtAlgorithm {
    #[default]
    HS256,
    RS256,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct JwtConfig {
    #[serde(default)]
    pub algorithm: JwtAlgorithm,
    /// Shared secret for `HS256`.
    pub secret: Option<String>,
    /// PEM public key for `RS256`.
    pub public_key_file: Option<PathBuf>,
}

impl ServerConfig {
    /// Parse a TOML document. Environment overrides are not applied.
    pub fn from_toml_str(s: &str) -> ServerResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| ServerError::Config(e.to_string()))?;
        config.validated()
    }

    /// Load a TOML file and apply environment overrides.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)?.with_env(|key| std::env::var(key).ok())
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> ServerResult<Self> {
        Self::default().with_env(|key| std::env::var(key).ok())
    }

    /// Apply overrides looked up by variable name.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> ServerResult<Self> {
        if let Some(raw) = lookup(ENV_BUCKET_TO_BASE_URI) {
            self.bucket_to_base_uri = serde_json::from_str(&raw).map_err(|e| {
                ServerError::Config(format!("{ENV_BUCKET_TO_BASE_URI}: {e}"))
            })?;
        }
        if let Some(raw) = lookup(ENV_ALLOW_ACCESS_FROM) {
            self.allow_access_from = AllowList::parse_list(&raw)
                .map_err(|e| ServerError::Config(format!("{ENV_ALLOW_ACCESS_FROM}: {e}")))?;
        }
        self.validated()
    }

    fn validated(mut self) -> ServerResult<Self> {
        let prefix = self.url_prefix.trim().trim_end_matches('/');
        self.url_prefix = match prefix {
            "" => String::new(),
            p if p.starts_with('/') => p.to_string(),
            p => format!("/{p}"),
        };
        self.bucket_to_base_uri = self
            .bucket_to_base_uri
            .iter()
            .map(|(bucket, base_uri)| Ok((bucket.to_string(), sanitise_base_uri(base_uri)?)))
            .collect::<Result<BucketRegistry, TypeError>>()
            .map_err(|e| ServerError::Config(e.to_string()))?;
        if let Some(jwt) = &self.jwt {
            let missing = match jwt.algorithm {
                JwtAlgorithm::HS256 => jwt.secret.is_none().then_some("secret"),
                JwtAlgorithm::RS256 => jwt.public_key_file.is_none().then_some("public_key_file"),
            };
            if let Some(field) = missing {
                return Err(ServerError::Config(format!(
                    "jwt.{field} is required for {:?}",
                    jwt.algorithm
                )));
            }
        }
        Ok(self)
    }

    /// Settings reported by `GET /config`: the version and the notification
    /// settings under their lowercase names. Secrets and paths stay private.
    pub fn public_json(&self) -> Value {
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "bucket_to_base_uri": self.bucket_to_base_uri,
            "allow_access_from": self.allow_access_from,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, "127.0.0.1:5000".parse::<SocketAddr>().unwrap());
        assert_eq!(c.url_prefix, "/elastic-search");
        assert_eq!(c.bucket_to_base_uri.base_uri("bucket"), Some("s3://bucket"));
        assert!(c.allow_access_from.allows("10.1.2.3".parse().unwrap()));
        assert!(c.jwt.is_none());
    }

    #[test]
    fn toml_parsing() {
        let c = ServerConfig::from_toml_str(
            r#"
            bind_addr = "0.0.0.0:8080"
            url_prefix = "notify/"
            allow_access_from = ["10.0.0.0/8"]

            [bucket_to_base_uri]
            archive = "ecs://archive"

            [jwt]
            algorithm = "HS256"
            secret = "s3cret"
            "#,
        )
        .unwrap();
        assert_eq!(c.bind_addr.port(), 8080);
        assert_eq!(c.url_prefix, "/notify");
        assert_eq!(c.bucket_to_base_uri.base_uri("archive"), Some("ecs://archive"));
        assert_eq!(c.bucket_to_base_uri.base_uri("bucket"), None);
        assert!(!c.allow_access_from.allows("127.0.0.1".parse().unwrap()));
        assert_eq!(c.jwt.unwrap().secret.as_deref(), Some("s3cret"));
    }

    #[test]
    fn jwt_requires_key_material() {
        let err = ServerConfig::from_toml_str("[jwt]\nalgorithm = \"RS256\"\n").unwrap_err();
        assert!(matches!(err, ServerError::Config(msg) if msg.contains("public_key_file")));
    }

    #[test]
    fn env_overrides() {
        let env = HashMap::from([
            (ENV_BUCKET_TO_BASE_URI, r#"{"b": "file:///tmp/x"}"#),
            (ENV_ALLOW_ACCESS_FROM, "127.0.0.1,10.0.0.0/8"),
        ]);
        let c = ServerConfig::default()
            .with_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(c.bucket_to_base_uri.base_uri("b"), Some("file:///tmp/x"));
        assert_eq!(c.bucket_to_base_uri.base_uri("bucket"), None);
        assert!(c.allow_access_from.allows("10.9.9.9".parse().unwrap()));
        assert!(!c.allow_access_from.allows("192.168.0.1".parse().unwrap()));
    }

    #[test]
    fn bare_paths_become_file_uris() {
        let c = ServerConfig::from_toml_str("[bucket_to_base_uri]\nlocal = \"/tmp/x/\"\n").unwrap();
        assert_eq!(c.bucket_to_base_uri.base_uri("local"), Some("file:///tmp/x"));
        assert!(ServerConfig::from_toml_str("[bucket_to_base_uri]\nb = \"s3://\"\n").is_err());
    }

    #[test]
    fn malformed_env_is_config_error() {
        let err = ServerConfig::default()
            .with_env(|k| (k == ENV_BUCKET_TO_BASE_URI).then(|| "[1,2]".to_string()))
            .unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[test]
    fn public_json_hides_secrets() {
        let mut c = ServerConfig::default();
        c.jwt = Some(JwtConfig {
            secret: Some("s3cret".into()),
            ..JwtConfig::default()
        });
        let v = c.public_json();
        assert_eq!(v["bucket_to_base_uri"]["bucket"], "s3://bucket");
        assert_eq!(v["allow_access_from"][0], "0.0.0.0/0");
        assert!(v.get("jwt").is_none());
        assert!(v.get("relational_db").is_none());
        assert!(!v.to_string().contains("s3cret"));
    }
}
