#![allow(dead_code)]

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use notify_package::DiskPackageReader;
use notify_server::{router, AppState, AuthProvider, DenyAllAuth, ServerConfig};
use notify_store::{BasePermissions, InMemoryDocumentIndex, InMemoryRelationalIndex, RelationalIndex};
use notify_types::BucketRegistry;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::util::ServiceExt;

pub const USER: &str = "snow-white";

/// A base directory of disk datasets registered as bucket `bucket`.
pub struct Harness {
    pub dir: TempDir,
    pub base_uri: String,
    pub relational: Arc<InMemoryRelationalIndex>,
    pub documents: Arc<InMemoryDocumentIndex>,
    pub state: Arc<AppState>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(|_| {}, Arc::new(DenyAllAuth))
    }

    pub fn with(tweak: impl FnOnce(&mut ServerConfig), auth: Arc<dyn AuthProvider>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let base_uri = format!("file://{}", dir.path().display());

        let mut config = ServerConfig {
            url_prefix: String::new(),
            bucket_to_base_uri: BucketRegistry::new().with("bucket", base_uri.clone()),
            ..ServerConfig::default()
        };
        tweak(&mut config);

        let relational = Arc::new(InMemoryRelationalIndex::new());
        relational.register_base_uri(&base_uri).unwrap();
        relational
            .update_permissions(&BasePermissions::new(base_uri.clone()).with_search(USER))
            .unwrap();
        let documents = Arc::new(InMemoryDocumentIndex::new());

        let state = AppState::new(
            config,
            relational.clone(),
            documents.clone(),
            Arc::new(DiskPackageReader::new()),
            auth,
        );
        Self {
            dir,
            base_uri,
            relational,
            documents,
            state: Arc::new(state),
        }
    }

    pub fn app(&self, remote: &str) -> Router {
        let remote: SocketAddr = remote.parse().unwrap();
        router::build_router(self.state.clone()).layer(MockConnectInfo(remote))
    }

    pub fn dataset_dir(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn uri(&self, name: &str) -> String {
        format!("{}/{}", self.base_uri, name)
    }

    pub fn listed(&self) -> Vec<notify_types::DatasetRecord> {
        self.relational.list_datasets_by_user(USER).unwrap()
    }
}

fn write(root: &Path, rel: &str, body: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

/// Write a frozen dataset package under `root`.
pub fn write_dataset(root: &Path, uuid: &str, name: &str) {
    write(
        root,
        ".dtool/dtool",
        &json!({
            "uuid": uuid,
            "name": name,
            "type": "dataset",
            "creator_username": USER,
            "created_at": 1604860720.736,
            "frozen_at": 1604860720.9,
            "dtoolcore_version": "3.18.0",
        })
        .to_string(),
    );
    write(
        root,
        ".dtool/manifest.json",
        &json!({
            "dtoolcore_version": "3.18.0",
            "hash_function": "md5sum_hexdigest",
            "items": {
                "e7d0a9a1ccd1bd5e0d1f6a5f2d29c5a8a2e1f4f6": {
                    "relpath": "tiny.png",
                    "size_in_bytes": 276,
                    "hash": "dc73192d2f81d7009ce5a1ee7bad5755",
                    "utc_timestamp": 1604860720.0,
                }
            }
        })
        .to_string(),
    );
    write(root, "README.yml", "project: lookup\n");
    write(root, "data/tiny.png", "png");
}

/// Write only the admin metadata of a dataset still being written.
pub fn write_proto_dataset(root: &Path, uuid: &str, name: &str) {
    write(
        root,
        ".dtool/dtool",
        &json!({"uuid": uuid, "name": name, "type": "protodataset"}).to_string(),
    );
}

pub fn write_readme(root: &Path, body: &str) {
    write(root, "README.yml", body);
}

pub async fn send(
    app: Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    token: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(v) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}
