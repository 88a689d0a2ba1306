use std::sync::Arc;

use notify_package::{DiskPackageReader, PackageReader};
use notify_store::{DocumentIndex, RelationalIndex, SqliteDocumentIndex, SqliteRelationalIndex};
use notify_sync::{Reconciler, SyncError};

use crate::auth::{AuthProvider, DenyAllAuth, JwtAuth};
use crate::config::ServerConfig;
use crate::error::ServerResult;

/// Shared state handed to every handler.
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub reconciler: Reconciler,
    pub auth: Arc<dyn AuthProvider>,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        relational: Arc<dyn RelationalIndex>,
        documents: Arc<dyn DocumentIndex>,
        reader: Arc<dyn PackageReader>,
        auth: Arc<dyn AuthProvider>,
    ) -> Self {
        let registry = Arc::new(config.bucket_to_base_uri.clone());
        Self {
            config: Arc::new(config),
            reconciler: Reconciler::new(registry, relational, documents, reader),
            auth,
        }
    }

    /// Open the SQLite stores and the disk reader named by `config`.
    pub fn from_config(config: ServerConfig) -> ServerResult<Self> {
        let relational =
            SqliteRelationalIndex::open(&config.relational_db).map_err(SyncError::from)?;
        let documents = SqliteDocumentIndex::open(&config.document_db).map_err(SyncError::from)?;
        let auth: Arc<dyn AuthProvider> = match &config.jwt {
            Some(jwt) => Arc::new(JwtAuth::from_config(jwt)?),
            None => {
                tracing::warn!("no jwt configured, /config will refuse every request");
                Arc::new(DenyAllAuth)
            }
        };
        Ok(Self::new(
            config,
            Arc::new(relational),
            Arc::new(documents),
            Arc::new(DiskPackageReader::new()),
            auth,
        ))
    }

    /// Configured base URIs that the relational index does not know.
    pub fn unregistered_base_uris(&self) -> ServerResult<Vec<String>> {
        let relational = self.reconciler.store().relational();
        let mut missing = Vec::new();
        for (_, base_uri) in self.config.bucket_to_base_uri.iter() {
            if !relational.base_uri_exists(base_uri).map_err(SyncError::from)? {
                missing.push(base_uri.to_string());
            }
        }
        Ok(missing)
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
