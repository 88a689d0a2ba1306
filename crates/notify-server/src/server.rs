use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// Notification receiver bound to one configuration.
pub struct NotifyServer {
    state: Arc<AppState>,
}

impl NotifyServer {
    /// Open the stores named by `config`.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        Ok(Self::with_state(AppState::from_config(config)?))
    }

    pub fn with_state(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    /// Serve until interrupted.
    pub async fn serve(self) -> ServerResult<()> {
        let addr = self.state.config.bind_addr;
        for base_uri in self.state.unregistered_base_uris()? {
            tracing::warn!(%base_uri, "configured base URI is not registered, its notifications will fail");
        }
        let app = self.router();
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(
            %addr,
            prefix = %self.state.config.url_prefix,
            buckets = self.state.config.bucket_to_base_uri.len(),
            "notification server listening"
        );
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
