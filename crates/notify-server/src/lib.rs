//! HTTP receiver for object-storage change notifications.
//!
//! Storage systems post to `/notify/all/<objpath>` when an object is created
//! or updated, and send `DELETE` to the same path when one is removed. Each
//! notification is reconciled into the dataset indexes. The notification
//! routes are guarded by an IP allowlist; `/config` requires a bearer token.

pub mod access;
pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use access::{AllowList, IpRange};
pub use auth::{Action, AuthProvider, Authenticated, Credentials, DenyAllAuth, Identity, JwtAuth};
pub use config::{JwtAlgorithm, JwtConfig, ServerConfig};
pub use error::{ErrorResponse, ServerError, ServerResult};
pub use server::NotifyServer;
pub use state::AppState;

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::extract::connect_info::MockConnectInfo;
    use axum::http::{Request, StatusCode};
    use notify_package::InMemoryPackageReader;
    use notify_store::{InMemoryDocumentIndex, InMemoryRelationalIndex};
    use tower::util::ServiceExt;

    fn app(config: ServerConfig, remote: &str) -> axum::Router {
        let state = AppState::new(
            config,
            Arc::new(InMemoryRelationalIndex::new()),
            Arc::new(InMemoryDocumentIndex::new()),
            Arc::new(InMemoryPackageReader::new()),
            Arc::new(DenyAllAuth),
        );
        let remote: SocketAddr = remote.parse().unwrap();
        router::build_router(Arc::new(state)).layer(MockConnectInfo(remote))
    }

    async fn status(app: axum::Router, method: &str, uri: &str, body: &str) -> StatusCode {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::from(body.to_string()))
            .unwrap();
        app.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let app = app(ServerConfig::default(), "127.0.0.1:1");
        let s = status(app, "GET", "/elastic-search/_cluster/health", "").await;
        assert_eq!(s, StatusCode::OK);
    }

    #[tokio::test]
    async fn routes_live_under_prefix() {
        let app = app(ServerConfig::default(), "127.0.0.1:1");
        let s = status(app, "GET", "/_cluster/health", "").await;
        assert_eq!(s, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn empty_prefix_mounts_at_root() {
        let config = ServerConfig {
            url_prefix: String::new(),
            ..ServerConfig::default()
        };
        let s = status(app(config, "127.0.0.1:1"), "GET", "/_cluster/health", "").await;
        assert_eq!(s, StatusCode::OK);
    }

    #[tokio::test]
    async fn config_without_token_is_unauthorized() {
        let app = app(ServerConfig::default(), "127.0.0.1:1");
        let s = status(app, "GET", "/elastic-search/config", "").await;
        assert_eq!(s, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn forbidden_caller_is_refused_before_parsing() {
        let config = ServerConfig {
            allow_access_from: AllowList::parse_list("10.0.0.0/8").unwrap(),
            ..ServerConfig::default()
        };
        let uri = "/elastic-search/notify/all/bucket_u1/dtool";
        let s = status(app(config.clone(), "192.168.1.1:1"), "POST", uri, "").await;
        assert_eq!(s, StatusCode::FORBIDDEN);
        let s = status(app(config, "192.168.1.1:1"), "DELETE", uri, "").await;
        assert_eq!(s, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn post_without_body_is_bad_request() {
        let app = app(ServerConfig::default(), "127.0.0.1:1");
        let s = status(app, "POST", "/elastic-search/notify/all/bucket_u1/README.yml", "").await;
        assert_eq!(s, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_of_unknown_dataset_is_ok() {
        let app = app(ServerConfig::default(), "127.0.0.1:1");
        let s = status(app, "DELETE", "/elastic-search/notify/all/elsewhere_u1/dtool", "").await;
        assert_eq!(s, StatusCode::OK);
    }
}
