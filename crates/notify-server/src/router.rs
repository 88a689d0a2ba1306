use std::sync::Arc;

use axum::routing::{get, post};
use axum::{middleware, Router};
use tower_http::trace::TraceLayer;

use crate::access::filter_ips;
use crate::handler;
use crate::state::AppState;

/// Build the router. Routes are nested under the configured URL prefix and
/// only the notification routes are guarded by the IP allowlist.
pub fn build_router(state: Arc<AppState>) -> Router {
    let notify = Router::new()
        .route(
            "/notify/all/*objpath",
            post(handler::notify_create_or_update).delete(handler::notify_delete),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), filter_ips));

    let routes = Router::new()
        .route("/_cluster/health", get(handler::health))
        .route("/config", get(handler::config))
        .merge(notify);

    let app = match state.config.url_prefix.as_str() {
        "" => routes,
        prefix => Router::new().nest(prefix, routes),
    };
    app.layer(TraceLayer::new_for_http()).with_state(state)
}
