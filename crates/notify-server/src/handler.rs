use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::response::Json;
use notify_sync::{Outcome, SyncResult};
use notify_types::Notification;
use serde_json::{json, Value};

use crate::auth::{Action, Authenticated};
use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// Liveness probe for clients that expect a search cluster.
pub async fn health() -> Json<Value> {
    Json(json!({}))
}

/// Public configuration, for authenticated callers.
pub async fn config(
    State(state): State<Arc<AppState>>,
    Authenticated(identity): Authenticated,
) -> ServerResult<Json<Value>> {
    if !state.auth.authorize(&identity, &Action::ReadConfig).await? {
        return Err(ServerError::Forbidden(identity.name));
    }
    Ok(Json(state.config.public_json()))
}

/// An object was created or updated.
pub async fn notify_create_or_update(
    State(state): State<Arc<AppState>>,
    Path(objpath): Path<String>,
    body: Bytes,
) -> ServerResult<Json<Value>> {
    tracing::debug!(%objpath, bytes = body.len(), "create/update notification");
    let notification = parse_body(&objpath, &body)?;
    let reconciler = state.reconciler.clone();
    let outcome = blocking(move || reconciler.create_or_update(&notification)).await;
    finish(&objpath, outcome)
}

/// An object was deleted.
pub async fn notify_delete(
    State(state): State<Arc<AppState>>,
    Path(objpath): Path<String>,
) -> ServerResult<Json<Value>> {
    tracing::debug!(%objpath, "delete notification");
    let reconciler = state.reconciler.clone();
    let key = objpath.clone();
    let outcome = blocking(move || reconciler.delete(&key)).await;
    finish(&objpath, outcome)
}

fn parse_body(objpath: &str, body: &[u8]) -> ServerResult<Notification> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ServerError::BadRequest("request body is missing".into()));
    }
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ServerError::BadRequest(format!("request body is not JSON: {e}")))?;
    Ok(Notification::from_payload(objpath, &value)?)
}

/// Store and package access is synchronous; keep it off the async workers.
async fn blocking<F>(f: F) -> ServerResult<SyncResult<Outcome>>
where
    F: FnOnce() -> SyncResult<Outcome> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ServerError::Internal(format!("notification task failed: {e}")))
}

fn finish(objpath: &str, outcome: ServerResult<SyncResult<Outcome>>) -> ServerResult<Json<Value>> {
    match outcome? {
        Ok(outcome) => {
            tracing::debug!(objpath, ?outcome, "notification handled");
            Ok(Json(json!({})))
        }
        Err(e) => {
            if e.is_configuration() {
                tracing::error!(objpath, error = %e, "notification failed on server configuration");
            } else {
                tracing::warn!(objpath, error = %e, "notification failed");
            }
            Err(e.into())
        }
    }
}
