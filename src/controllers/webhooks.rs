use axum::{extract::rejection::JsonRejection, extract::State, routing::post, Json, Router};
use serde_json::json;
use std::sync::Arc;

use super::json_body;
use crate::error::AppResult;
use crate::services::identity::{self, WebhookEnvelope};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/webhooks/identity", post(identity_webhook))
}

// Подпись вебхука здесь не проверяется: это делает шлюз перед сервисом.
pub async fn identity_webhook(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<WebhookEnvelope>, JsonRejection>,
) -> AppResult<Json<serde_json::Value>> {
    let envelope = json_body(payload)?;
    identity::apply_webhook(state.users.as_ref(), state.clock.as_ref(), envelope).await?;
    Ok(Json(json!({ "received": true })))
}
