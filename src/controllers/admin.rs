use axum::{
    extract::{multipart::MultipartRejection, rejection::JsonRejection, Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

use super::{json_body, read_submission};
use crate::error::AppResult;
use crate::middleware::AdminUser;
use crate::models::{EventView, RequestWithEvent};
use crate::services::approval::{self, TransitionOutcome, TransitionRequest};
use crate::services::management::{self, DeleteEventRequest, DeleteOutcome, EditEventRequest, EditOutcome};
use crate::services::submission::{self, SubmissionMode};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/events", post(create_event))
        .route(
            "/admin/listed-events",
            get(listed_events).patch(edit_event).delete(delete_event),
        )
        .route(
            "/admin/pending-requests",
            get(pending_requests).patch(transition_request),
        )
}

/// Админ публикует событие сразу, без заявки.
pub async fn create_event(
    State(state): State<Arc<AppState>>,
    AdminUser(auth): AdminUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let (form, images) = read_submission(multipart).await?;
    let event = submission::submit(&state, &auth.actor(), SubmissionMode::Direct, form, images).await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "event": event }))))
}

pub async fn listed_events(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> AppResult<Json<Vec<EventView>>> {
    Ok(Json(management::list_for_admin(&state).await?))
}

pub async fn edit_event(
    State(state): State<Arc<AppState>>,
    AdminUser(auth): AdminUser,
    payload: Result<Json<EditEventRequest>, JsonRejection>,
) -> AppResult<Json<EditOutcome>> {
    let request = json_body(payload)?;
    Ok(Json(management::edit(&state, &auth.actor(), request).await?))
}

pub async fn delete_event(
    State(state): State<Arc<AppState>>,
    AdminUser(auth): AdminUser,
    payload: Result<Json<DeleteEventRequest>, JsonRejection>,
) -> AppResult<Json<DeleteOutcome>> {
    let request = json_body(payload)?;
    Ok(Json(management::delete(&state, &auth.actor(), request).await?))
}

pub async fn pending_requests(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> AppResult<Json<Vec<RequestWithEvent>>> {
    Ok(Json(approval::pending(&state).await?))
}

pub async fn transition_request(
    State(state): State<Arc<AppState>>,
    AdminUser(auth): AdminUser,
    payload: Result<Json<TransitionRequest>, JsonRejection>,
) -> AppResult<Json<TransitionOutcome>> {
    let request = json_body(payload)?;
    Ok(Json(approval::transition(&state, &auth.actor(), request).await?))
}
