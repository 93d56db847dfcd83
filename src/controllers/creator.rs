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
use crate::middleware::AuthUser;
use crate::models::{EventView, RequestWithEvent};
use crate::services::approval;
use crate::services::management::{self, DeleteEventRequest, DeleteOutcome, EditEventRequest, EditOutcome};
use crate::services::submission::{self, SubmissionMode};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/creator/events", post(submit_event))
        .route(
            "/creator/listed-events",
            get(listed_events).patch(edit_event).delete(delete_event),
        )
        .route("/creator/request-status", get(request_status))
}

/// Событие создателя уходит на модерацию вместе с заявкой.
pub async fn submit_event(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let (form, images) = read_submission(multipart).await?;
    let event = submission::submit(&state, &auth.actor(), SubmissionMode::Request, form, images).await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "event": event }))))
}

pub async fn listed_events(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> AppResult<Json<Vec<EventView>>> {
    Ok(Json(management::list_for_creator(&state, &auth.actor()).await?))
}

pub async fn edit_event(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    payload: Result<Json<EditEventRequest>, JsonRejection>,
) -> AppResult<Json<EditOutcome>> {
    let request = json_body(payload)?;
    Ok(Json(management::edit(&state, &auth.actor(), request).await?))
}

pub async fn delete_event(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    payload: Result<Json<DeleteEventRequest>, JsonRejection>,
) -> AppResult<Json<DeleteOutcome>> {
    let request = json_body(payload)?;
    Ok(Json(management::delete(&state, &auth.actor(), request).await?))
}

pub async fn request_status(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> AppResult<Json<Vec<RequestWithEvent>>> {
    Ok(Json(approval::requests_for(&state, &auth.actor()).await?))
}
