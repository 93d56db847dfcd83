//! Управление опубликованными событиями: списки, правка и удаление.

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::{parse_schedule, Actor};
use crate::error::{AppError, AppResult};
use crate::models::{EventEdit, EventView};
use crate::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditEventRequest {
    pub event_id: Option<String>,
    pub title: Option<String>,
    pub organizer: Option<String>,
    pub start_date_time: Option<String>,
    pub end_date_time: Option<String>,
    pub venue: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteEventRequest {
    pub event_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EditOutcome {
    pub success: bool,
    pub message: &'static str,
    pub event: EventView,
}

#[derive(Debug, Serialize)]
pub struct DeleteOutcome {
    pub success: bool,
    pub message: &'static str,
}

fn required(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn event_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::validation("Invalid event id"))
}

pub async fn list_for_admin(state: &AppState) -> AppResult<Vec<EventView>> {
    let rows = state.events.list_all().await?;
    Ok(rows.into_iter().map(EventView::from).collect())
}

pub async fn list_for_creator(state: &AppState, actor: &Actor) -> AppResult<Vec<EventView>> {
    let rows = state.events.list_approved_by_creator(actor.user.id).await?;
    Ok(rows.into_iter().map(EventView::from).collect())
}

pub async fn edit(state: &AppState, actor: &Actor, request: EditEventRequest) -> AppResult<EditOutcome> {
    let (Some(id), Some(title), Some(organizer), Some(start), Some(end), Some(venue)) = (
        required(&request.event_id),
        required(&request.title),
        required(&request.organizer),
        required(&request.start_date_time),
        required(&request.end_date_time),
        required(&request.venue),
    ) else {
        return Err(AppError::validation("Missing required fields"));
    };
    let id = event_id(&id)?;
    let (start_date_time, end_date_time) = parse_schedule(&start, &end)?;

    let existing = state
        .events
        .find(id)
        .await?
        .ok_or_else(|| AppError::not_found("Event not found"))?;
    actor.ensure_owns(existing.creator_id)?;

    let edit = EventEdit {
        title,
        organizer,
        venue,
        start_date_time,
        end_date_time,
    };
    let updated = state
        .events
        .update(id, &edit)
        .await?
        .ok_or_else(|| AppError::not_found("Event not found"))?;
    state.cache.invalidate_search().await;
    info!("Event {} edited by {}", id, actor.user.email);

    Ok(EditOutcome {
        success: true,
        message: "Event updated successfully",
        event: EventView::from(updated),
    })
}

pub async fn delete(state: &AppState, actor: &Actor, request: DeleteEventRequest) -> AppResult<DeleteOutcome> {
    let id = required(&request.event_id).ok_or_else(|| AppError::validation("Missing required fields"))?;
    let id = event_id(&id)?;

    let existing = state
        .events
        .find(id)
        .await?
        .ok_or_else(|| AppError::not_found("Event not found"))?;
    actor.ensure_owns(existing.creator_id)?;

    if !state.events.delete(id).await? {
        return Err(AppError::not_found("Event not found"));
    }
    state.cache.invalidate_search().await;
    info!("Event {} deleted by {}", id, actor.user.email);

    Ok(DeleteOutcome {
        success: true,
        message: "Event deleted successfully",
    })
}
