//! Модерация заявок создателей.

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::Actor;
use crate::error::{AppError, AppResult};
use crate::models::{RequestStatus, RequestWithEvent};
use crate::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransitionRequest {
    pub id: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionOutcome {
    pub message: String,
    pub event_request_id: Uuid,
    pub new_status: RequestStatus,
}

impl TransitionRequest {
    fn parse(&self) -> AppResult<(Uuid, RequestStatus)> {
        let (Some(id), Some(status)) = (
            self.id.as_deref().map(str::trim).filter(|v| !v.is_empty()),
            self.status.as_deref().map(str::trim).filter(|v| !v.is_empty()),
        ) else {
            return Err(AppError::validation("EventRequest ID and status are required"));
        };

        let status = match status.parse::<RequestStatus>() {
            Ok(status) if status.is_terminal() => status,
            _ => return Err(AppError::validation("Status must be ACCEPTED or REJECTED")),
        };
        let id = Uuid::parse_str(id).map_err(|_| AppError::validation("Invalid event request id"))?;
        Ok((id, status))
    }
}

pub async fn pending(state: &AppState) -> AppResult<Vec<RequestWithEvent>> {
    state.requests.list_pending().await
}

pub async fn requests_for(state: &AppState, actor: &Actor) -> AppResult<Vec<RequestWithEvent>> {
    state.requests.list_for_requester(actor.user.id).await
}

pub async fn transition(state: &AppState, actor: &Actor, request: TransitionRequest) -> AppResult<TransitionOutcome> {
    let (id, status) = request.parse()?;
    let updated = state.requests.transition(id, status).await?;

    if status == RequestStatus::Accepted {
        state.cache.invalidate_search().await;
    }
    info!(
        "Event request {} {} by {}",
        updated.id,
        status.as_str().to_lowercase(),
        actor.user.email
    );

    Ok(TransitionOutcome {
        message: format!("Event request {} successfully", status.as_str().to_lowercase()),
        event_request_id: updated.id,
        new_status: updated.status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(id: Option<&str>, status: Option<&str>) -> TransitionRequest {
        TransitionRequest {
            id: id.map(str::to_string),
            status: status.map(str::to_string),
        }
    }

    #[test]
    fn requires_id_and_terminal_status() {
        let id = Uuid::new_v4().to_string();
        assert_eq!(
            request(None, Some("ACCEPTED")).parse().unwrap_err().to_string(),
            "EventRequest ID and status are required"
        );
        assert_eq!(
            request(Some(&id), Some("PENDING")).parse().unwrap_err().to_string(),
            "Status must be ACCEPTED or REJECTED"
        );
        assert_eq!(
            request(Some(&id), Some("maybe")).parse().unwrap_err().to_string(),
            "Status must be ACCEPTED or REJECTED"
        );
        let (_, status) = request(Some(&id), Some("rejected")).parse().unwrap();
        assert_eq!(status, RequestStatus::Rejected);
    }
}
