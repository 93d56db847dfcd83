use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Статус заявки. Из `PENDING` возможен ровно один переход.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::Accepted => "ACCEPTED",
            RequestStatus::Rejected => "REJECTED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Ok(RequestStatus::Pending),
            "ACCEPTED" => Ok(RequestStatus::Accepted),
            "REJECTED" => Ok(RequestStatus::Rejected),
            other => Err(format!("Unknown request status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    pub id: Uuid,
    pub event_id: Uuid,
    pub requested_by_id: Option<Uuid>,
    pub requested_by_email: String,
    pub status: RequestStatus,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub struct EventRequestRow {
    pub id: Uuid,
    pub event_id: Uuid,
    pub requested_by_id: Option<Uuid>,
    pub requested_by_email: String,
    pub status: String,
    pub created_at: NaiveDateTime,
}

impl TryFrom<EventRequestRow> for EventRequest {
    type Error = String;

    fn try_from(row: EventRequestRow) -> Result<Self, Self::Error> {
        Ok(EventRequest {
            id: row.id,
            event_id: row.event_id,
            requested_by_id: row.requested_by_id,
            requested_by_email: row.requested_by_email,
            status: row.status.parse()?,
            created_at: row.created_at,
        })
    }
}

/// Краткие данные события для экранов заявок.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEventSummary {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub organizer: String,
    pub venue: String,
    pub start_date_time: NaiveDateTime,
    pub end_date_time: NaiveDateTime,
    pub admin_approved: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestWithEvent {
    pub id: Uuid,
    pub requested_by_id: Option<Uuid>,
    pub requested_by_email: String,
    pub status: RequestStatus,
    pub created_at: NaiveDateTime,
    pub event: RequestEventSummary,
}

// Плоская строка JOIN event_requests + events
#[derive(Debug, Clone, FromRow)]
pub struct RequestWithEventRow {
    pub id: Uuid,
    pub requested_by_id: Option<Uuid>,
    pub requested_by_email: String,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub event_id: Uuid,
    pub title: String,
    pub description: String,
    pub organizer: String,
    pub venue: String,
    pub start_date_time: NaiveDateTime,
    pub end_date_time: NaiveDateTime,
    pub admin_approved: bool,
}

impl TryFrom<RequestWithEventRow> for RequestWithEvent {
    type Error = String;

    fn try_from(row: RequestWithEventRow) -> Result<Self, Self::Error> {
        Ok(RequestWithEvent {
            id: row.id,
            requested_by_id: row.requested_by_id,
            requested_by_email: row.requested_by_email,
            status: row.status.parse()?,
            created_at: row.created_at,
            event: RequestEventSummary {
                id: row.event_id,
                title: row.title,
                description: row.description,
                organizer: row.organizer,
                venue: row.venue,
                start_date_time: row.start_date_time,
                end_date_time: row.end_date_time,
                admin_approved: row.admin_approved,
            },
        })
    }
}
