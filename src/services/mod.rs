pub mod approval;
pub mod identity;
pub mod images;
pub mod management;
pub mod submission;

use chrono::NaiveDateTime;

use crate::error::{AppError, AppResult};
use crate::filter::date_range::parse_date_input;
use crate::models::User;

/// Кто выполняет действие: локальный пользователь и признак админской сессии.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user: User,
    pub is_admin: bool,
}

impl Actor {
    /// Создатель управляет только своими событиями, админ - всеми.
    pub fn ensure_owns(&self, creator_id: Option<uuid::Uuid>) -> AppResult<()> {
        if self.is_admin || creator_id == Some(self.user.id) {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "You can only manage your own events".to_string(),
            ))
        }
    }
}

/// Начало и конец события: оба разбираются, конец строго позже начала.
pub(crate) fn parse_schedule(start: &str, end: &str) -> AppResult<(NaiveDateTime, NaiveDateTime)> {
    let (Some(start), Some(end)) = (parse_date_input(start), parse_date_input(end)) else {
        return Err(AppError::validation("Invalid date format"));
    };
    if end <= start {
        return Err(AppError::validation("End date must be after start date"));
    }
    Ok((start, end))
}
