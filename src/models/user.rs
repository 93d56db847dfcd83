use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    #[default]
    Viewer,
    Creator,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Viewer => "VIEWER",
            Role::Creator => "CREATOR",
            Role::Admin => "ADMIN",
        }
    }

    /// Роль из метаданных провайдера: всё неизвестное - `VIEWER`.
    pub fn from_metadata(value: Option<&str>) -> Role {
        value
            .and_then(|v| v.parse().ok())
            .unwrap_or(Role::Viewer)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "VIEWER" => Ok(Role::Viewer),
            "CREATOR" => Ok(Role::Creator),
            "ADMIN" => Ok(Role::Admin),
            other => Err(format!("Unknown role '{other}'")),
        }
    }
}

/// Зеркало пользователя внешнего провайдера. Меняется только синхронизацией.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub external_id: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub created_at: NaiveDateTime,
    pub last_signed_in: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub external_id: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub created_at: NaiveDateTime,
    pub last_signed_in: Option<NaiveDateTime>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            external_id: row.external_id,
            email: row.email,
            full_name: row.full_name,
            role: Role::from_metadata(Some(&row.role)),
            created_at: row.created_at,
            last_signed_in: row.last_signed_in,
        }
    }
}

/// Профиль пользователя, как его присылает провайдер идентификации.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityProfile {
    pub external_id: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub created_at: NaiveDateTime,
}
