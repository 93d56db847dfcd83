//! Синхронизация с внешним провайдером идентификации: проверка сессии на
//! каждый запрос и применение вебхуков жизненного цикла пользователя.

use async_trait::async_trait;
use axum::http::{header, StatusCode};
use chrono::{DateTime, Local, NaiveDateTime};
use serde::Deserialize;
use tokio::time::Duration;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::config::IdentityConfig;
use crate::error::{AppError, AppResult};
use crate::models::{IdentityProfile, Role};
use crate::repository::UserRepository;

/// Пользователь текущей сессии, как его видит провайдер.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIdentity {
    pub external_user_id: String,
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default, deserialize_with = "role_from_metadata")]
    pub role: Role,
}

fn role_from_metadata<'de, D>(deserializer: D) -> Result<Role, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(Role::from_metadata(raw.as_deref()))
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `None`, если токен не принадлежит активной сессии.
    async fn session(&self, token: &str) -> AppResult<Option<SessionIdentity>>;
}

pub struct HttpIdentityProvider {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpIdentityProvider {
    pub fn new(config: &IdentityConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn session(&self, token: &str) -> AppResult<Option<SessionIdentity>> {
        let response = self
            .http_client
            .get(format!("{}/sessions/current", self.base_url))
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("identity provider unreachable: {e}")))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let identity = response
                    .json::<SessionIdentity>()
                    .await
                    .map_err(|e| AppError::Upstream(format!("unreadable session payload: {e}")))?;
                Ok(Some(identity))
            }
            status => Err(AppError::Upstream(format!(
                "identity provider returned {status}"
            ))),
        }
    }
}

/// Конверт вебхука: `{ "type": ..., "data": {...} }`.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct EmailAddress {
    email_address: String,
}

#[derive(Debug, Default, Deserialize)]
struct PublicMetadata {
    role: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserData {
    id: String,
    #[serde(default)]
    email_addresses: Vec<EmailAddress>,
    full_name: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    #[serde(default)]
    public_metadata: Option<PublicMetadata>,
    // миллисекунды Unix
    created_at: Option<i64>,
}

impl UserData {
    fn full_name(&self) -> String {
        if let Some(full_name) = self.full_name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            return full_name.to_string();
        }
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn into_profile(self, now: NaiveDateTime) -> IdentityProfile {
        let role = Role::from_metadata(
            self.public_metadata
                .as_ref()
                .and_then(|m| m.role.as_deref()),
        );
        IdentityProfile {
            full_name: self.full_name(),
            email: self
                .email_addresses
                .first()
                .map(|e| e.email_address.clone())
                .unwrap_or_default(),
            role,
            created_at: self.created_at.and_then(from_millis).unwrap_or(now),
            external_id: self.id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SessionData {
    user_id: Option<String>,
    created_at: Option<i64>,
    last_active_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct DeletedData {
    id: Option<String>,
}

fn from_millis(ms: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(ms).map(|utc| utc.with_timezone(&Local).naive_local())
}

fn payload<T: serde::de::DeserializeOwned>(kind: &str, data: serde_json::Value) -> AppResult<T> {
    serde_json::from_value(data)
        .map_err(|e| AppError::validation(format!("Malformed '{kind}' payload: {e}")))
}

/// Применяет событие провайдера к зеркалу пользователей. Повторная доставка
/// того же события не меняет результат.
pub async fn apply_webhook(
    users: &dyn UserRepository,
    clock: &dyn Clock,
    envelope: WebhookEnvelope,
) -> AppResult<()> {
    let WebhookEnvelope { kind, data } = envelope;
    match kind.as_str() {
        "user.created" | "user.updated" => {
            let profile = payload::<UserData>(&kind, data)?.into_profile(clock.now());
            let user = users.upsert(&profile).await?;
            info!("User {} synced ({}, {})", user.external_id, kind, user.role.as_str());
        }
        "user.deleted" => {
            let deleted = payload::<DeletedData>(&kind, data)?;
            if let Some(external_id) = deleted.id {
                if users.delete_by_external_id(&external_id).await? {
                    info!("User {} deleted", external_id);
                } else {
                    debug!("User {} already absent", external_id);
                }
            }
        }
        "session.created" => {
            let session = payload::<SessionData>(&kind, data)?;
            if let Some(external_id) = session.user_id {
                let at = session
                    .created_at
                    .or(session.last_active_at)
                    .and_then(from_millis)
                    .unwrap_or_else(|| clock.now());
                users.touch_last_signed_in(&external_id, at).await?;
            }
        }
        other => debug!("Ignoring identity event '{}'", other),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::repository::MemoryStore;
    use chrono::NaiveDate;
    use serde_json::json;
    use wiremock::matchers::{header as header_eq, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn clock() -> FixedClock {
        FixedClock(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(12, 0, 0).unwrap())
    }

    fn envelope(value: serde_json::Value) -> WebhookEnvelope {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn user_created_twice_is_one_user() {
        let store = MemoryStore::new();
        let event = json!({
            "type": "user.created",
            "data": {
                "id": "user_1",
                "email_addresses": [{"email_address": "sam@example.com"}],
                "first_name": "Sam",
                "last_name": "Lee",
                "public_metadata": {"role": "CREATOR"},
                "created_at": 1714564800000i64
            }
        });
        apply_webhook(&store, &clock(), envelope(event.clone())).await.unwrap();
        apply_webhook(&store, &clock(), envelope(event)).await.unwrap();

        let user = store.find_by_external_id("user_1").await.unwrap().unwrap();
        assert_eq!(user.full_name, "Sam Lee");
        assert_eq!(user.email, "sam@example.com");
        assert_eq!(user.role, Role::Creator);
    }

    #[tokio::test]
    async fn deleting_missing_user_succeeds() {
        let store = MemoryStore::new();
        let event = json!({"type": "user.deleted", "data": {"id": "ghost", "deleted": true}});
        apply_webhook(&store, &clock(), envelope(event)).await.unwrap();
    }

    #[tokio::test]
    async fn session_created_stamps_last_sign_in() {
        let store = MemoryStore::new();
        let created = json!({"type": "user.created", "data": {"id": "user_2", "full_name": "Ana"}});
        apply_webhook(&store, &clock(), envelope(created)).await.unwrap();

        let session = json!({"type": "session.created", "data": {"user_id": "user_2"}});
        apply_webhook(&store, &clock(), envelope(session)).await.unwrap();

        let user = store.find_by_external_id("user_2").await.unwrap().unwrap();
        assert_eq!(user.last_signed_in, Some(clock().now()));
        assert_eq!(user.role, Role::Viewer);
    }

    #[tokio::test]
    async fn unknown_events_are_acknowledged() {
        let store = MemoryStore::new();
        let event = json!({"type": "organization.created", "data": {"id": "org_1"}});
        apply_webhook(&store, &clock(), envelope(event)).await.unwrap();
    }

    #[tokio::test]
    async fn malformed_user_payload_is_rejected() {
        let store = MemoryStore::new();
        let event = json!({"type": "user.updated", "data": {"email_addresses": []}});
        let err = apply_webhook(&store, &clock(), envelope(event)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn http_provider_resolves_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sessions/current"))
            .and(header_eq("authorization", "Bearer good"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "externalUserId": "user_9",
                "email": "admin@example.com",
                "fullName": "Root",
                "role": "ADMIN"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sessions/current"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let provider = HttpIdentityProvider::new(&IdentityConfig { base_url: server.uri() }).unwrap();
        let session = provider.session("good").await.unwrap().unwrap();
        assert_eq!(session.external_user_id, "user_9");
        assert_eq!(session.role, Role::Admin);
        assert!(provider.session("bad").await.unwrap().is_none());
    }
}
