//! Общая обвязка интеграционных тестов: настоящий роутер поверх хранилища в
//! памяти, подмененные провайдер идентификации и хранилище картинок,
//! фиксированные часы.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use event_board::cache::CacheService;
use event_board::clock::FixedClock;
use event_board::config::Config;
use event_board::error::{AppError, AppResult};
use event_board::models::{Category, EventRow, IdentityProfile, NewEvent, Role, User};
use event_board::repository::{EventRepository, MemoryStore, UserRepository};
use event_board::services::identity::{IdentityProvider, SessionIdentity};
use event_board::services::images::ImageStore;
use event_board::AppState;

pub const ADMIN_TOKEN: &str = "admin-token";
pub const CREATOR_TOKEN: &str = "creator-token";
pub const OTHER_CREATOR_TOKEN: &str = "other-creator-token";
pub const VIEWER_TOKEN: &str = "viewer-token";

/// Среда, 17 января 2024, полдень. Неделя (с воскресенья): 14..21 января.
pub fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 17)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

pub fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

#[derive(Default)]
pub struct FakeIdentity {
    sessions: Mutex<HashMap<String, SessionIdentity>>,
}

impl FakeIdentity {
    fn add(&self, token: &str, session: SessionIdentity) {
        self.sessions.lock().unwrap().insert(token.to_string(), session);
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn session(&self, token: &str) -> AppResult<Option<SessionIdentity>> {
        Ok(self.sessions.lock().unwrap().get(token).cloned())
    }
}

/// Хранилище картинок, которое "ломается" на файлах с `broken` в имени.
#[derive(Default)]
pub struct FakeImages {
    pub uploaded: Mutex<Vec<String>>,
}

#[async_trait]
impl ImageStore for FakeImages {
    async fn upload(&self, _bytes: Vec<u8>, file_name: &str) -> AppResult<String> {
        if file_name.contains("broken") {
            return Err(AppError::Upstream(format!("upload of {file_name} refused")));
        }
        self.uploaded.lock().unwrap().push(file_name.to_string());
        Ok(format!("https://cdn.example.com/{file_name}"))
    }
}

pub struct TestApp {
    router: Router,
    pub store: Arc<MemoryStore>,
    pub images: Arc<FakeImages>,
    pub admin: User,
    pub creator: User,
    pub other_creator: User,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(Config::default()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        let identity = Arc::new(FakeIdentity::default());
        let images = Arc::new(FakeImages::default());

        let admin = seed_user(&store, &identity, ADMIN_TOKEN, "admin", Role::Admin).await;
        let creator = seed_user(&store, &identity, CREATOR_TOKEN, "creator", Role::Viewer).await;
        let other_creator =
            seed_user(&store, &identity, OTHER_CREATOR_TOKEN, "other", Role::Creator).await;
        seed_user(&store, &identity, VIEWER_TOKEN, "viewer", Role::Viewer).await;

        let state = Arc::new(AppState {
            config,
            events: store.clone(),
            requests: store.clone(),
            users: store.clone(),
            cache: CacheService::disabled(),
            identity,
            images: images.clone(),
            clock: Arc::new(FixedClock(now())),
        });

        TestApp {
            router: event_board::router(state),
            store,
            images,
            admin,
            creator,
            other_creator,
        }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(request(Method::GET, uri, token, Body::empty(), None)).await
    }

    pub async fn json(&self, method: Method, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(request(
            method,
            uri,
            token,
            Body::from(body.to_string()),
            Some("application/json".to_string()),
        ))
        .await
    }

    pub async fn multipart(&self, uri: &str, token: Option<&str>, form: &MultipartForm) -> (StatusCode, Value) {
        self.send(request(
            Method::POST,
            uri,
            token,
            Body::from(form.body()),
            Some(form.content_type()),
        ))
        .await
    }

    pub async fn insert_event(&self, event: NewEvent) -> EventRow {
        self.store.insert(event).await.unwrap()
    }
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Body, content_type: Option<String>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    builder.body(body).unwrap()
}

async fn seed_user(store: &MemoryStore, identity: &FakeIdentity, token: &str, name: &str, role: Role) -> User {
    let external_id = format!("ext_{name}");
    let email = format!("{name}@example.com");
    let user = store
        .upsert(&IdentityProfile {
            external_id: external_id.clone(),
            email: email.clone(),
            full_name: name.to_string(),
            role,
            created_at: now(),
        })
        .await
        .unwrap();
    identity.add(
        token,
        SessionIdentity {
            external_user_id: external_id,
            email,
            full_name: name.to_string(),
            role,
        },
    );
    user
}

/// Одобренное событие с разумными значениями по умолчанию.
pub fn event(title: &str, category: Category, start: NaiveDateTime) -> NewEvent {
    NewEvent {
        creator_id: Uuid::new_v4(),
        creator_email: "seed@example.com".into(),
        admin_approved: true,
        organizer: "City Events".into(),
        title: title.into(),
        description: "Seeded event".into(),
        category,
        tags: vec!["Free".into()],
        venue: "Main Hall".into(),
        start_date_time: start,
        end_date_time: start + Duration::hours(2),
        image_urls: Vec::new(),
        ticket_link: String::new(),
    }
}

/// Простой построитель multipart/form-data.
pub struct MultipartForm {
    boundary: String,
    parts: Vec<u8>,
}

impl MultipartForm {
    pub fn new() -> Self {
        MultipartForm {
            boundary: "----event-board-test-boundary".to_string(),
            parts: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.parts.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                self.boundary, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, bytes: &[u8]) -> Self {
        self.parts.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: image/png\r\n\r\n",
                self.boundary, name, file_name
            )
            .as_bytes(),
        );
        self.parts.extend_from_slice(bytes);
        self.parts.extend_from_slice(b"\r\n");
        self
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn body(&self) -> Vec<u8> {
        let mut body = self.parts.clone();
        body.extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        body
    }
}

/// Валидная форма подачи события, поля можно переопределить.
pub fn submission_form(start: &str, end: &str) -> MultipartForm {
    MultipartForm::new()
        .text("organizer", "Night Owls")
        .text("title", "Rooftop Jazz")
        .text("description", "Live trio under the stars")
        .text("category", "WEEKENDS")
        .text("tags", "Music & Concerts")
        .text("tags", "Free")
        .text("venue", "Skyline Terrace")
        .text("startDate", start)
        .text("endDate", end)
        .text("ticketLink", "https://tickets.example.com/jazz")
}
