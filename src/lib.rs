pub mod cache;
pub mod client;
pub mod clock;
pub mod config;
pub mod controllers;
pub mod error;
pub mod filter;
pub mod listing;
pub mod middleware;
pub mod models;
pub mod redis_client;
pub mod repository;
pub mod services;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::cache::CacheService;
use crate::clock::Clock;
use crate::config::Config;
use crate::repository::{EventRepository, RequestRepository, UserRepository};
use crate::services::identity::IdentityProvider;
use crate::services::images::ImageStore;

// Shared state для всего приложения. Хранилище и внешние сервисы - за
// трейтами, чтобы main подставлял Postgres/HTTP, а тесты - память и заглушки.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub events: Arc<dyn EventRepository>,
    pub requests: Arc<dyn RequestRepository>,
    pub users: Arc<dyn UserRepository>,
    pub cache: CacheService,
    pub identity: Arc<dyn IdentityProvider>,
    pub images: Arc<dyn ImageStore>,
    pub clock: Arc<dyn Clock>,
}

/// Корневой роутер: служебные маршруты и API под `/api`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Event Board API v1.0" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", controllers::routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
