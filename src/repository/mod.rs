//! Хранилище событий, заявок и зеркала пользователей.
//!
//! Две реализации: Postgres (`postgres`) и память (`memory`). Обе применяют
//! один и тот же [`Predicate`], поэтому страница и общий счетчик считаются
//! по идентичной логике фильтрации.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::error::AppResult;
use crate::filter::Predicate;
use crate::models::{
    EventEdit, EventRequest, EventRow, IdentityProfile, NewEvent, RequestStatus, RequestWithEvent,
    User,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Кто подал заявку на публикацию.
#[derive(Debug, Clone)]
pub struct Requester {
    pub user_id: Uuid,
    pub email: String,
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Страница событий по предикату: `start_date_time ASC, id ASC`.
    async fn fetch_page(&self, predicate: &Predicate, offset: i64, limit: i64)
        -> AppResult<Vec<EventRow>>;

    /// Количество всех событий под тем же предикатом, без пагинации.
    async fn count(&self, predicate: &Predicate) -> AppResult<i64>;

    async fn find(&self, id: Uuid) -> AppResult<Option<EventRow>>;

    async fn insert(&self, event: NewEvent) -> AppResult<EventRow>;

    /// Событие и его `PENDING`-заявка создаются атомарно.
    async fn insert_with_request(
        &self,
        event: NewEvent,
        requester: &Requester,
    ) -> AppResult<(EventRow, EventRequest)>;

    async fn update(&self, id: Uuid, edit: &EventEdit) -> AppResult<Option<EventRow>>;

    /// `true`, если событие было и удалено.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;

    /// Все события, новые первыми.
    async fn list_all(&self) -> AppResult<Vec<EventRow>>;

    /// Одобренные события автора, новые заявки первыми.
    async fn list_approved_by_creator(&self, creator_id: Uuid) -> AppResult<Vec<EventRow>>;
}

#[async_trait]
pub trait RequestRepository: Send + Sync {
    async fn list_pending(&self) -> AppResult<Vec<RequestWithEvent>>;

    async fn list_for_requester(&self, user_id: Uuid) -> AppResult<Vec<RequestWithEvent>>;

    /// Переводит заявку из `PENDING` в `status`. Проверка статуса делается в
    /// момент изменения: из двух конкурентных переходов успешен ровно один,
    /// второй получает `AlreadyProcessed`. При `ACCEPTED` событие одобряется,
    /// а автор повышается с `VIEWER` до `CREATOR`.
    async fn transition(&self, id: Uuid, status: RequestStatus) -> AppResult<EventRequest>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_external_id(&self, external_id: &str) -> AppResult<Option<User>>;

    /// Создать или обновить по `external_id`. Роль `VIEWER` из провайдера не
    /// понижает уже выданную локально роль.
    async fn upsert(&self, profile: &IdentityProfile) -> AppResult<User>;

    /// `false`, если пользователя уже нет - это не ошибка.
    async fn delete_by_external_id(&self, external_id: &str) -> AppResult<bool>;

    async fn touch_last_signed_in(&self, external_id: &str, at: NaiveDateTime) -> AppResult<bool>;
}
