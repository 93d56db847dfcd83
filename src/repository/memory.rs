use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use uuid::Uuid;

use super::{EventRepository, Requester, RequestRepository, UserRepository};
use crate::error::{AppError, AppResult};
use crate::filter::Predicate;
use crate::models::event::delimited;
use crate::models::event_request::RequestEventSummary;
use crate::models::{
    EventEdit, EventRequest, EventRow, IdentityProfile, NewEvent, RequestStatus, RequestWithEvent,
    Role, User,
};

// Порядковый номер вставки разрешает равенство created_at при сортировке "новые первыми".
struct Stored<T> {
    seq: u64,
    value: T,
}

#[derive(Default)]
struct Tables {
    next_seq: u64,
    events: Vec<Stored<EventRow>>,
    requests: Vec<Stored<EventRequest>>,
    users: HashMap<String, User>,
}

impl Tables {
    fn seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn user_by_id(&self, id: Uuid) -> Option<&User> {
        self.users.values().find(|u| u.id == id)
    }

    /// Подставляет данные создателя, как это делает LEFT JOIN в Postgres.
    fn hydrate(&self, row: &EventRow) -> EventRow {
        let mut row = row.clone();
        let creator = row.creator_id.and_then(|id| self.user_by_id(id));
        row.creator_full_name = creator.map(|u| u.full_name.clone());
        row.creator_account_email = creator.map(|u| u.email.clone());
        row
    }

    fn event_mut(&mut self, id: Uuid) -> Option<&mut EventRow> {
        self.events.iter_mut().map(|s| &mut s.value).find(|e| e.id == id)
    }

    fn with_event(&self, request: &EventRequest) -> Option<RequestWithEvent> {
        let event = self.events.iter().map(|s| &s.value).find(|e| e.id == request.event_id)?;
        Some(RequestWithEvent {
            id: request.id,
            requested_by_id: request.requested_by_id,
            requested_by_email: request.requested_by_email.clone(),
            status: request.status,
            created_at: request.created_at,
            event: RequestEventSummary {
                id: event.id,
                title: event.title.clone(),
                description: event.description.clone(),
                organizer: event.organizer.clone(),
                venue: event.venue.clone(),
                start_date_time: event.start_date_time,
                end_date_time: event.end_date_time,
                admin_approved: event.admin_approved,
            },
        })
    }

    fn requests_where(&self, keep: impl Fn(&EventRequest) -> bool) -> Vec<RequestWithEvent> {
        let mut matched: Vec<&Stored<EventRequest>> =
            self.requests.iter().filter(|s| keep(&s.value)).collect();
        matched.sort_by(|a, b| {
            b.value
                .created_at
                .cmp(&a.value.created_at)
                .then(b.seq.cmp(&a.seq))
        });
        matched
            .into_iter()
            .filter_map(|s| self.with_event(&s.value))
            .collect()
    }
}

fn new_row(id: Uuid, event: NewEvent, created_at: NaiveDateTime) -> EventRow {
    EventRow {
        id,
        creator_id: Some(event.creator_id),
        creator_email: event.creator_email,
        admin_approved: event.admin_approved,
        organizer: event.organizer,
        title: event.title,
        description: event.description,
        category: event.category.as_str().to_string(),
        tags: delimited::join(&event.tags),
        venue: event.venue,
        start_date_time: event.start_date_time,
        end_date_time: event.end_date_time,
        image_urls: delimited::join(&event.image_urls),
        ticket_link: event.ticket_link,
        created_at,
        creator_full_name: None,
        creator_account_email: None,
    }
}

/// Хранилище в памяти процесса. Один мьютекс на все таблицы: каждая операция
/// видит согласованное состояние, как одна транзакция.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> AppResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|e| AppError::internal("Internal server error", format!("memory store poisoned: {e}")))
    }

    fn matching(tables: &Tables, predicate: &Predicate) -> Vec<EventRow> {
        let mut rows: Vec<EventRow> = tables
            .events
            .iter()
            .map(|s| tables.hydrate(&s.value))
            .filter(|row| predicate.matches(row))
            .collect();
        rows.sort_by(|a, b| {
            a.start_date_time
                .cmp(&b.start_date_time)
                .then(a.id.cmp(&b.id))
        });
        rows
    }

    fn newest_first(tables: &Tables, keep: impl Fn(&EventRow) -> bool) -> Vec<EventRow> {
        let mut matched: Vec<&Stored<EventRow>> =
            tables.events.iter().filter(|s| keep(&s.value)).collect();
        matched.sort_by(|a, b| {
            b.value
                .created_at
                .cmp(&a.value.created_at)
                .then(b.seq.cmp(&a.seq))
        });
        matched.into_iter().map(|s| tables.hydrate(&s.value)).collect()
    }
}

#[async_trait]
impl EventRepository for MemoryStore {
    async fn fetch_page(&self, predicate: &Predicate, offset: i64, limit: i64) -> AppResult<Vec<EventRow>> {
        let tables = self.tables()?;
        let offset = usize::try_from(offset.max(0)).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
        Ok(Self::matching(&tables, predicate)
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect())
    }

    async fn count(&self, predicate: &Predicate) -> AppResult<i64> {
        let tables = self.tables()?;
        Ok(Self::matching(&tables, predicate).len() as i64)
    }

    async fn find(&self, id: Uuid) -> AppResult<Option<EventRow>> {
        let tables = self.tables()?;
        Ok(tables
            .events
            .iter()
            .find(|s| s.value.id == id)
            .map(|s| tables.hydrate(&s.value)))
    }

    async fn insert(&self, event: NewEvent) -> AppResult<EventRow> {
        let mut tables = self.tables()?;
        let row = new_row(Uuid::new_v4(), event, Local::now().naive_local());
        let seq = tables.seq();
        let hydrated = tables.hydrate(&row);
        tables.events.push(Stored { seq, value: row });
        Ok(hydrated)
    }

    async fn insert_with_request(
        &self,
        event: NewEvent,
        requester: &Requester,
    ) -> AppResult<(EventRow, EventRequest)> {
        let mut tables = self.tables()?;
        let now = Local::now().naive_local();
        let row = new_row(Uuid::new_v4(), event, now);
        let request = EventRequest {
            id: Uuid::new_v4(),
            event_id: row.id,
            requested_by_id: Some(requester.user_id),
            requested_by_email: requester.email.clone(),
            status: RequestStatus::Pending,
            created_at: now,
        };

        let hydrated = tables.hydrate(&row);
        let seq = tables.seq();
        tables.events.push(Stored { seq, value: row });
        tables.requests.push(Stored {
            seq,
            value: request.clone(),
        });
        Ok((hydrated, request))
    }

    async fn update(&self, id: Uuid, edit: &EventEdit) -> AppResult<Option<EventRow>> {
        let mut tables = self.tables()?;
        let Some(event) = tables.event_mut(id) else {
            return Ok(None);
        };
        event.title = edit.title.clone();
        event.organizer = edit.organizer.clone();
        event.venue = edit.venue.clone();
        event.start_date_time = edit.start_date_time;
        event.end_date_time = edit.end_date_time;
        let updated = event.clone();
        Ok(Some(tables.hydrate(&updated)))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables()?;
        let before = tables.events.len();
        tables.events.retain(|s| s.value.id != id);
        let deleted = tables.events.len() < before;
        if deleted {
            tables.requests.retain(|s| s.value.event_id != id);
        }
        Ok(deleted)
    }

    async fn list_all(&self) -> AppResult<Vec<EventRow>> {
        let tables = self.tables()?;
        Ok(Self::newest_first(&tables, |_| true))
    }

    async fn list_approved_by_creator(&self, creator_id: Uuid) -> AppResult<Vec<EventRow>> {
        let tables = self.tables()?;
        Ok(Self::newest_first(&tables, |e| {
            e.admin_approved && e.creator_id == Some(creator_id)
        }))
    }
}

#[async_trait]
impl RequestRepository for MemoryStore {
    async fn list_pending(&self) -> AppResult<Vec<RequestWithEvent>> {
        let tables = self.tables()?;
        Ok(tables.requests_where(|r| r.status == RequestStatus::Pending))
    }

    async fn list_for_requester(&self, user_id: Uuid) -> AppResult<Vec<RequestWithEvent>> {
        let tables = self.tables()?;
        Ok(tables.requests_where(|r| r.requested_by_id == Some(user_id)))
    }

    async fn transition(&self, id: Uuid, status: RequestStatus) -> AppResult<EventRequest> {
        // Проверка и изменение под одной блокировкой.
        let mut tables = self.tables()?;
        let request = tables
            .requests
            .iter_mut()
            .map(|s| &mut s.value)
            .find(|r| r.id == id)
            .ok_or_else(|| AppError::not_found("Event request not found"))?;
        if request.status != RequestStatus::Pending {
            return Err(AppError::AlreadyProcessed);
        }
        request.status = status;
        let request = request.clone();

        if status == RequestStatus::Accepted {
            if let Some(event) = tables.event_mut(request.event_id) {
                event.admin_approved = true;
            }
            if let Some(user_id) = request.requested_by_id {
                if let Some(user) = tables.users.values_mut().find(|u| u.id == user_id) {
                    if user.role == Role::Viewer {
                        user.role = Role::Creator;
                    }
                }
            }
        }
        Ok(request)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_external_id(&self, external_id: &str) -> AppResult<Option<User>> {
        let tables = self.tables()?;
        Ok(tables.users.get(external_id).cloned())
    }

    async fn upsert(&self, profile: &IdentityProfile) -> AppResult<User> {
        let mut tables = self.tables()?;
        let user = tables
            .users
            .entry(profile.external_id.clone())
            .and_modify(|user| {
                user.email = profile.email.clone();
                user.full_name = profile.full_name.clone();
                if profile.role != Role::Viewer {
                    user.role = profile.role;
                }
            })
            .or_insert_with(|| User {
                id: Uuid::new_v4(),
                external_id: profile.external_id.clone(),
                email: profile.email.clone(),
                full_name: profile.full_name.clone(),
                role: profile.role,
                created_at: profile.created_at,
                last_signed_in: None,
            });
        Ok(user.clone())
    }

    async fn delete_by_external_id(&self, external_id: &str) -> AppResult<bool> {
        let mut tables = self.tables()?;
        let Some(user) = tables.users.remove(external_id) else {
            return Ok(false);
        };
        // ON DELETE SET NULL
        for event in tables.events.iter_mut().map(|s| &mut s.value) {
            if event.creator_id == Some(user.id) {
                event.creator_id = None;
            }
        }
        for request in tables.requests.iter_mut().map(|s| &mut s.value) {
            if request.requested_by_id == Some(user.id) {
                request.requested_by_id = None;
            }
        }
        Ok(true)
    }

    async fn touch_last_signed_in(&self, external_id: &str, at: NaiveDateTime) -> AppResult<bool> {
        let mut tables = self.tables()?;
        match tables.users.get_mut(external_id) {
            Some(user) => {
                user.last_signed_in = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Clause;
    use crate::models::Category;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn event(creator_id: Uuid, title: &str, start: NaiveDateTime, approved: bool) -> NewEvent {
        NewEvent {
            creator_id,
            creator_email: "creator@example.com".into(),
            admin_approved: approved,
            organizer: "Org".into(),
            title: title.into(),
            description: "Desc".into(),
            category: Category::Tech,
            tags: vec!["Art".into(), "Free".into()],
            venue: "Hall".into(),
            start_date_time: start,
            end_date_time: start + chrono::Duration::hours(2),
            image_urls: vec![],
            ticket_link: String::new(),
        }
    }

    fn profile(external_id: &str, role: Role) -> IdentityProfile {
        IdentityProfile {
            external_id: external_id.into(),
            email: format!("{external_id}@example.com"),
            full_name: "Jordan Doe".into(),
            role,
            created_at: at(1, 0),
        }
    }

    #[tokio::test]
    async fn page_and_count_share_the_predicate() {
        let store = MemoryStore::new();
        let creator = Uuid::new_v4();
        for day in 1..=5 {
            store.insert(event(creator, &format!("e{day}"), at(day, 10), true)).await.unwrap();
        }
        store.insert(event(creator, "hidden", at(3, 10), false)).await.unwrap();

        let predicate = Predicate::public().and(Clause::StartsFrom(at(2, 0)));
        let page = store.fetch_page(&predicate, 1, 2).await.unwrap();
        let titles: Vec<_> = page.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["e3", "e4"]);
        assert_eq!(store.count(&predicate).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn second_transition_is_rejected_and_promotes_once() {
        let store = MemoryStore::new();
        let user = store.upsert(&profile("ext_1", Role::Viewer)).await.unwrap();
        let requester = Requester {
            user_id: user.id,
            email: user.email.clone(),
        };
        let (row, request) = store
            .insert_with_request(event(user.id, "pending", at(4, 9), false), &requester)
            .await
            .unwrap();

        let accepted = store.transition(request.id, RequestStatus::Accepted).await.unwrap();
        assert_eq!(accepted.status, RequestStatus::Accepted);
        assert!(matches!(
            store.transition(request.id, RequestStatus::Rejected).await,
            Err(AppError::AlreadyProcessed)
        ));
        assert!(store.find(row.id).await.unwrap().unwrap().admin_approved);
        let promoted = store.find_by_external_id("ext_1").await.unwrap().unwrap();
        assert_eq!(promoted.role, Role::Creator);

        assert!(matches!(
            store.transition(Uuid::new_v4(), RequestStatus::Accepted).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn viewer_sync_keeps_granted_role() {
        let store = MemoryStore::new();
        store.upsert(&profile("ext_2", Role::Creator)).await.unwrap();
        let user = store.upsert(&profile("ext_2", Role::Viewer)).await.unwrap();
        assert_eq!(user.role, Role::Creator);
    }

    #[tokio::test]
    async fn deleting_user_detaches_events() {
        let store = MemoryStore::new();
        let user = store.upsert(&profile("ext_3", Role::Creator)).await.unwrap();
        let row = store.insert(event(user.id, "owned", at(2, 9), true)).await.unwrap();
        assert_eq!(row.creator_full_name.as_deref(), Some("Jordan Doe"));

        assert!(store.delete_by_external_id("ext_3").await.unwrap());
        assert!(!store.delete_by_external_id("ext_3").await.unwrap());

        let row = store.find(row.id).await.unwrap().unwrap();
        assert!(row.creator_id.is_none());
        assert!(row.creator_full_name.is_none());
        assert_eq!(row.creator_email, "creator@example.com");
    }
}
