//! Клиент просмотра событий: владеет выбором фильтров, строит запросы и
//! применяет ответы сервера.
//!
//! Каждый запрос получает номер. Новый запрос отменяет предыдущий, а ответ
//! применяется к состоянию, только если его номер все еще последний.

pub mod query;
pub mod transport;

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::AbortHandle;
use tracing::{debug, warn};

use crate::listing::{ListingPage, Pagination};
use crate::models::EventView;

pub use query::{FilterState, FilterUpdate};
pub use transport::{ClientError, EventsTransport, HttpTransport};

/// Снимок состояния для отрисовки.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub filters: FilterState,
    pub events: Vec<EventView>,
    pub pagination: Pagination,
    pub loading: bool,
    pub error: Option<String>,
}

struct Inner {
    filters: FilterState,
    events: Vec<EventView>,
    pagination: Pagination,
    loading: bool,
    error: Option<String>,
    seq: u64,
    in_flight: Option<AbortHandle>,
}

pub struct EventsFilterClient<T: EventsTransport> {
    transport: Arc<T>,
    inner: Arc<Mutex<Inner>>,
}

impl<T: EventsTransport> Clone for EventsFilterClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            inner: self.inner.clone(),
        }
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    // Под замком нет кода, который может паниковать посреди изменения.
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<T: EventsTransport> EventsFilterClient<T> {
    pub fn new(transport: T, page_size: u32) -> Self {
        Self {
            transport: Arc::new(transport),
            inner: Arc::new(Mutex::new(Inner {
                filters: FilterState::default(),
                events: Vec::new(),
                pagination: Pagination::compute(1, page_size, 0),
                loading: false,
                error: None,
                seq: 0,
                in_flight: None,
            })),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        let inner = lock(&self.inner);
        Snapshot {
            filters: inner.filters.clone(),
            events: inner.events.clone(),
            pagination: inner.pagination,
            loading: inner.loading,
            error: inner.error.clone(),
        }
    }

    /// Меняет поле фильтра без запроса.
    pub fn set_filter(&self, update: FilterUpdate) {
        lock(&self.inner).filters.apply(update);
    }

    pub fn active_filters_count(&self) -> usize {
        lock(&self.inner).filters.active_count()
    }

    /// Применяет изменения и загружает первую страницу.
    pub async fn apply_filters(&self, overrides: Vec<FilterUpdate>) {
        {
            let mut inner = lock(&self.inner);
            for update in overrides {
                inner.filters.apply(update);
            }
        }
        self.fetch(Some(1)).await;
    }

    /// Сбрасывает фильтры к значениям по умолчанию и загружает первую страницу.
    pub async fn clear_filters(&self) {
        lock(&self.inner).filters = FilterState::default();
        self.fetch(Some(1)).await;
    }

    /// Страница `page` при тех же фильтрах. Номер прижимается к известному
    /// числу страниц, но сервер все равно остается источником истины.
    pub async fn load_page(&self, page: u32) {
        let page = {
            let inner = lock(&self.inner);
            let total = inner.pagination.total_pages;
            if total > 0 {
                page.clamp(1, total)
            } else {
                page.max(1)
            }
        };
        self.fetch(Some(page)).await;
    }

    pub async fn search(&self, term: &str) {
        self.apply_filters(vec![FilterUpdate::Search(term.to_string())]).await;
    }

    /// Повторяет текущую страницу.
    pub async fn refetch(&self) {
        self.fetch(None).await;
    }

    async fn fetch(&self, page: Option<u32>) {
        let (seq, query) = {
            let mut inner = lock(&self.inner);
            inner.seq += 1;
            if let Some(previous) = inner.in_flight.take() {
                previous.abort();
            }
            inner.loading = true;
            inner.error = None;
            let page = page.unwrap_or(inner.pagination.current_page);
            let query = inner.filters.to_query(page, inner.pagination.limit);
            (inner.seq, query)
        };
        debug!(seq, %query, "fetching events");

        let transport = self.transport.clone();
        let state = self.inner.clone();
        let task = tokio::spawn(async move {
            let result = transport.fetch(&query).await;
            apply_response(&state, seq, result);
        });

        {
            let mut inner = lock(&self.inner);
            if inner.seq == seq {
                inner.in_flight = Some(task.abort_handle());
            }
        }

        // Отмененный запрос просто завершается: состояние уже принадлежит новому.
        if let Err(e) = task.await {
            if !e.is_cancelled() {
                warn!("Events fetch task failed: {:?}", e);
            }
        }
    }
}

fn apply_response(state: &Mutex<Inner>, seq: u64, result: Result<ListingPage, ClientError>) {
    let mut inner = lock(state);
    if inner.seq != seq {
        debug!(seq, latest = inner.seq, "dropping stale events response");
        return;
    }

    match result {
        Ok(page) => {
            inner.events = page.events;
            inner.pagination = page.pagination;
            inner.error = None;
        }
        Err(e) => {
            warn!("Failed to load events: {}", e);
            inner.events.clear();
            inner.error = Some(e.to_string());
        }
    }
    inner.loading = false;
    inner.in_flight = None;
}
