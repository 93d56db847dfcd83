use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use sqlx::{postgres::PgPoolOptions, PgExecutor, PgPool, Postgres, QueryBuilder};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use super::{EventRepository, Requester, RequestRepository, UserRepository};
use crate::error::{AppError, AppResult};
use crate::filter::{Clause, Predicate};
use crate::models::event::delimited;
use crate::models::event_request::{EventRequestRow, RequestWithEventRow};
use crate::models::user::UserRow;
use crate::models::{
    EventEdit, EventRequest, EventRow, IdentityProfile, NewEvent, RequestStatus, RequestWithEvent,
    User,
};

const EVENT_SELECT: &str = r#"
    SELECT
        e.id, e.creator_id, e.creator_email, e.admin_approved,
        e.organizer, e.title, e.description, e.category, e.tags, e.venue,
        e.start_date_time, e.end_date_time, e.image_urls, e.ticket_link, e.created_at,
        u.full_name AS creator_full_name,
        u.email AS creator_account_email
    FROM events e
    LEFT JOIN users u ON u.id = e.creator_id
"#;

const REQUEST_SELECT: &str = r#"
    SELECT
        r.id, r.requested_by_id, r.requested_by_email, r.status, r.created_at,
        e.id AS event_id, e.title, e.description, e.organizer, e.venue,
        e.start_date_time, e.end_date_time, e.admin_approved
    FROM event_requests r
    JOIN events e ON e.id = r.event_id
"#;

const USER_COLUMNS: &str = "id, external_id, email, full_name, role, created_at, last_signed_in";

/// Экранирует `%`, `_` и `\` и оборачивает в `%...%` для ILIKE.
fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn push_clause(qb: &mut QueryBuilder<'_, Postgres>, clause: &Clause) {
    match clause {
        Clause::Approved => {
            qb.push("e.admin_approved = TRUE");
        }
        Clause::Category(category) => {
            qb.push("e.category = ").push_bind(category.clone());
        }
        Clause::StartsFrom(from) => {
            qb.push("e.start_date_time >= ").push_bind(*from);
        }
        Clause::StartsBefore(to) => {
            qb.push("e.start_date_time < ").push_bind(*to);
        }
        Clause::Contains(field, needle) => {
            qb.push(field.column())
                .push(" ILIKE ")
                .push_bind(like_pattern(needle))
                .push(" ESCAPE '\\'");
        }
        Clause::Any(group) => {
            qb.push("(");
            for (i, inner) in group.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                push_clause(qb, inner);
            }
            qb.push(")");
        }
    }
}

/// Дописывает ` WHERE ...` для предиката. Только связанные параметры.
pub fn push_predicate(qb: &mut QueryBuilder<'_, Postgres>, predicate: &Predicate) {
    qb.push(" WHERE ");
    if predicate.clauses().is_empty() {
        qb.push("TRUE");
        return;
    }
    for (i, clause) in predicate.clauses().iter().enumerate() {
        if i > 0 {
            qb.push(" AND ");
        }
        push_clause(qb, clause);
    }
}

fn corrupt_row(detail: String) -> AppError {
    AppError::internal("Internal server error", format!("corrupt row: {detail}"))
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Пул соединений; свободное соединение ждем не дольше 5 секунд.
    pub async fn connect(database_url: &str, pool_size: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;
        info!("Postgres pool ready ({} connections max)", pool_size);
        Ok(Self::new(pool))
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/migrations").run(&self.pool).await?;
        info!("Schema migrations applied");
        Ok(())
    }

    async fn insert_event<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
        event: &NewEvent,
        created_at: NaiveDateTime,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO events (
                id, creator_id, creator_email, admin_approved, organizer, title, description,
                category, tags, venue, start_date_time, end_date_time, image_urls, ticket_link,
                created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(id)
        .bind(event.creator_id)
        .bind(&event.creator_email)
        .bind(event.admin_approved)
        .bind(&event.organizer)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.category.as_str())
        .bind(delimited::join(&event.tags))
        .bind(&event.venue)
        .bind(event.start_date_time)
        .bind(event.end_date_time)
        .bind(delimited::join(&event.image_urls))
        .bind(&event.ticket_link)
        .bind(created_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    async fn require_event(&self, id: Uuid) -> AppResult<EventRow> {
        self.find(id)
            .await?
            .ok_or_else(|| AppError::internal("Internal server error", format!("event {id} vanished after insert")))
    }

    async fn list_requests(&self, filter: &str, user_id: Option<Uuid>) -> AppResult<Vec<RequestWithEvent>> {
        let sql = format!("{REQUEST_SELECT} WHERE {filter} ORDER BY r.created_at DESC, r.id");
        let mut query = sqlx::query_as::<_, RequestWithEventRow>(&sql);
        if let Some(user_id) = user_id {
            query = query.bind(user_id);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|row| RequestWithEvent::try_from(row).map_err(corrupt_row))
            .collect()
    }
}

#[async_trait]
impl EventRepository for PgStore {
    async fn fetch_page(&self, predicate: &Predicate, offset: i64, limit: i64) -> AppResult<Vec<EventRow>> {
        let mut qb = QueryBuilder::<Postgres>::new(EVENT_SELECT);
        push_predicate(&mut qb, predicate);
        qb.push(" ORDER BY e.start_date_time ASC, e.id ASC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        debug!(sql = qb.sql(), "fetch_page");

        let rows = qb.build_query_as::<EventRow>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn count(&self, predicate: &Predicate) -> AppResult<i64> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM events e");
        push_predicate(&mut qb, predicate);
        let total = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(total)
    }

    async fn find(&self, id: Uuid) -> AppResult<Option<EventRow>> {
        let sql = format!("{EVENT_SELECT} WHERE e.id = $1");
        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn insert(&self, event: NewEvent) -> AppResult<EventRow> {
        let id = Uuid::new_v4();
        Self::insert_event(&self.pool, id, &event, Local::now().naive_local()).await?;
        info!("Event {} created by {}", id, event.creator_email);
        self.require_event(id).await
    }

    async fn insert_with_request(
        &self,
        event: NewEvent,
        requester: &Requester,
    ) -> AppResult<(EventRow, EventRequest)> {
        let event_id = Uuid::new_v4();
        let now = Local::now().naive_local();

        let mut tx = self.pool.begin().await?;
        Self::insert_event(&mut *tx, event_id, &event, now).await?;
        let request_row = sqlx::query_as::<_, EventRequestRow>(
            r#"
            INSERT INTO event_requests (id, event_id, requested_by_id, requested_by_email, status, created_at)
            VALUES ($1, $2, $3, $4, 'PENDING', $5)
            RETURNING id, event_id, requested_by_id, requested_by_email, status, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(event_id)
        .bind(requester.user_id)
        .bind(&requester.email)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        info!("Event {} submitted for approval by {}", event_id, requester.email);
        let request = EventRequest::try_from(request_row).map_err(corrupt_row)?;
        Ok((self.require_event(event_id).await?, request))
    }

    async fn update(&self, id: Uuid, edit: &EventEdit) -> AppResult<Option<EventRow>> {
        let updated = sqlx::query(
            r#"
            UPDATE events
            SET title = $2, organizer = $3, venue = $4, start_date_time = $5, end_date_time = $6
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&edit.title)
        .bind(&edit.organizer)
        .bind(&edit.venue)
        .bind(edit.start_date_time)
        .bind(edit.end_date_time)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 0 {
            return Ok(None);
        }
        self.find(id).await
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let deleted = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }

    async fn list_all(&self) -> AppResult<Vec<EventRow>> {
        let sql = format!("{EVENT_SELECT} ORDER BY e.created_at DESC, e.id");
        let rows = sqlx::query_as::<_, EventRow>(&sql).fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn list_approved_by_creator(&self, creator_id: Uuid) -> AppResult<Vec<EventRow>> {
        let sql = format!(
            "{EVENT_SELECT} LEFT JOIN event_requests r ON r.event_id = e.id \
             WHERE e.creator_id = $1 AND e.admin_approved = TRUE \
             ORDER BY COALESCE(r.created_at, e.created_at) DESC, e.id"
        );
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .bind(creator_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

#[async_trait]
impl RequestRepository for PgStore {
    async fn list_pending(&self) -> AppResult<Vec<RequestWithEvent>> {
        self.list_requests("r.status = 'PENDING'", None).await
    }

    async fn list_for_requester(&self, user_id: Uuid) -> AppResult<Vec<RequestWithEvent>> {
        self.list_requests("r.requested_by_id = $1", Some(user_id)).await
    }

    async fn transition(&self, id: Uuid, status: RequestStatus) -> AppResult<EventRequest> {
        let mut tx = self.pool.begin().await?;

        // Условный UPDATE: конкурирующая транзакция ждет блокировку строки и
        // после коммита первой уже не видит status = 'PENDING'.
        let updated = sqlx::query_as::<_, EventRequestRow>(
            r#"
            UPDATE event_requests
            SET status = $2
            WHERE id = $1 AND status = 'PENDING'
            RETURNING id, event_id, requested_by_id, requested_by_email, status, created_at
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = updated else {
            tx.rollback().await?;
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM event_requests WHERE id = $1)",
            )
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
            return Err(if exists {
                AppError::AlreadyProcessed
            } else {
                AppError::not_found("Event request not found")
            });
        };

        if status == RequestStatus::Accepted {
            sqlx::query("UPDATE events SET admin_approved = TRUE WHERE id = $1")
                .bind(row.event_id)
                .execute(&mut *tx)
                .await?;
            if let Some(user_id) = row.requested_by_id {
                sqlx::query("UPDATE users SET role = 'CREATOR' WHERE id = $1 AND role = 'VIEWER'")
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        info!("Event request {} -> {}", id, status);
        EventRequest::try_from(row).map_err(corrupt_row)
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn find_by_external_id(&self, external_id: &str) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE external_id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn upsert(&self, profile: &IdentityProfile) -> AppResult<User> {
        let sql = format!(
            r#"
            INSERT INTO users (id, external_id, email, full_name, role, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (external_id) DO UPDATE SET
                email = EXCLUDED.email,
                full_name = EXCLUDED.full_name,
                role = CASE WHEN EXCLUDED.role = 'VIEWER' THEN users.role ELSE EXCLUDED.role END
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(&profile.external_id)
            .bind(&profile.email)
            .bind(&profile.full_name)
            .bind(profile.role.as_str())
            .bind(profile.created_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(User::from(row))
    }

    async fn delete_by_external_id(&self, external_id: &str) -> AppResult<bool> {
        let deleted = sqlx::query("DELETE FROM users WHERE external_id = $1")
            .bind(external_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }

    async fn touch_last_signed_in(&self, external_id: &str, at: NaiveDateTime) -> AppResult<bool> {
        let updated = sqlx::query("UPDATE users SET last_signed_in = $2 WHERE external_id = $1")
            .bind(external_id)
            .bind(at)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(updated > 0)
    }
}
