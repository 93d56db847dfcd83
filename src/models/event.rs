use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Фиксированный набор категорий. `ANYTHING` - только фильтр, в базе не хранится.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    Weekends,
    Dining,
    Shopping,
    Stay,
    Tech,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Weekends,
        Category::Dining,
        Category::Shopping,
        Category::Stay,
        Category::Tech,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Weekends => "WEEKENDS",
            Category::Dining => "DINING",
            Category::Shopping => "SHOPPING",
            Category::Stay => "STAY",
            Category::Tech => "TECH",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == upper)
            .ok_or_else(|| format!("Unknown category '{}'", s.trim()))
    }
}

/// Словарь тегов, из которого создатели выбирают при подаче события.
pub const TAG_VOCABULARY: [&str; 16] = [
    "Free",
    "Art",
    "Trip",
    "Cafe",
    "Sports",
    "Events",
    "Festival",
    "Comedy",
    "Workshop",
    "Exhibition",
    "Restaurants",
    "Entertainment",
    "Family & Kids",
    "Food & Drink",
    "Theatre & Musicals",
    "Music & Concerts",
];

/// Кодек для многозначных полей (теги, ссылки на картинки), которые в таблице
/// лежат одной строкой через `", "`. Разбиение строки делается только здесь.
pub mod delimited {
    pub const SEPARATOR: &str = ", ";

    pub fn join<S: AsRef<str>>(items: &[S]) -> String {
        items
            .iter()
            .map(|item| item.as_ref().trim())
            .filter(|item| !item.is_empty())
            .collect::<Vec<_>>()
            .join(SEPARATOR)
    }

    /// Пустая строка дает `[]`, а не `[""]`.
    pub fn split(stored: &str) -> Vec<String> {
        stored
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Строка таблицы `events` вместе с данными создателя из `users` (LEFT JOIN).
#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
    pub id: Uuid,
    pub creator_id: Option<Uuid>,
    pub creator_email: String,
    pub admin_approved: bool,
    pub organizer: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub tags: String,
    pub venue: String,
    pub start_date_time: NaiveDateTime,
    pub end_date_time: NaiveDateTime,
    pub image_urls: String,
    pub ticket_link: String,
    pub created_at: NaiveDateTime,
    pub creator_full_name: Option<String>,
    pub creator_account_email: Option<String>,
}

/// Новое событие. Теги и картинки - списки; в строку они склеиваются
/// только в репозитории.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub creator_id: Uuid,
    pub creator_email: String,
    pub admin_approved: bool,
    pub organizer: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub tags: Vec<String>,
    pub venue: String,
    pub start_date_time: NaiveDateTime,
    pub end_date_time: NaiveDateTime,
    pub image_urls: Vec<String>,
    pub ticket_link: String,
}

/// Редактируемые поля события. Описание, категория, теги и картинки после
/// создания не меняются.
#[derive(Debug, Clone)]
pub struct EventEdit {
    pub title: String,
    pub organizer: String,
    pub venue: String,
    pub start_date_time: NaiveDateTime,
    pub end_date_time: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatorSummary {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
}

/// Событие в ответе API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventView {
    pub id: Uuid,
    pub creator_id: Option<Uuid>,
    pub creator_email: String,
    pub admin_approved: bool,
    pub organizer: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    pub venue: String,
    pub start_date_time: NaiveDateTime,
    pub end_date_time: NaiveDateTime,
    pub image_urls: Vec<String>,
    pub ticket_link: String,
    pub created_at: NaiveDateTime,
    pub creator: Option<CreatorSummary>,
}

impl From<EventRow> for EventView {
    fn from(row: EventRow) -> Self {
        let creator = match (row.creator_id, row.creator_full_name, row.creator_account_email) {
            (Some(id), Some(full_name), Some(email)) => Some(CreatorSummary { id, full_name, email }),
            _ => None,
        };
        EventView {
            id: row.id,
            creator_id: row.creator_id,
            creator_email: row.creator_email,
            admin_approved: row.admin_approved,
            organizer: row.organizer,
            title: row.title,
            description: row.description,
            category: row.category,
            tags: delimited::split(&row.tags),
            venue: row.venue,
            start_date_time: row.start_date_time,
            end_date_time: row.end_date_time,
            image_urls: delimited::split(&row.image_urls),
            ticket_link: row.ticket_link,
            created_at: row.created_at,
            creator,
        }
    }
}
