//! Подача нового события: проверка формы, загрузка картинок, запись.
//!
//! Создатель получает неодобренное событие и заявку `PENDING` в одной
//! транзакции. Админ публикует сразу, без заявки.

use futures::future::join_all;
use tracing::{info, warn};
use validator::Validate;

use super::images::slugify_file_name;
use super::{parse_schedule, Actor};
use crate::error::{AppError, AppResult};
use crate::models::event::TAG_VOCABULARY;
use crate::models::{Category, EventView, NewEvent};
use crate::repository::Requester;
use crate::AppState;

#[derive(Debug, Clone, Default, Validate)]
pub struct SubmissionForm {
    #[validate(length(min = 1, message = "Organizer is required"))]
    pub organizer: String,
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    #[validate(length(min = 1, message = "Category is required"))]
    pub category: String,
    #[validate(length(min = 1, message = "At least one tag is required"))]
    pub tags: Vec<String>,
    #[validate(length(min = 1, message = "Venue is required"))]
    pub venue: String,
    #[validate(length(min = 1, message = "Start date is required"))]
    pub start_date: String,
    #[validate(length(min = 1, message = "End date is required"))]
    pub end_date: String,
    #[validate(url(message = "Ticket link must be a valid URL"))]
    pub ticket_link: Option<String>,
}

impl SubmissionForm {
    /// Заполняет поле формы по имени из multipart. Значения обрезаются,
    /// `tags` может повторяться.
    pub fn set_field(&mut self, name: &str, value: String) {
        let value = value.trim().to_string();
        match name {
            "organizer" => self.organizer = value,
            "title" => self.title = value,
            "description" => self.description = value,
            "category" => self.category = value,
            "tags" | "tags[]" => {
                if !value.is_empty() {
                    self.tags.push(value);
                }
            }
            "venue" => self.venue = value,
            "startDate" => self.start_date = value,
            "endDate" => self.end_date = value,
            "ticketLink" => self.ticket_link = Some(value).filter(|v| !v.is_empty()),
            _ => {}
        }
    }

    /// Полная проверка до загрузки картинок и записи.
    fn into_new_event(self, actor: &Actor, approved: bool) -> AppResult<NewEvent> {
        self.validate()?;

        let category: Category = self.category.parse().map_err(AppError::Validation)?;

        let unknown: Vec<&str> = self
            .tags
            .iter()
            .map(String::as_str)
            .filter(|tag| !TAG_VOCABULARY.contains(tag))
            .collect();
        if !unknown.is_empty() {
            return Err(AppError::validation(format!(
                "Unknown tags: {}",
                unknown.join(", ")
            )));
        }

        let (start_date_time, end_date_time) = parse_schedule(&self.start_date, &self.end_date)?;

        Ok(NewEvent {
            creator_id: actor.user.id,
            creator_email: actor.user.email.clone(),
            admin_approved: approved,
            organizer: self.organizer,
            title: self.title,
            description: self.description,
            category,
            tags: self.tags,
            venue: self.venue,
            start_date_time,
            end_date_time,
            image_urls: Vec::new(),
            ticket_link: self.ticket_link.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Как публикуется событие.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionMode {
    /// Через заявку на одобрение.
    Request,
    /// Сразу одобрено (админ).
    Direct,
}

/// Загружает картинки параллельно, сохраняя порядок. Неудачные пропускаются.
async fn upload_images(state: &AppState, images: Vec<ImageUpload>) -> Vec<String> {
    let limit = state.config.images.max_per_event;
    if images.len() > limit {
        warn!("Ignoring {} image(s) over the limit of {}", images.len() - limit, limit);
    }

    let uploads = images.into_iter().take(limit).map(|image| async move {
        let safe_name = slugify_file_name(&image.file_name);
        match state.images.upload(image.bytes, &safe_name).await {
            Ok(url) => Some(url),
            Err(e) => {
                warn!("Failed to upload image '{}': {:?}", image.file_name, e);
                None
            }
        }
    });

    join_all(uploads).await.into_iter().flatten().collect()
}

pub async fn submit(
    state: &AppState,
    actor: &Actor,
    mode: SubmissionMode,
    form: SubmissionForm,
    images: Vec<ImageUpload>,
) -> AppResult<EventView> {
    let mut event = form.into_new_event(actor, mode == SubmissionMode::Direct)?;
    event.image_urls = upload_images(state, images).await;

    let row = match mode {
        SubmissionMode::Direct => {
            let row = state.events.insert(event).await?;
            state.cache.invalidate_search().await;
            info!("Event {} published directly by {}", row.id, actor.user.email);
            row
        }
        SubmissionMode::Request => {
            let requester = Requester {
                user_id: actor.user.id,
                email: actor.user.email.clone(),
            };
            let (row, request) = state.events.insert_with_request(event, &requester).await?;
            info!("Event {} awaiting approval (request {})", row.id, request.id);
            row
        }
    };

    Ok(EventView::from(row))
}
