pub mod admin;
pub mod creator;
pub mod events;
pub mod webhooks;

use axum::{
    extract::{multipart::MultipartRejection, rejection::JsonRejection, Multipart},
    Json, Router,
};
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::services::submission::{ImageUpload, SubmissionForm};

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(events::routes())
        .merge(admin::routes())
        .merge(creator::routes())
        .merge(webhooks::routes())
}

/// Ошибка разбора JSON-тела - это 400 в общем формате ответа.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppError::validation(rejection.body_text()))
}

fn malformed_form(e: impl std::fmt::Display) -> AppError {
    AppError::validation(format!("Malformed form data: {e}"))
}

/// Читает multipart-форму события: текстовые поля и файлы `image1..imageN`.
pub(crate) async fn read_submission(
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<(SubmissionForm, Vec<ImageUpload>)> {
    let mut multipart = multipart.map_err(|rejection| AppError::validation(rejection.body_text()))?;
    let mut form = SubmissionForm::default();
    let mut images = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(malformed_form)? {
        let name = field.name().unwrap_or("").to_string();
        let file_name = field.file_name().map(str::to_string);

        match file_name {
            Some(file_name) if name.starts_with("image") => {
                let bytes = field.bytes().await.map_err(malformed_form)?;
                // пустой input type=file приходит как файл нулевой длины
                if !bytes.is_empty() {
                    images.push(ImageUpload {
                        file_name,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            _ => {
                let value = field.text().await.map_err(malformed_form)?;
                form.set_field(&name, value);
            }
        }
    }

    Ok((form, images))
}
