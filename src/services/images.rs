//! Загрузка картинок событий во внешнее объектное хранилище.

use async_trait::async_trait;
use axum::http::header;
use base64::{engine::general_purpose, Engine as _};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tokio::time::Duration;

use crate::config::ImageConfig;
use crate::error::{AppError, AppResult};

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Загружает файл и возвращает его публичный URL.
    async fn upload(&self, bytes: Vec<u8>, file_name: &str) -> AppResult<String>;
}

/// Имя файла для хранилища: пробелы в `-`, только `[a-zA-Z0-9.-]`, нижний регистр.
pub fn slugify_file_name(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut in_space = false;
    for c in name.chars() {
        if c.is_whitespace() {
            if !in_space {
                slug.push('-');
            }
            in_space = true;
            continue;
        }
        in_space = false;
        if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
            slug.push(c.to_ascii_lowercase());
        }
    }
    slug
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
}

pub struct HttpImageStore {
    http_client: reqwest::Client,
    upload_url: String,
    private_key: String,
}

impl HttpImageStore {
    pub fn new(config: &ImageConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()?,
            upload_url: config.upload_url.clone(),
            private_key: config.private_key.clone(),
        })
    }

    // Basic auth: приватный ключ как логин, пустой пароль
    fn authorization(&self) -> String {
        let credentials = general_purpose::STANDARD.encode(format!("{}:", self.private_key));
        format!("Basic {credentials}")
    }
}

#[async_trait]
impl ImageStore for HttpImageStore {
    async fn upload(&self, bytes: Vec<u8>, file_name: &str) -> AppResult<String> {
        let form = Form::new()
            .part("file", Part::bytes(bytes).file_name(file_name.to_string()))
            .text("fileName", file_name.to_string());

        let response = self
            .http_client
            .post(&self.upload_url)
            .header(header::AUTHORIZATION, self.authorization())
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("image upload failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Upstream(format!(
                "image upload for '{file_name}' returned {status}"
            )));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("unreadable upload response: {e}")))?;
        Ok(body.url)
    }
}
