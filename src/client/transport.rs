use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio::time::Duration;

use crate::listing::ListingPage;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Ответ сервера с `success: false` или не-2xx статусом.
    #[error("{0}")]
    Server(String),
}

/// Способ получить страницу списка по готовой query-строке.
#[async_trait]
pub trait EventsTransport: Send + Sync + 'static {
    async fn fetch(&self, query: &str) -> Result<ListingPage, ClientError>;
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    data: Option<ListingPage>,
    error: Option<String>,
    message: Option<String>,
}

pub struct HttpTransport {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(15))
                .gzip(true)
                .build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl EventsTransport for HttpTransport {
    async fn fetch(&self, query: &str) -> Result<ListingPage, ClientError> {
        let response = self
            .http_client
            .get(format!("{}/api/events?{}", self.base_url, query))
            .send()
            .await?;
        let status = response.status();
        let envelope: Option<Envelope> = response.json().await.ok();

        match envelope {
            Some(Envelope {
                success: true,
                data: Some(page),
                ..
            }) if status.is_success() => Ok(page),
            Some(envelope) => Err(ClientError::Server(
                envelope
                    .message
                    .or(envelope.error)
                    .unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
            )),
            None => Err(ClientError::Server(format!("HTTP {}", status.as_u16()))),
        }
    }
}
