//! Единый тип ошибок приложения и его отображение в HTTP-ответ.

use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

// Выставляется один раз при старте из `AppConfig::debug_errors`.
static DEBUG_ERRORS: AtomicBool = AtomicBool::new(false);

pub fn set_debug_errors(enabled: bool) {
    DEBUG_ERRORS.store(enabled, Ordering::Relaxed);
}

fn debug_errors() -> bool {
    DEBUG_ERRORS.load(Ordering::Relaxed)
}

#[derive(Debug, Error)]
pub enum AppError {
    /// Ошибка входных данных, исправляется пользователем.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// Попытка повторно перевести уже обработанную заявку.
    #[error("Event request has already been processed")]
    AlreadyProcessed,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Сбой внешнего сервиса (идентификация, хранилище картинок).
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Внутренняя ошибка с публичным сообщением и скрытыми деталями.
    #[error("{public}: {detail}")]
    Internal { public: String, detail: String },
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    pub fn internal(public: impl Into<String>, detail: impl ToString) -> Self {
        AppError::Internal {
            public: public.into(),
            detail: detail.to_string(),
        }
    }

    /// Переупаковывает ошибку хранилища в "query failed" для публичных списков.
    /// Пользовательские ошибки (400/404) пропускаются как есть.
    pub fn into_query_failed(self) -> Self {
        match self {
            AppError::Database(e) => AppError::internal("Failed to filter events", e),
            AppError::Internal { detail, .. } => AppError::Internal {
                public: "Failed to filter events".to_string(),
                detail,
            },
            other => other,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::AlreadyProcessed => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Database(_) | AppError::Upstream(_) | AppError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::AlreadyProcessed => "CONFLICT",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::Database(_) => "DATABASE",
            AppError::Upstream(_) => "UPSTREAM",
            AppError::Internal { .. } => "INTERNAL",
        }
    }

    fn public_message(&self) -> String {
        match self {
            AppError::Database(_) | AppError::Upstream(_) => "Internal server error".to_string(),
            AppError::Internal { public, .. } => public.clone(),
            other => other.to_string(),
        }
    }

    fn detail(&self) -> Option<String> {
        match self {
            AppError::Database(e) => Some(e.to_string()),
            AppError::Upstream(detail) | AppError::Internal { detail, .. } => Some(detail.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AppError {
    pub fn body(&self, expose_details: bool) -> ErrorBody {
        let message = self.detail().map(|detail| {
            if expose_details {
                detail
            } else {
                "Internal server error".to_string()
            }
        });
        ErrorBody {
            success: false,
            error: self.public_message(),
            code: self.code(),
            message,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(self.body(debug_errors()))).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, list)| {
                list.iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("{field} is invalid"))
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        messages.sort();
        AppError::Validation(messages.join("; "))
    }
}
