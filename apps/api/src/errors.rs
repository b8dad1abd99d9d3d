use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Message returned for every failure whose detail must stay server-side.
pub const GENERIC_MESSAGE: &str = "An error occurred while processing your request";

/// Body of the last-resort response when a handler panics.
pub const UNEXPECTED_MESSAGE: &str = "An unexpected error occurred";

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// The `Display` text carries internal detail for logs; the response body never does.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("PDF text extraction failed: {0}")]
    Extraction(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Compilation failed: {0}")]
    Compilation(String),

    #[error("Rate limit exceeded")]
    RateLimited { retry_after_secs: u64 },

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Internal(e.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::TemplateNotFound(id) => {
                tracing::warn!("Unknown template requested: {id:?}");
                (
                    StatusCode::NOT_FOUND,
                    "TEMPLATE_NOT_FOUND",
                    "Template not found".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Extraction(detail) => {
                tracing::error!("PDF extraction error: {detail}");
                (
                    StatusCode::BAD_REQUEST,
                    "EXTRACTION_ERROR",
                    GENERIC_MESSAGE.to_string(),
                )
            }
            AppError::Generation(detail) => {
                tracing::error!("Generation error: {detail}");
                (
                    StatusCode::BAD_REQUEST,
                    "GENERATION_ERROR",
                    GENERIC_MESSAGE.to_string(),
                )
            }
            AppError::Compilation(detail) => {
                tracing::error!("Compilation error: {detail}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "COMPILATION_ERROR",
                    "PDF generation failed".to_string(),
                )
            }
            AppError::RateLimited { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                "Rate limit exceeded".to_string(),
            ),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::BAD_REQUEST,
                    "INTERNAL_ERROR",
                    GENERIC_MESSAGE.to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
            "code": code,
        }));

        let mut response = (status, body).into_response();
        if let AppError::RateLimited { retry_after_secs } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

/// Response for a handler that panicked. Used by `CatchPanicLayer`.
pub fn panic_response(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    tracing::error!("Handler panicked: {detail}");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": UNEXPECTED_MESSAGE })),
    )
        .into_response()
}
