//! HTTP response types and error mapping

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::avatar::CacheStats;
use crate::errors::{AppError, ResizeError};

/// Standard JSON response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn error(message: String) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub font: String,
    pub cache: CacheStats,
}

/// Body of `POST /cache/flush`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlushResponse {
    pub removed: usize,
}

pub fn ok<T: Serialize>(data: T) -> impl IntoResponse {
    (StatusCode::OK, Json(ApiResponse::success(data)))
}

/// Status code for an application error
pub fn status_for(error: &AppError) -> StatusCode {
    match error {
        AppError::Validation { .. } => StatusCode::BAD_REQUEST,
        AppError::Resize(ResizeError::UnsupportedFormat { .. }) => {
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        }
        AppError::Resize(_) => StatusCode::BAD_REQUEST,
        AppError::Font(_)
        | AppError::Render(_)
        | AppError::Io(_)
        | AppError::Configuration { .. }
        | AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Convert an AppError to a JSON error response
pub fn handle_error(error: AppError) -> Response {
    let status = status_for(&error);
    if status.is_server_error() {
        tracing::error!("Request failed: {}", error);
    } else {
        tracing::debug!("Request rejected: {}", error);
    }

    let message = match &error {
        AppError::Validation { message } => message.clone(),
        other => other.to_string(),
    };

    (status, Json(ApiResponse::<()>::error(message))).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        handle_error(self)
    }
}
