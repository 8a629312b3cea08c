use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::domain::DomainError;

/// Error returned by the REST handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("missing or empty X-User-ID header")]
    Unauthorized,

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Domain(e) => match e {
                DomainError::BadRequest(_) => StatusCode::BAD_REQUEST,
                DomainError::Forbidden => StatusCode::FORBIDDEN,
                DomainError::NotFound => StatusCode::NOT_FOUND,
                DomainError::Cancelled | DomainError::Unavailable(_) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                DomainError::Unsupported(_) | DomainError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match &self {
            Self::Domain(DomainError::Unsupported(msg) | DomainError::Internal(msg)) => {
                tracing::error!(error = %msg, "request failed");
                "internal error".to_owned()
            }
            Self::Domain(DomainError::Unavailable(msg)) => {
                tracing::warn!(error = %msg, "authorization unavailable");
                "service unavailable".to_owned()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": detail }))).into_response()
    }
}
