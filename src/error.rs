use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

/// JSON error body shared by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication required")]
    AuthRequired,
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),
    #[error("{context}: {detail}")]
    Upstream { context: String, detail: String },
}

impl ApiError {
    /// Wraps a store or filesystem failure, keeping the full cause chain.
    pub fn upstream(context: impl Into<String>, err: anyhow::Error) -> Self {
        ApiError::Upstream {
            context: context.into(),
            detail: format!("{err:#}"),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::AuthRequired | ApiError::InvalidCredentials(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::AuthRequired => "AUTH_REQUIRED",
            ApiError::InvalidCredentials(_) => "INVALID_CREDENTIALS",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::Upstream { .. } => "INTERNAL",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = Some(self.code().to_string());

        let body = match self {
            ApiError::AuthRequired => ErrorBody {
                message: "Authentication required".to_string(),
                code,
                details: None,
                error: None,
            },
            ApiError::Upstream { context, detail } => {
                tracing::error!(%context, %detail, "upstream failure");
                ErrorBody {
                    message: context,
                    code,
                    details: Some(detail),
                    error: Some("Internal server error".to_string()),
                }
            }
            ApiError::InvalidCredentials(message)
            | ApiError::NotFound(message)
            | ApiError::BadRequest(message)
            | ApiError::Conflict(message)
            | ApiError::PayloadTooLarge(message) => ErrorBody {
                message,
                code,
                details: None,
                error: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_keeps_cause_chain() {
        let err = anyhow::anyhow!("disk full").context("Failed to write documents file");
        let api = ApiError::upstream("Failed to save document", err);

        assert_eq!(api.status(), StatusCode::INTERNAL_SERVER_ERROR);
        match api {
            ApiError::Upstream { detail, .. } => {
                assert!(detail.contains("Failed to write documents file"));
                assert!(detail.contains("disk full"));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn status_follows_category() {
        assert_eq!(ApiError::AuthRequired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::AuthRequired.code(), "AUTH_REQUIRED");
    }
}
