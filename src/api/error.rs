//! API error responses

use crate::ai::AiError;
use crate::storage::StoreError;
use axum::extract::rejection::QueryRejection;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Errors returned by handlers, rendered as `{"error": "..."}`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{message}")]
    RateLimited { message: String, wait_secs: u64 },
    #[error("{0}")]
    Unavailable(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        tracing::error!(error = %e, "Storage error");
        ApiError::Internal("Database error".to_string())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<AiError> for ApiError {
    fn from(e: AiError) -> Self {
        match e {
            AiError::NotConfigured(_) => ApiError::Unavailable(e.to_string()),
            AiError::InsufficientData { .. } => ApiError::NotFound(e.to_string()),
            AiError::RateLimited { wait_secs, .. } => ApiError::RateLimited {
                message: e.to_string(),
                wait_secs,
            },
            AiError::Store(inner) => inner.into(),
            AiError::Http(_) | AiError::Status { .. } | AiError::Malformed(_) => {
                ApiError::Unavailable(e.to_string())
            }
            AiError::Usage(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = json!({ "error": self.to_string() });
        let retry_after = match &self {
            ApiError::RateLimited { wait_secs, .. } => {
                body["retry_after_secs"] = json!(wait_secs);
                HeaderValue::from_str(&wait_secs.to_string()).ok()
            }
            _ => None,
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(value) = retry_after {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::LimitReason;

    #[test]
    fn test_rate_limit_mapping() {
        let err: ApiError = AiError::RateLimited {
            reason: LimitReason::Cooldown,
            wait_secs: 42,
        }
        .into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
    }

    #[test]
    fn test_not_configured_is_unavailable() {
        let err: ApiError = AiError::NotConfigured("OPENAI_API_KEY".to_string()).into();
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_bad_request_is_json() {
        let response = ApiError::BadRequest("invalid limit".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("application/json"));
    }

    #[test]
    fn test_not_found_status() {
        let response = ApiError::NotFound("No data found".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
