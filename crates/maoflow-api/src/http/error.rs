//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use maoflow_types::error::{ChatError, RepositoryError, ServiceError};

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Pre-stream chat failures.
    Chat(ChatError),
    /// CRUD service failures.
    Service(ServiceError),
    /// Malformed request parameters.
    Validation(String),
}

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        AppError::Chat(e)
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        AppError::Service(e)
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Chat(e @ ChatError::ConversationNotFound(_)) => {
                (StatusCode::NOT_FOUND, "CONVERSATION_NOT_FOUND", e.to_string())
            }
            AppError::Chat(e @ ChatError::InvalidModel(_)) => {
                (StatusCode::BAD_REQUEST, "INVALID_MODEL", e.to_string())
            }
            AppError::Chat(e @ (ChatError::EmptyQuery | ChatError::InvalidTemperature(_))) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
            }
            AppError::Chat(ChatError::Repository(e)) => repository_parts(e),
            AppError::Service(e @ ServiceError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string())
            }
            AppError::Service(ServiceError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Service(ServiceError::Repository(e)) => repository_parts(e),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
        }
    }
}

fn repository_parts(e: &RepositoryError) -> (StatusCode, &'static str, String) {
    match e {
        RepositoryError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string()),
        RepositoryError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
        RepositoryError::Connection | RepositoryError::Query(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR", e.to_string())
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            tracing::error!(code, %message, "Request failed");
        }

        let body = json!({
            "data": null,
            "meta": {
                "request_id": uuid::Uuid::now_v7().to_string(),
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "response_time_ms": 0
            },
            "errors": [{
                "code": code,
                "message": message,
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_chat_errors_map_to_pre_stream_statuses() {
        let cases = [
            (ChatError::ConversationNotFound(Uuid::nil()), StatusCode::NOT_FOUND),
            (ChatError::InvalidModel("inactive".into()), StatusCode::BAD_REQUEST),
            (ChatError::EmptyQuery, StatusCode::BAD_REQUEST),
            (ChatError::InvalidTemperature(3.0), StatusCode::BAD_REQUEST),
            (
                ChatError::Repository(RepositoryError::Connection),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(AppError::from(err).into_response().status(), expected);
        }
    }

    #[test]
    fn test_service_errors_map_to_statuses() {
        let cases = [
            (ServiceError::NotFound("user"), StatusCode::NOT_FOUND),
            (ServiceError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (
                ServiceError::Repository(RepositoryError::Conflict("username taken".into())),
                StatusCode::CONFLICT,
            ),
            (
                ServiceError::Repository(RepositoryError::Query("boom".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(AppError::from(err).into_response().status(), expected);
        }
    }

    #[test]
    fn test_parts_carry_code_and_message() {
        let (_, code, message) = AppError::Service(ServiceError::NotFound("model")).parts();
        assert_eq!(code, "NOT_FOUND");
        assert_eq!(message, "model not found");
    }
}
