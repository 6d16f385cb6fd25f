use thiserror::Error;
use uuid::Uuid;

/// Errors from repository operations (used by trait definitions in maoflow-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Failures that stop a chat turn before any event is streamed.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("conversation {0} not found")]
    ConversationNotFound(Uuid),

    #[error("invalid model configuration: {0}")]
    InvalidModel(String),

    #[error("query must not be empty")]
    EmptyQuery,

    #[error("temperature {0} is outside [0, 2]")]
    InvalidTemperature(f64),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Validation and storage errors from the CRUD services.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }

    #[test]
    fn test_chat_error_display() {
        let id = Uuid::nil();
        let err = ChatError::ConversationNotFound(id);
        assert!(err.to_string().contains(&id.to_string()));

        let err: ChatError = RepositoryError::Connection.into();
        assert_eq!(err.to_string(), "database connection error");
    }

    #[test]
    fn test_service_error_display() {
        let err = ServiceError::Validation("temperature out of range".into());
        assert_eq!(err.to_string(), "validation failed: temperature out of range");
        assert_eq!(ServiceError::NotFound("model").to_string(), "model not found");
    }
}
