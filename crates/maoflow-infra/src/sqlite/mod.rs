//! SQLite storage layer.
//!
//! Repository implementations backed by SQLite with WAL mode and split
//! read/write connection pools.

pub mod conversation;
pub mod model;
pub mod pool;
pub mod user;

use chrono::{DateTime, Utc};
use maoflow_types::error::RepositoryError;
use uuid::Uuid;

pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

pub(crate) fn parse_uuid(s: &str, what: &str) -> Result<Uuid, RepositoryError> {
    s.parse()
        .map_err(|e| RepositoryError::Query(format!("invalid {what} id: {e}")))
}

pub(crate) fn parse_json(s: &str) -> Result<serde_json::Value, RepositoryError> {
    serde_json::from_str(s).map_err(|e| RepositoryError::Query(format!("invalid JSON: {e}")))
}

/// Map a UNIQUE violation to `Conflict`, anything else to `Query`.
pub(crate) fn map_write_error(e: sqlx::Error, conflict: impl FnOnce() -> String) -> RepositoryError {
    match e {
        sqlx::Error::Database(ref db_err) if db_err.message().contains("UNIQUE") => {
            RepositoryError::Conflict(conflict())
        }
        other => RepositoryError::Query(other.to_string()),
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use chrono::Utc;
    use maoflow_types::model::{LlmModel, ProviderType};
    use maoflow_types::user::User;
    use uuid::Uuid;

    use super::pool::{DatabasePool, database_url_for};

    pub async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let url = database_url_for(dir.path());
        // Leak tempdir so it lives for the test
        std::mem::forget(dir);
        DatabasePool::new(&url).await.unwrap()
    }

    pub fn make_user(username: &str) -> User {
        let now = Utc::now();
        User {
            id: Uuid::now_v7(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            full_name: None,
            settings: serde_json::json!({}),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn make_model(name: &str, priority: i32) -> LlmModel {
        let now = Utc::now();
        LlmModel {
            id: Uuid::now_v7(),
            name: name.to_string(),
            description: None,
            provider: ProviderType::OpenaiCompatible,
            model_name: "gpt-4o-mini".to_string(),
            api_key: "sk-test".to_string(),
            base_url: Some("http://localhost:9999/v1".to_string()),
            default_temperature: 0.7,
            default_max_tokens: Some(1024),
            default_system_prompt: None,
            is_active: true,
            priority,
            total_tokens_used: 0,
            daily_token_limit: None,
            created_at: now,
            updated_at: now,
        }
    }
}
