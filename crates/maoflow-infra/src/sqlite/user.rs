//! SQLite user repository implementation.

use maoflow_core::repository::Page;
use maoflow_core::repository::user::UserRepository;
use maoflow_types::error::RepositoryError;
use maoflow_types::user::User;
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, map_write_error, parse_datetime, parse_json, parse_uuid};

pub struct SqliteUserRepository {
    pool: DatabasePool,
}

impl SqliteUserRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User, RepositoryError> {
    let get = |e: sqlx::Error| RepositoryError::Query(e.to_string());
    let id: String = row.try_get("id").map_err(get)?;
    let settings: String = row.try_get("settings").map_err(get)?;
    let created_at: String = row.try_get("created_at").map_err(get)?;
    let updated_at: String = row.try_get("updated_at").map_err(get)?;

    Ok(User {
        id: parse_uuid(&id, "user")?,
        username: row.try_get("username").map_err(get)?,
        email: row.try_get("email").map_err(get)?,
        full_name: row.try_get("full_name").map_err(get)?,
        settings: parse_json(&settings)?,
        created_at: parse_datetime(&created_at)?,
        updated_at: parse_datetime(&updated_at)?,
    })
}

impl UserRepository for SqliteUserRepository {
    async fn create(&self, user: &User) -> Result<User, RepositoryError> {
        sqlx::query(
            "INSERT INTO users (id, username, email, full_name, settings, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(user.settings.to_string())
        .bind(format_datetime(&user.created_at))
        .bind(format_datetime(&user.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| {
            map_write_error(e, || {
                format!(
                    "username '{}' or email '{}' already exists",
                    user.username, user.email
                )
            })
        })?;

        Ok(user.clone())
    }

    async fn get(&self, id: &Uuid) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn list(&self, page: &Page) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM users ORDER BY created_at ASC LIMIT ? OFFSET ?")
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter().map(row_to_user).collect()
    }

    async fn update_settings(&self, user: &User) -> Result<User, RepositoryError> {
        let result = sqlx::query("UPDATE users SET settings = ?, updated_at = ? WHERE id = ?")
            .bind(user.settings.to_string())
            .bind(format_datetime(&user.updated_at))
            .bind(user.id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        self.get(&user.id).await?.ok_or(RepositoryError::NotFound)
    }
}
