//! SQLite model configuration repository.
//!
//! API keys are stored as given; they are only ever read back by the chat
//! pipeline when it builds an upstream client.

use maoflow_core::repository::model::{ModelFilter, ModelRepository};
use maoflow_types::error::RepositoryError;
use maoflow_types::model::{LlmModel, ProviderType};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, parse_uuid};

pub struct SqliteModelRepository {
    pool: DatabasePool,
}

impl SqliteModelRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to a domain model.
struct ModelRow {
    id: String,
    name: String,
    description: Option<String>,
    provider: String,
    model_name: String,
    api_key: String,
    base_url: Option<String>,
    default_temperature: f64,
    default_max_tokens: Option<i64>,
    default_system_prompt: Option<String>,
    is_active: bool,
    priority: i32,
    total_tokens_used: i64,
    daily_token_limit: Option<i64>,
    created_at: String,
    updated_at: String,
}

impl ModelRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            provider: row.try_get("provider")?,
            model_name: row.try_get("model_name")?,
            api_key: row.try_get("api_key")?,
            base_url: row.try_get("base_url")?,
            default_temperature: row.try_get("default_temperature")?,
            default_max_tokens: row.try_get("default_max_tokens")?,
            default_system_prompt: row.try_get("default_system_prompt")?,
            is_active: row.try_get("is_active")?,
            priority: row.try_get("priority")?,
            total_tokens_used: row.try_get("total_tokens_used")?,
            daily_token_limit: row.try_get("daily_token_limit")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_model(self) -> Result<LlmModel, RepositoryError> {
        let provider: ProviderType = self
            .provider
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(LlmModel {
            id: parse_uuid(&self.id, "model")?,
            name: self.name,
            description: self.description,
            provider,
            model_name: self.model_name,
            api_key: self.api_key,
            base_url: self.base_url,
            default_temperature: self.default_temperature,
            default_max_tokens: self.default_max_tokens.map(|v| v.max(0) as u32),
            default_system_prompt: self.default_system_prompt,
            is_active: self.is_active,
            priority: self.priority,
            total_tokens_used: self.total_tokens_used.max(0) as u64,
            daily_token_limit: self.daily_token_limit.map(|v| v.max(0) as u64),
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

fn map_row(row: &sqlx::sqlite::SqliteRow) -> Result<LlmModel, RepositoryError> {
    ModelRow::from_row(row)
        .map_err(|e| RepositoryError::Query(e.to_string()))?
        .into_model()
}

impl ModelRepository for SqliteModelRepository {
    async fn create(&self, model: &LlmModel) -> Result<LlmModel, RepositoryError> {
        sqlx::query(
            "INSERT INTO llm_models (id, name, description, provider, model_name, api_key, base_url, default_temperature, default_max_tokens, default_system_prompt, is_active, priority, total_tokens_used, daily_token_limit, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(model.id.to_string())
        .bind(&model.name)
        .bind(&model.description)
        .bind(model.provider.to_string())
        .bind(&model.model_name)
        .bind(&model.api_key)
        .bind(&model.base_url)
        .bind(model.default_temperature)
        .bind(model.default_max_tokens.map(i64::from))
        .bind(&model.default_system_prompt)
        .bind(model.is_active)
        .bind(model.priority)
        .bind(model.total_tokens_used as i64)
        .bind(model.daily_token_limit.map(|v| v as i64))
        .bind(format_datetime(&model.created_at))
        .bind(format_datetime(&model.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(model.clone())
    }

    async fn get(&self, id: &Uuid) -> Result<Option<LlmModel>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM llm_models WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.as_ref().map(map_row).transpose()
    }

    async fn list(&self, filter: &ModelFilter) -> Result<Vec<LlmModel>, RepositoryError> {
        let rows = match filter.is_active {
            Some(active) => {
                sqlx::query(
                    "SELECT * FROM llm_models WHERE is_active = ? ORDER BY priority ASC, name ASC",
                )
                .bind(active)
                .fetch_all(&self.pool.reader)
                .await
            }
            None => {
                sqlx::query("SELECT * FROM llm_models ORDER BY priority ASC, name ASC")
                    .fetch_all(&self.pool.reader)
                    .await
            }
        }
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter().map(map_row).collect()
    }

    /// Writes every configurable field. `total_tokens_used` is left alone:
    /// it only moves through turn finalization.
    async fn update(&self, model: &LlmModel) -> Result<LlmModel, RepositoryError> {
        let result = sqlx::query(
            "UPDATE llm_models SET name = ?, description = ?, provider = ?, model_name = ?, api_key = ?, base_url = ?, default_temperature = ?, default_max_tokens = ?, default_system_prompt = ?, is_active = ?, priority = ?, daily_token_limit = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&model.name)
        .bind(&model.description)
        .bind(model.provider.to_string())
        .bind(&model.model_name)
        .bind(&model.api_key)
        .bind(&model.base_url)
        .bind(model.default_temperature)
        .bind(model.default_max_tokens.map(i64::from))
        .bind(&model.default_system_prompt)
        .bind(model.is_active)
        .bind(model.priority)
        .bind(model.daily_token_limit.map(|v| v as i64))
        .bind(format_datetime(&model.updated_at))
        .bind(model.id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        self.get(&model.id).await?.ok_or(RepositoryError::NotFound)
    }

    async fn delete(&self, id: &Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM llm_models WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
