//! Model management service.
//!
//! Validates model configurations before they reach storage. The chat
//! pipeline reads these rows; nothing here talks to the upstream endpoint.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use maoflow_types::error::{RepositoryError, ServiceError};
use maoflow_types::model::{LlmModel, ModelPatch, NewModel};

use crate::repository::model::{ModelFilter, ModelRepository};

pub struct ModelService<M: ModelRepository> {
    repo: Arc<M>,
}

impl<M: ModelRepository> ModelService<M> {
    pub fn new(repo: Arc<M>) -> Self {
        Self { repo }
    }

    pub async fn create_model(&self, new: NewModel) -> Result<LlmModel, ServiceError> {
        let now = Utc::now();
        let model = LlmModel {
            id: Uuid::now_v7(),
            name: new.name.trim().to_string(),
            description: new.description,
            provider: new.provider,
            model_name: new.model_name.trim().to_string(),
            api_key: new.api_key,
            base_url: new.base_url,
            default_temperature: new.default_temperature,
            default_max_tokens: new.default_max_tokens,
            default_system_prompt: new.default_system_prompt,
            is_active: new.is_active,
            priority: new.priority,
            total_tokens_used: 0,
            daily_token_limit: new.daily_token_limit,
            created_at: now,
            updated_at: now,
        };
        validate(&model)?;

        let model = self.repo.create(&model).await?;
        info!(model_id = %model.id, model_name = %model.model_name, "Model created");
        Ok(model)
    }

    pub async fn get_model(&self, id: &Uuid) -> Result<LlmModel, ServiceError> {
        self.repo
            .get(id)
            .await?
            .ok_or(ServiceError::NotFound("model"))
    }

    pub async fn list_models(&self, is_active: Option<bool>) -> Result<Vec<LlmModel>, ServiceError> {
        Ok(self.repo.list(&ModelFilter { is_active }).await?)
    }

    pub async fn update_model(&self, id: &Uuid, patch: ModelPatch) -> Result<LlmModel, ServiceError> {
        let mut model = self.get_model(id).await?;
        patch.apply(&mut model);
        model.name = model.name.trim().to_string();
        model.model_name = model.model_name.trim().to_string();
        model.updated_at = Utc::now();
        validate(&model)?;

        Ok(self.repo.update(&model).await?)
    }

    pub async fn delete_model(&self, id: &Uuid) -> Result<(), ServiceError> {
        self.repo.delete(id).await.map_err(|e| match e {
            RepositoryError::NotFound => ServiceError::NotFound("model"),
            other => other.into(),
        })?;
        info!(model_id = %id, "Model deleted");
        Ok(())
    }
}

fn validate(model: &LlmModel) -> Result<(), ServiceError> {
    if model.name.is_empty() {
        return Err(ServiceError::Validation("name must not be empty".into()));
    }
    if model.model_name.is_empty() {
        return Err(ServiceError::Validation("model_name must not be empty".into()));
    }
    if !(0.0..=2.0).contains(&model.default_temperature) {
        return Err(ServiceError::Validation(format!(
            "default_temperature {} is outside [0, 2]",
            model.default_temperature
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemoryStore;

    fn new_model(model_name: &str, temperature: f64) -> NewModel {
        serde_json::from_value(serde_json::json!({
            "name": "Primary",
            "model_name": model_name,
            "api_key": "sk-test",
            "default_temperature": temperature,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let svc = ModelService::new(Arc::new(MemoryStore::new()));
        let created = svc.create_model(new_model(" gpt-4o ", 0.5)).await.unwrap();
        assert_eq!(created.model_name, "gpt-4o");
        assert_eq!(created.total_tokens_used, 0);

        let fetched = svc.get_model(&created.id).await.unwrap();
        assert_eq!(fetched.id, created.id);
    }

    #[tokio::test]
    async fn test_validation() {
        let svc = ModelService::new(Arc::new(MemoryStore::new()));
        assert!(matches!(
            svc.create_model(new_model("  ", 0.5)).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            svc.create_model(new_model("gpt-4o", 2.5)).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_update_revalidates() {
        let svc = ModelService::new(Arc::new(MemoryStore::new()));
        let created = svc.create_model(new_model("gpt-4o", 0.5)).await.unwrap();

        let patch = ModelPatch {
            default_temperature: Some(-1.0),
            ..Default::default()
        };
        assert!(matches!(
            svc.update_model(&created.id, patch).await,
            Err(ServiceError::Validation(_))
        ));

        let patch = ModelPatch {
            is_active: Some(false),
            ..Default::default()
        };
        let updated = svc.update_model(&created.id, patch).await.unwrap();
        assert!(!updated.is_active);
        assert_eq!(svc.list_models(Some(true)).await.unwrap().len(), 0);
        assert_eq!(svc.list_models(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let svc = ModelService::new(Arc::new(MemoryStore::new()));
        assert!(matches!(
            svc.delete_model(&Uuid::now_v7()).await,
            Err(ServiceError::NotFound("model"))
        ));
    }
}
