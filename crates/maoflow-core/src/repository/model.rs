//! Model repository trait definition.

use maoflow_types::error::RepositoryError;
use maoflow_types::model::LlmModel;
use uuid::Uuid;

/// Filter criteria for listing models.
#[derive(Debug, Clone, Default)]
pub struct ModelFilter {
    pub is_active: Option<bool>,
}

/// Repository trait for LLM model configurations.
///
/// Implementations live in maoflow-infra (e.g., `SqliteModelRepository`).
pub trait ModelRepository: Send + Sync {
    fn create(
        &self,
        model: &LlmModel,
    ) -> impl std::future::Future<Output = Result<LlmModel, RepositoryError>> + Send;

    fn get(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<LlmModel>, RepositoryError>> + Send;

    /// List models ordered by priority ASC, then name.
    fn list(
        &self,
        filter: &ModelFilter,
    ) -> impl std::future::Future<Output = Result<Vec<LlmModel>, RepositoryError>> + Send;

    fn update(
        &self,
        model: &LlmModel,
    ) -> impl std::future::Future<Output = Result<LlmModel, RepositoryError>> + Send;

    /// Permanently delete a model. Returns `NotFound` if it did not exist.
    fn delete(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
