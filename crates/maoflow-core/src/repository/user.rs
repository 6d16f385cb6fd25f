use maoflow_types::error::RepositoryError;
use maoflow_types::user::User;
use uuid::Uuid;

use super::Page;

/// Repository trait for user accounts.
pub trait UserRepository: Send + Sync {
    /// Create a user. Returns `Conflict` if the username or email is taken.
    fn create(
        &self,
        user: &User,
    ) -> impl std::future::Future<Output = Result<User, RepositoryError>> + Send;

    fn get(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<User>, RepositoryError>> + Send;

    /// List users ordered by created_at ASC.
    fn list(
        &self,
        page: &Page,
    ) -> impl std::future::Future<Output = Result<Vec<User>, RepositoryError>> + Send;

    /// Persist `settings` and `updated_at`. Returns `NotFound` for an
    /// unknown user.
    fn update_settings(
        &self,
        user: &User,
    ) -> impl std::future::Future<Output = Result<User, RepositoryError>> + Send;
}
