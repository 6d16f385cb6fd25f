use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::info;
use uuid::Uuid;

use maoflow_types::error::ServiceError;
use maoflow_types::user::{NewUser, User};

use crate::repository::Page;
use crate::repository::user::UserRepository;

/// Settings key whose object value is merged key by key instead of replaced.
const CUSTOM_SETTINGS: &str = "custom_settings";

pub struct UserService<U: UserRepository> {
    repo: Arc<U>,
}

impl<U: UserRepository> UserService<U> {
    pub fn new(repo: Arc<U>) -> Self {
        Self { repo }
    }

    /// Create a user. Username and email are trimmed; email must contain `@`.
    pub async fn create_user(&self, new: NewUser) -> Result<User, ServiceError> {
        let username = new.username.trim().to_string();
        let email = new.email.trim().to_string();
        if username.is_empty() {
            return Err(ServiceError::Validation("username must not be empty".into()));
        }
        if !email.contains('@') {
            return Err(ServiceError::Validation(format!("invalid email '{email}'")));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::now_v7(),
            username,
            email,
            full_name: new.full_name,
            settings: new.settings.unwrap_or_else(|| serde_json::json!({})),
            created_at: now,
            updated_at: now,
        };
        let user = self.repo.create(&user).await?;
        info!(user_id = %user.id, username = %user.username, "User created");
        Ok(user)
    }

    pub async fn get_user(&self, id: &Uuid) -> Result<User, ServiceError> {
        self.repo.get(id).await?.ok_or(ServiceError::NotFound("user"))
    }

    pub async fn list_users(&self, page: Page) -> Result<Vec<User>, ServiceError> {
        Ok(self.repo.list(&page).await?)
    }

    pub async fn get_settings(&self, id: &Uuid) -> Result<Value, ServiceError> {
        Ok(self.get_user(id).await?.settings)
    }

    /// Merge `patch` into the stored settings and return the result.
    ///
    /// Top-level keys replace stored ones, except `custom_settings`, whose
    /// entries are merged into the stored object.
    pub async fn update_settings(&self, id: &Uuid, patch: Value) -> Result<Value, ServiceError> {
        let Value::Object(patch) = patch else {
            return Err(ServiceError::Validation(
                "settings must be a JSON object".into(),
            ));
        };

        let mut user = self.get_user(id).await?;
        user.settings = merge_settings(&user.settings, patch);
        user.updated_at = Utc::now();
        let user = self.repo.update_settings(&user).await?;
        info!(user_id = %user.id, "User settings updated");
        Ok(user.settings)
    }
}

fn merge_settings(current: &Value, patch: Map<String, Value>) -> Value {
    let mut merged = current.as_object().cloned().unwrap_or_default();
    for (key, value) in patch {
        if key == CUSTOM_SETTINGS {
            if let (Some(Value::Object(existing)), Value::Object(incoming)) =
                (merged.get_mut(&key), &value)
            {
                existing.extend(incoming.clone());
                continue;
            }
        }
        merged.insert(key, value);
    }
    Value::Object(merged)
}
