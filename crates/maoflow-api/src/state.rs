//! Application state wiring all services together.
//!
//! Services are generic over repository and provider traits; AppState pins
//! them to the SQLite repositories and the HTTP provider factory.

use std::sync::Arc;
use std::time::Duration;

use maoflow_core::chat::service::{ChatService, ChatSettings};
use maoflow_core::service::conversation::ConversationService;
use maoflow_core::service::model::ModelService;
use maoflow_core::service::user::UserService;
use maoflow_infra::llm::HttpProviderFactory;
use maoflow_infra::sqlite::conversation::SqliteConversationRepository;
use maoflow_infra::sqlite::model::SqliteModelRepository;
use maoflow_infra::sqlite::pool::DatabasePool;
use maoflow_infra::sqlite::user::SqliteUserRepository;
use maoflow_types::config::GlobalConfig;

pub type ConcreteChatService =
    ChatService<SqliteConversationRepository, SqliteModelRepository, HttpProviderFactory>;

pub type ConcreteConversationService = ConversationService<
    SqliteConversationRepository,
    SqliteModelRepository,
    SqliteUserRepository,
>;

pub type ConcreteModelService = ModelService<SqliteModelRepository>;

pub type ConcreteUserService = UserService<SqliteUserRepository>;

/// Shared state handed to every REST handler.
#[derive(Clone)]
pub struct AppState {
    pub chat_service: Arc<ConcreteChatService>,
    pub conversation_service: Arc<ConcreteConversationService>,
    pub model_service: Arc<ConcreteModelService>,
    pub user_service: Arc<ConcreteUserService>,
    pub config: Arc<GlobalConfig>,
}

impl AppState {
    /// Wire services over an already-migrated pool.
    pub fn new(db_pool: DatabasePool, config: GlobalConfig) -> anyhow::Result<Self> {
        let conversations = Arc::new(SqliteConversationRepository::new(db_pool.clone()));
        let models = Arc::new(SqliteModelRepository::new(db_pool.clone()));
        let users = Arc::new(SqliteUserRepository::new(db_pool));

        let providers = HttpProviderFactory::new(Duration::from_secs(
            config.upstream.connect_timeout_secs,
        ))?;

        let chat_service = ChatService::new(
            Arc::clone(&conversations),
            Arc::clone(&models),
            providers,
            ChatSettings::from_config(&config),
        );
        let conversation_service = ConversationService::new(
            Arc::clone(&conversations),
            Arc::clone(&models),
            Arc::clone(&users),
        );

        Ok(Self {
            chat_service: Arc::new(chat_service),
            conversation_service: Arc::new(conversation_service),
            model_service: Arc::new(ModelService::new(models)),
            user_service: Arc::new(UserService::new(users)),
            config: Arc::new(config),
        })
    }
}
