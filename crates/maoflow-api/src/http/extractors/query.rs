//! Query parameter extractors for list endpoints.

use serde::Deserialize;

use maoflow_core::repository::Page;
use maoflow_core::repository::conversation::ConversationFilter;
use maoflow_types::chat::ConversationStatus;

use crate::http::error::AppError;

const MAX_LIMIT: i64 = 500;

/// `?limit=&offset=` on plain list endpoints.
#[derive(Debug, Deserialize, Default)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageQuery {
    pub fn to_page(&self) -> Result<Page, AppError> {
        let default = Page::default();
        let limit = self.limit.unwrap_or(default.limit);
        let offset = self.offset.unwrap_or(default.offset);
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(AppError::Validation(format!(
                "limit must be between 1 and {MAX_LIMIT}"
            )));
        }
        if offset < 0 {
            return Err(AppError::Validation("offset must not be negative".into()));
        }
        Ok(Page { limit, offset })
    }
}

/// Query parameters for a user's conversation list.
#[derive(Debug, Deserialize, Default)]
pub struct ConversationListQuery {
    /// active, archived, or deleted.
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ConversationListQuery {
    pub fn to_filter(&self) -> Result<ConversationFilter, AppError> {
        let status = self
            .status
            .as_deref()
            .map(str::parse::<ConversationStatus>)
            .transpose()
            .map_err(AppError::Validation)?;
        let page = PageQuery {
            limit: self.limit,
            offset: self.offset,
        }
        .to_page()?;
        Ok(ConversationFilter { status, page })
    }
}

/// `?is_active=` on the model list.
#[derive(Debug, Deserialize, Default)]
pub struct ModelListQuery {
    pub is_active: Option<bool>,
}
