//! LLM model configuration handlers. API keys are accepted on write and
//! never echoed back.

use axum::Json;
use axum::extract::{Path, Query, State};
use serde_json::json;
use uuid::Uuid;

use maoflow_types::model::{LlmModel, ModelPatch, NewModel};

use crate::http::error::AppError;
use crate::http::extractors::query::ModelListQuery;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

/// POST /api/v1/models
pub async fn create_model(
    State(state): State<AppState>,
    Json(body): Json<NewModel>,
) -> Result<Json<ApiResponse<LlmModel>>, AppError> {
    let timer = RequestTimer::start();
    let model = state.model_service.create_model(body).await?;
    let href = format!("/api/v1/models/{}", model.id);
    Ok(Json(timer.finish(model).with_link("self", href)))
}

/// GET /api/v1/models - ordered by priority, then name.
pub async fn list_models(
    State(state): State<AppState>,
    Query(query): Query<ModelListQuery>,
) -> Result<Json<ApiResponse<Vec<LlmModel>>>, AppError> {
    let timer = RequestTimer::start();
    let models = state.model_service.list_models(query.is_active).await?;
    Ok(Json(timer.finish(models).with_link("self", "/api/v1/models")))
}

/// GET /api/v1/models/{id}
pub async fn get_model(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<LlmModel>>, AppError> {
    let timer = RequestTimer::start();
    let model = state.model_service.get_model(&id).await?;
    Ok(Json(timer.finish(model).with_link("self", format!("/api/v1/models/{id}"))))
}

/// PUT /api/v1/models/{id} - partial update; absent fields are kept.
pub async fn update_model(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ModelPatch>,
) -> Result<Json<ApiResponse<LlmModel>>, AppError> {
    let timer = RequestTimer::start();
    let model = state.model_service.update_model(&id, body).await?;
    Ok(Json(timer.finish(model).with_link("self", format!("/api/v1/models/{id}"))))
}

/// DELETE /api/v1/models/{id}
pub async fn delete_model(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let timer = RequestTimer::start();
    state.model_service.delete_model(&id).await?;
    Ok(Json(timer.finish(json!({ "deleted": true, "id": id }))))
}
