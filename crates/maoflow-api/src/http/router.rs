//! Axum router configuration with middleware.
//!
//! All resource routes are under `/api/v1/`; `/health` sits at the root.
//! Middleware: CORS and request tracing.

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    let api_routes = Router::new()
        // Users
        .route(
            "/users",
            post(handlers::user::create_user).get(handlers::user::list_users),
        )
        .route("/users/{id}", get(handlers::user::get_user))
        .route(
            "/users/{id}/settings",
            get(handlers::user::get_user_settings).put(handlers::user::update_user_settings),
        )
        .route(
            "/users/{id}/conversations",
            get(handlers::user::list_user_conversations),
        )
        // Models
        .route(
            "/models",
            post(handlers::model::create_model).get(handlers::model::list_models),
        )
        .route(
            "/models/{id}",
            get(handlers::model::get_model)
                .put(handlers::model::update_model)
                .delete(handlers::model::delete_model),
        )
        // Conversations
        .route(
            "/conversations",
            post(handlers::conversation::create_conversation),
        )
        .route(
            "/conversations/{id}",
            get(handlers::conversation::get_conversation)
                .patch(handlers::conversation::update_conversation)
                .delete(handlers::conversation::delete_conversation),
        )
        .route(
            "/conversations/{id}/messages",
            get(handlers::conversation::list_messages),
        )
        // Chat streaming
        .route(
            "/conversations/{id}/chat",
            post(handlers::chat::stream_chat),
        )
        // Content blocks
        .route(
            "/messages/{id}/items",
            get(handlers::message::list_message_items),
        );

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `*` anywhere in the list allows every origin. Entries that are not
/// valid header values are skipped with a warning.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
