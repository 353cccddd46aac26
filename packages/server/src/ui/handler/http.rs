//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{Json, extract::State};

use crate::ui::state::AppState;

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Known room names, sorted
pub async fn get_rooms(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    let rooms = state.get_rooms_usecase.execute().await;
    Json(rooms.into_iter().map(|room| room.into_string()).collect())
}
