use crate::app_state::AppState;
use axum::{response::IntoResponse, routing::get, Json, Router};
use serde_json::json;

pub fn index_route() -> Router<AppState> {
    Router::new().route("/", get(health))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
