use anyhow::anyhow;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    app_state::AppState,
    error::{AppError, AppResult},
    middlewares::auth::current_user_id,
    queries::users,
};

/// GET /users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.db_pool.acquire().await.map_err(|e| {
        AppError::InternalServerError(anyhow!("Failed to acquire database connection: {}", e))
    })?;

    let user = users::get_user(&mut conn, user_id).await?;
    Ok(Json(user))
}

/// GET /users
///
/// Listing is relative to the logged-in viewer: users sharing a blocked
/// relationship with them, in either direction, are excluded.
pub async fn list_users(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<impl IntoResponse> {
    let viewer = current_user_id(&session).await?;

    let mut conn = state.db_pool.acquire().await.map_err(|e| {
        AppError::InternalServerError(anyhow!("Failed to acquire database connection: {}", e))
    })?;

    let visible = users::list_users_visible_to(&mut conn, viewer).await?;
    Ok(Json(visible))
}
