use anyhow::anyhow;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tower_sessions::Session;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app_state::AppState,
    error::{AppError, AppResult},
    middlewares::auth::current_user_id,
    models::events::{Event, EventPrivacy, EventStatus},
    queries::{events, inscriptions},
};

#[derive(Deserialize, Validate)]
pub struct CreateEvent {
    #[validate(length(min = 1, max = 5000, message = "Event body cannot be empty"))]
    pub body: String,
    pub event_date: DateTime<Utc>,
    pub privacy: Option<EventPrivacy>,
}

/// POST /events
pub async fn create_event(
    State(state): State<AppState>,
    session: Session,
    Json(mut payload): Json<CreateEvent>,
) -> AppResult<impl IntoResponse> {
    let author_id = current_user_id(&session).await?;

    payload.body = payload.body.trim().to_string();
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(anyhow!("Invalid event data: {}", e)))?;

    let event = Event {
        id: Uuid::new_v4(),
        author_id,
        body: payload.body,
        event_date: payload.event_date,
        privacy: payload.privacy.unwrap_or(EventPrivacy::Public),
        status: EventStatus::Active,
        created_at: Utc::now(),
    };

    let mut conn = state.db_pool.acquire().await.map_err(|e| {
        AppError::InternalServerError(anyhow!("Failed to acquire database connection: {}", e))
    })?;

    events::insert_event(&mut conn, &event).await?;

    Ok((StatusCode::CREATED, Json(event)))
}

/// GET /events
pub async fn list_events(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<impl IntoResponse> {
    let viewer = current_user_id(&session).await?;

    let mut conn = state.db_pool.acquire().await.map_err(|e| {
        AppError::InternalServerError(anyhow!("Failed to acquire database connection: {}", e))
    })?;

    let feed = events::list_events_visible_to(&mut conn, viewer).await?;
    Ok(Json(feed))
}

/// POST /events/{id}/register
pub async fn register_for_event(
    State(state): State<AppState>,
    session: Session,
    Path(event_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let user_id = current_user_id(&session).await?;

    let mut conn = state.db_pool.acquire().await.map_err(|e| {
        AppError::InternalServerError(anyhow!("Failed to acquire database connection: {}", e))
    })?;

    events::get_event(&mut conn, event_id).await?;
    inscriptions::insert_inscription(&mut conn, user_id, event_id).await?;

    Ok((StatusCode::CREATED, "Registered for event"))
}
