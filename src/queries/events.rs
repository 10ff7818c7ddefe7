use anyhow::anyhow;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::events::Event,
};

pub async fn insert_event(conn: &mut PgConnection, event: &Event) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO events (id, author_id, body, event_date, privacy, status)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(event.id)
    .bind(event.author_id)
    .bind(&event.body)
    .bind(event.event_date)
    .bind(event.privacy)
    .bind(event.status)
    .execute(conn)
    .await
    .map_err(|e| {
        tracing::error!("Database insert error (insert_event): {:?}", e);
        AppError::InternalServerError(anyhow!("Failed to create event"))
    })?;

    Ok(())
}

pub async fn find_event_by_id(conn: &mut PgConnection, event_id: Uuid) -> AppResult<Option<Event>> {
    let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
        .bind(event_id)
        .fetch_optional(conn)
        .await
        .map_err(|e| {
            tracing::error!("Database query error (find_event_by_id): {:?}", e);
            AppError::InternalServerError(anyhow!("Database error fetching event"))
        })?;

    Ok(event)
}

/// Fetch an event that must exist for the operation to make sense.
pub async fn get_event(conn: &mut PgConnection, event_id: Uuid) -> AppResult<Event> {
    find_event_by_id(conn, event_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Event not found")))
}

/// The feed visible to `viewer`: active events, minus anything authored by a
/// user sharing a blocked row with the viewer (in either direction), honoring
/// event privacy.
pub async fn list_events_visible_to(
    conn: &mut PgConnection,
    viewer: Uuid,
) -> AppResult<Vec<Event>> {
    let events = sqlx::query_as::<_, Event>(
        r#"
        SELECT e.* FROM events e
        WHERE e.status = 'active'
          AND NOT EXISTS (
              SELECT 1 FROM relationships r
              WHERE r.state = 'blocked'
                AND r.user_a = LEAST($1, e.author_id)
                AND r.user_b = GREATEST($1, e.author_id)
          )
          AND (
              e.privacy = 'public'
              OR e.author_id = $1
              OR (e.privacy = 'friends' AND EXISTS (
                  SELECT 1 FROM relationships r
                  WHERE r.state = 'accepted'
                    AND r.user_a = LEAST($1, e.author_id)
                    AND r.user_b = GREATEST($1, e.author_id)
              ))
          )
        ORDER BY e.event_date
        "#,
    )
    .bind(viewer)
    .fetch_all(conn)
    .await
    .map_err(|e| {
        tracing::error!("Database query error (list_events_visible_to): {:?}", e);
        AppError::InternalServerError(anyhow!("Failed to fetch events"))
    })?;

    Ok(events)
}
