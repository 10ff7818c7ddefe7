use anyhow::anyhow;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::inscriptions::{AttendanceState, Inscription},
};

pub async fn insert_inscription(
    conn: &mut PgConnection,
    user_id: Uuid,
    event_id: Uuid,
) -> AppResult<()> {
    sqlx::query("INSERT INTO inscriptions (user_id, event_id) VALUES ($1, $2)")
        .bind(user_id)
        .bind(event_id)
        .execute(conn)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::Conflict(anyhow!(
                        "User is already registered for this event"
                    ));
                }
            }
            tracing::error!("Database insert error (insert_inscription): {:?}", e);
            AppError::InternalServerError(anyhow!("Failed to register for event"))
        })?;

    Ok(())
}

pub async fn find_inscription(
    conn: &mut PgConnection,
    user_id: Uuid,
    event_id: Uuid,
) -> AppResult<Option<Inscription>> {
    let inscription = sqlx::query_as::<_, Inscription>(
        "SELECT * FROM inscriptions WHERE user_id = $1 AND event_id = $2",
    )
    .bind(user_id)
    .bind(event_id)
    .fetch_optional(conn)
    .await
    .map_err(|e| {
        tracing::error!("Database query error (find_inscription): {:?}", e);
        AppError::InternalServerError(anyhow!("Database error fetching inscription"))
    })?;

    Ok(inscription)
}

/// Fetch an inscription that must exist for the operation to make sense.
pub async fn get_inscription(
    conn: &mut PgConnection,
    user_id: Uuid,
    event_id: Uuid,
) -> AppResult<Inscription> {
    find_inscription(conn, user_id, event_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("User is not registered for this event")))
}

pub async fn mark_attended(
    conn: &mut PgConnection,
    user_id: Uuid,
    event_id: Uuid,
) -> AppResult<()> {
    sqlx::query(
        "UPDATE inscriptions SET attendance_state = 'attended' WHERE user_id = $1 AND event_id = $2",
    )
    .bind(user_id)
    .bind(event_id)
    .execute(conn)
    .await
    .map_err(|e| {
        tracing::error!("Database update error (mark_attended): {:?}", e);
        AppError::InternalServerError(anyhow!("Failed to update attendance state"))
    })?;

    Ok(())
}

pub async fn count_registrations(conn: &mut PgConnection, event_id: Uuid) -> AppResult<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM inscriptions WHERE event_id = $1",
    )
    .bind(event_id)
    .fetch_one(conn)
    .await
    .map_err(|e| {
        tracing::error!("Database query error (count_registrations): {:?}", e);
        AppError::InternalServerError(anyhow!("Failed to count registrations"))
    })?;

    Ok(count)
}

pub async fn count_by_attendance(
    conn: &mut PgConnection,
    event_id: Uuid,
    state: AttendanceState,
) -> AppResult<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM inscriptions WHERE event_id = $1 AND attendance_state = $2",
    )
    .bind(event_id)
    .bind(state)
    .fetch_one(conn)
    .await
    .map_err(|e| {
        tracing::error!("Database query error (count_by_attendance): {:?}", e);
        AppError::InternalServerError(anyhow!("Failed to count attendance"))
    })?;

    Ok(count)
}
