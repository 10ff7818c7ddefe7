use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        attendance::{AttendanceVerification, VerificationRecord, VerificationState},
        users::Gender,
    },
};

pub struct NewVerification<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub verifier_id: Uuid,
    pub qr_payload: &'a str,
    pub location_lat: Option<f64>,
    pub location_lng: Option<f64>,
    pub notes: Option<&'a str>,
}

pub async fn find_verification(
    conn: &mut PgConnection,
    user_id: Uuid,
    event_id: Uuid,
) -> AppResult<Option<AttendanceVerification>> {
    let verification = sqlx::query_as::<_, AttendanceVerification>(
        "SELECT * FROM attendance_verifications WHERE user_id = $1 AND event_id = $2",
    )
    .bind(user_id)
    .bind(event_id)
    .fetch_optional(conn)
    .await
    .map_err(|e| {
        tracing::error!("Database query error (find_verification): {:?}", e);
        AppError::InternalServerError(anyhow!("Database error fetching verification"))
    })?;

    Ok(verification)
}

/// Append the audit row for a first-time scan. Returns `None` when the
/// unique (user, event) constraint fires, meaning a concurrent scan already
/// verified this inscription; the caller reports that as "already verified"
/// rather than an error.
pub async fn insert_verification(
    conn: &mut PgConnection,
    verification: &NewVerification<'_>,
) -> AppResult<Option<Uuid>> {
    let result = sqlx::query(
        r#"
        INSERT INTO attendance_verifications
            (id, user_id, event_id, verifier_id, qr_payload, verification_state,
             location_lat, location_lng, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(verification.id)
    .bind(verification.user_id)
    .bind(verification.event_id)
    .bind(verification.verifier_id)
    .bind(verification.qr_payload)
    .bind(VerificationState::Verified)
    .bind(verification.location_lat)
    .bind(verification.location_lng)
    .bind(verification.notes)
    .execute(conn)
    .await;

    match result {
        Ok(_) => Ok(Some(verification.id)),
        Err(e) => {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return Ok(None);
                }
            }
            tracing::error!("Database insert error (insert_verification): {:?}", e);
            Err(AppError::InternalServerError(anyhow!(
                "Failed to record attendance verification"
            )))
        }
    }
}

/// Full audit trail for an event, joined with display names.
pub async fn list_event_verifications(
    conn: &mut PgConnection,
    event_id: Uuid,
) -> AppResult<Vec<VerificationRecord>> {
    let records = sqlx::query_as::<_, VerificationRecord>(
        r#"
        SELECT v.id, v.user_id, v.event_id, v.verifier_id, v.verification_state,
               v.verified_at, v.location_lat, v.location_lng, v.notes,
               u.first_name || ' ' || u.last_name AS user_name,
               w.first_name || ' ' || w.last_name AS verifier_name
        FROM attendance_verifications v
        JOIN users u ON u.id = v.user_id
        JOIN users w ON w.id = v.verifier_id
        WHERE v.event_id = $1
        ORDER BY v.verified_at DESC
        "#,
    )
    .bind(event_id)
    .fetch_all(conn)
    .await
    .map_err(|e| {
        tracing::error!("Database query error (list_event_verifications): {:?}", e);
        AppError::InternalServerError(anyhow!("Failed to fetch verification history"))
    })?;

    Ok(records)
}

/// Registrant counts per gender for one event.
pub async fn gender_counts(
    conn: &mut PgConnection,
    event_id: Uuid,
) -> AppResult<Vec<(Option<Gender>, i64)>> {
    let counts = sqlx::query_as::<_, (Option<Gender>, i64)>(
        r#"
        SELECT u.gender, COUNT(*)
        FROM inscriptions i
        JOIN users u ON u.id = i.user_id
        WHERE i.event_id = $1
        GROUP BY u.gender
        "#,
    )
    .bind(event_id)
    .fetch_all(conn)
    .await
    .map_err(|e| {
        tracing::error!("Database query error (gender_counts): {:?}", e);
        AppError::InternalServerError(anyhow!("Failed to compute gender statistics"))
    })?;

    Ok(counts)
}

/// Verification counts per day since `since`.
pub async fn daily_verification_counts(
    conn: &mut PgConnection,
    event_id: Uuid,
    since: DateTime<Utc>,
) -> AppResult<Vec<(NaiveDate, i64)>> {
    let counts = sqlx::query_as::<_, (NaiveDate, i64)>(
        r#"
        SELECT verified_at::date AS day, COUNT(*)
        FROM attendance_verifications
        WHERE event_id = $1 AND verified_at >= $2
        GROUP BY day
        ORDER BY day
        "#,
    )
    .bind(event_id)
    .bind(since)
    .fetch_all(conn)
    .await
    .map_err(|e| {
        tracing::error!("Database query error (daily_verification_counts): {:?}", e);
        AppError::InternalServerError(anyhow!("Failed to compute daily statistics"))
    })?;

    Ok(counts)
}

/// Verification counts bucketed by hour of day.
pub async fn hourly_verification_counts(
    conn: &mut PgConnection,
    event_id: Uuid,
) -> AppResult<Vec<(i32, i64)>> {
    let counts = sqlx::query_as::<_, (i32, i64)>(
        r#"
        SELECT CAST(EXTRACT(HOUR FROM verified_at) AS INT4) AS hour, COUNT(*)
        FROM attendance_verifications
        WHERE event_id = $1
        GROUP BY hour
        ORDER BY hour
        "#,
    )
    .bind(event_id)
    .fetch_all(conn)
    .await
    .map_err(|e| {
        tracing::error!("Database query error (hourly_verification_counts): {:?}", e);
        AppError::InternalServerError(anyhow!("Failed to compute hourly statistics"))
    })?;

    Ok(counts)
}
