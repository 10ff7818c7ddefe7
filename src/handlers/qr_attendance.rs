use anyhow::anyhow;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    app_state::AppState,
    error::{AppError, AppResult},
    middlewares::auth::current_user_id,
    models::attendance::{
        AttendanceStats, DailyStat, GenderBreakdown, HourlyStat, percentage,
    },
    models::inscriptions::AttendanceState,
    models::users::Gender,
    queries::{attendance, events, inscriptions, users},
    utils::qr,
};

#[derive(Serialize)]
pub struct QrCodeResponse {
    pub qr_code_data: String,
    pub qr_image_base64: String,
    pub inscription_id: String,
}

/// Issue a signed payload binding the user's inscription to the event,
/// rendered both as JSON and as a scannable PNG.
pub async fn generate_qr(
    State(state): State<AppState>,
    Path((event_id, user_id)): Path<(Uuid, Uuid)>,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.db_pool.acquire().await.map_err(|e| {
        AppError::InternalServerError(anyhow!("Failed to acquire database connection: {}", e))
    })?;

    users::get_user(&mut conn, user_id).await?;
    events::get_event(&mut conn, event_id).await?;
    inscriptions::get_inscription(&mut conn, user_id, event_id).await?;

    let payload = qr::issue(&state.qr_secret, event_id, user_id, Utc::now());
    let qr_code_data = qr::encode(&payload)?;
    let qr_image_base64 = qr::render_png_base64(&qr_code_data)?;

    Ok(Json(QrCodeResponse {
        qr_code_data,
        qr_image_base64,
        inscription_id: payload.inscription_id,
    }))
}

#[derive(Deserialize)]
pub struct QrVerificationRequest {
    pub qr_data: String,
    pub verificador_id: Uuid,
    pub ubicacion_lat: Option<f64>,
    pub ubicacion_lng: Option<f64>,
    pub notas: Option<String>,
}

#[derive(Serialize)]
pub struct QrVerificationResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_id: Option<Uuid>,
}

/// Consume a scanned token at most once. Tampered or malformed payloads are
/// rejected before any lookup; a repeat scan is a soft "already verified"
/// response so gate operators can double-tap safely.
pub async fn verify_qr(
    State(state): State<AppState>,
    Json(payload): Json<QrVerificationRequest>,
) -> AppResult<impl IntoResponse> {
    let token = qr::decode_and_verify(&state.qr_secret, &payload.qr_data)?;

    let mut tx = state.db_pool.begin().await.map_err(|e| {
        AppError::InternalServerError(anyhow!("Database transaction failed: {}", e))
    })?;

    let user = users::get_user(&mut tx, token.user_id).await?;
    let event = events::get_event(&mut tx, token.event_id).await?;
    inscriptions::get_inscription(&mut tx, token.user_id, token.event_id).await?;

    if attendance::find_verification(&mut tx, token.user_id, token.event_id)
        .await?
        .is_some()
    {
        return Ok(Json(QrVerificationResponse {
            success: false,
            message: "This user has already been verified for this event".to_string(),
            user_name: Some(user.display_name()),
            event_title: Some(event.title()),
            verification_id: None,
        }));
    }

    let new_verification = attendance::NewVerification {
        id: Uuid::new_v4(),
        user_id: token.user_id,
        event_id: token.event_id,
        verifier_id: payload.verificador_id,
        qr_payload: &payload.qr_data,
        location_lat: payload.ubicacion_lat,
        location_lng: payload.ubicacion_lng,
        notes: payload.notas.as_deref(),
    };

    // A concurrent scan may win between the check above and this insert; the
    // unique constraint is the tie-breaker and the loser reports the same
    // "already verified" outcome.
    let Some(verification_id) = attendance::insert_verification(&mut tx, &new_verification).await?
    else {
        return Ok(Json(QrVerificationResponse {
            success: false,
            message: "This user has already been verified for this event".to_string(),
            user_name: Some(user.display_name()),
            event_title: Some(event.title()),
            verification_id: None,
        }));
    };

    inscriptions::mark_attended(&mut tx, token.user_id, token.event_id).await?;

    tx.commit().await.map_err(|e| {
        AppError::InternalServerError(anyhow!("Failed to commit verification: {}", e))
    })?;

    Ok(Json(QrVerificationResponse {
        success: true,
        message: "Attendance verified successfully".to_string(),
        user_name: Some(user.display_name()),
        event_title: Some(event.title()),
        verification_id: Some(verification_id),
    }))
}

/// Organizer-only audit trail of consumed scans.
pub async fn historial(
    State(state): State<AppState>,
    session: Session,
    Path(event_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let caller = current_user_id(&session).await?;

    let mut conn = state.db_pool.acquire().await.map_err(|e| {
        AppError::InternalServerError(anyhow!("Failed to acquire database connection: {}", e))
    })?;

    let event = events::get_event(&mut conn, event_id).await?;
    if event.author_id != caller {
        return Err(AppError::Forbidden(anyhow!(
            "Only the organizer can view the attendance history"
        )));
    }

    let records = attendance::list_event_verifications(&mut conn, event_id).await?;
    Ok(Json(records))
}

/// Organizer-only aggregates: totals, gender breakdown of registrants,
/// verifications per day over the last week and per hour of day.
pub async fn estadisticas(
    State(state): State<AppState>,
    session: Session,
    Path(event_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let caller = current_user_id(&session).await?;

    let mut conn = state.db_pool.acquire().await.map_err(|e| {
        AppError::InternalServerError(anyhow!("Failed to acquire database connection: {}", e))
    })?;

    let event = events::get_event(&mut conn, event_id).await?;
    if event.author_id != caller {
        return Err(AppError::Forbidden(anyhow!(
            "Only the organizer can view the statistics"
        )));
    }

    let total_registered = inscriptions::count_registrations(&mut conn, event_id).await?;
    let total_attended =
        inscriptions::count_by_attendance(&mut conn, event_id, AttendanceState::Attended).await?;
    let total_no_shows =
        inscriptions::count_by_attendance(&mut conn, event_id, AttendanceState::DidNotAttend)
            .await?;

    let mut by_gender = GenderBreakdown::default();
    for (gender, count) in attendance::gender_counts(&mut conn, event_id).await? {
        match gender {
            Some(Gender::Male) => by_gender.male = count,
            Some(Gender::Female) => by_gender.female = count,
            Some(Gender::Other) | None => by_gender.other += count,
        }
    }

    let since = Utc::now() - Duration::days(7);
    let by_day = attendance::daily_verification_counts(&mut conn, event_id, since)
        .await?
        .into_iter()
        .map(|(day, attended)| DailyStat {
            date: day.format("%Y-%m-%d").to_string(),
            registered: total_registered,
            attended,
            rate: percentage(attended, total_registered),
        })
        .collect();

    let by_hour = attendance::hourly_verification_counts(&mut conn, event_id)
        .await?
        .into_iter()
        .map(|(hour, count)| HourlyStat {
            hour: format!("{}:00", hour),
            count,
            share: percentage(count, total_attended),
        })
        .collect();

    Ok(Json(AttendanceStats {
        total_registered,
        total_attended,
        total_no_shows,
        attendance_rate: percentage(total_attended, total_registered),
        by_gender,
        by_day,
        by_hour,
    }))
}
