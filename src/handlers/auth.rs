use anyhow::anyhow;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, NaiveDate, Utc};
use rand::Rng;
use serde::Deserialize;
use serde_json::json;
use tower_sessions::Session;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app_state::AppState,
    error::{AppError, AppResult},
    models::{sessions::UserSession, users::Gender},
    queries::{users, verification_codes},
    utils::email::send_verification_code_email,
};

const VERIFICATION_CODE_TTL_MINUTES: i64 = 30;

#[derive(Deserialize, Validate)]
pub struct Register {
    #[validate(length(min = 3, max = 50, message = "Username must be 3 to 50 characters"))]
    pub username: String,

    #[validate(email(message = "Invalid email format"))]
    #[validate(length(min = 1, max = 255, message = "Email is required and cannot be empty"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[serde(rename = "firstName")]
    #[validate(length(
        min = 1,
        max = 100,
        message = "First name is required and cannot be empty"
    ))]
    pub first_name: String,

    #[serde(rename = "lastName")]
    #[validate(length(
        min = 1,
        max = 100,
        message = "Last name is required and cannot be empty"
    ))]
    pub last_name: String,

    #[serde(rename = "birthDate")]
    pub birth_date: NaiveDate,

    pub gender: Option<Gender>,
}

pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<Register>,
) -> AppResult<impl IntoResponse> {
    payload.username = payload.username.trim().to_string();
    payload.email = payload.email.trim().to_string();
    payload.first_name = payload.first_name.trim().to_string();
    payload.last_name = payload.last_name.trim().to_string();

    payload.validate().map_err(|e| {
        let mut error_messages = String::new();
        for (field, errors) in e.field_errors() {
            for error in errors {
                error_messages.push_str(&format!(
                    "{}: {} ",
                    field,
                    error
                        .message
                        .as_ref()
                        .map_or("invalid value", |m| m.as_ref())
                ));
            }
        }
        AppError::BadRequest(anyhow!(error_messages.trim().to_string()))
    })?;

    let hashed_password = hash(payload.password.as_bytes(), DEFAULT_COST)
        .map_err(|_| AppError::InternalServerError(anyhow!("Error processing registration")))?;

    let user_id = Uuid::new_v4();
    let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000));
    let expires_at = Utc::now() + Duration::minutes(VERIFICATION_CODE_TTL_MINUTES);

    let mut tx = state
        .db_pool
        .begin()
        .await
        .map_err(|_| AppError::InternalServerError(anyhow!("Database error during signup")))?;

    users::insert_user(&mut tx, user_id, &payload, hashed_password).await?;
    verification_codes::insert_verification_code(&mut tx, Uuid::new_v4(), user_id, &code, expires_at)
        .await?;

    tx.commit().await.map_err(|e| {
        AppError::InternalServerError(anyhow!("Failed to commit signup transaction: {}", e))
    })?;

    // The account is usable before the email lands; delivery failures only
    // mean the user requests a new code later.
    let email = payload.email.clone();
    tokio::spawn(async move {
        if let Err(e) = send_verification_code_email(&email, &code).await {
            tracing::warn!("Failed to send verification email: {}", e);
        }
    });

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": user_id,
            "username": payload.username,
            "email": payload.email,
        })),
    ))
}

#[derive(Deserialize, Validate)]
pub struct Login {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password cannot be empty"))]
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(mut payload): Json<Login>,
) -> AppResult<impl IntoResponse> {
    payload.email = payload.email.trim().to_string();
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(anyhow!("Invalid login data: {}", e)))?;

    let mut conn = state.db_pool.acquire().await.map_err(|e| {
        AppError::InternalServerError(anyhow!("Failed to acquire database connection: {}", e))
    })?;

    let user = users::find_user_by_email(&mut conn, &payload.email)
        .await?
        .ok_or_else(|| AppError::BadRequest(anyhow!("Invalid email or password")))?;

    let password_matches = verify(payload.password.as_bytes(), &user.password_hash)
        .map_err(|_| AppError::InternalServerError(anyhow!("Error verifying credentials")))?;
    if !password_matches {
        return Err(AppError::BadRequest(anyhow!("Invalid email or password")));
    }

    session
        .insert("user", UserSession { user_id: user.id })
        .await
        .map_err(|e| AppError::InternalServerError(anyhow!("Failed to create session: {}", e)))?;

    Ok(Json(json!({
        "id": user.id,
        "username": user.username,
        "email": user.email,
        "firstName": user.first_name,
        "lastName": user.last_name,
    })))
}

pub async fn logout(session: Session) -> AppResult<impl IntoResponse> {
    session
        .flush()
        .await
        .map_err(|e| AppError::InternalServerError(anyhow!("Failed to clear session: {}", e)))?;

    Ok((StatusCode::OK, "Logged out"))
}

#[derive(Deserialize, Validate)]
pub struct VerifyEmail {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, max = 6, message = "Verification code must be 6 digits"))]
    pub code: String,
}

/// Consume an email verification code: it must exist, be unused, and be
/// inside its lifetime. Consumption and the verified flag flip happen in one
/// transaction so a code can never be spent twice.
pub async fn verify_email(
    State(state): State<AppState>,
    Json(payload): Json<VerifyEmail>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(anyhow!("Invalid verification data: {}", e)))?;

    let mut tx = state.db_pool.begin().await.map_err(|e| {
        AppError::InternalServerError(anyhow!("Database transaction failed: {}", e))
    })?;

    let user = users::find_user_by_email(&mut tx, payload.email.trim())
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("User not found")))?;

    let code = verification_codes::find_unused_code_for_update(&mut tx, user.id, &payload.code)
        .await?
        .ok_or_else(|| AppError::BadRequest(anyhow!("Invalid verification code")))?;

    if code.is_expired(Utc::now()) {
        return Err(AppError::BadRequest(anyhow!("Verification code expired")));
    }

    verification_codes::mark_code_used(&mut tx, code.id).await?;
    users::mark_user_verified(&mut tx, user.id).await?;

    tx.commit().await.map_err(|e| {
        AppError::InternalServerError(anyhow!("Failed to commit verification: {}", e))
    })?;

    Ok((StatusCode::OK, "Email verified"))
}
