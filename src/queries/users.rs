use anyhow::anyhow;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    handlers::auth::Register,
    models::users::{User, UserSummary},
};

pub async fn insert_user(
    conn: &mut PgConnection,
    user_id: Uuid,
    payload: &Register,
    hashed_password: String,
) -> AppResult<()> {
    let insert_user_result = sqlx::query(
        r#"
        INSERT INTO users (id, username, email, password_hash, first_name, last_name, birth_date, gender)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(user_id)
    .bind(&payload.username)
    .bind(&payload.email)
    .bind(hashed_password)
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(payload.birth_date)
    .bind(payload.gender)
    .execute(conn)
    .await;

    if let Err(e) = insert_user_result {
        if let Some(db_err) = e.as_database_error() {
            if db_err.is_unique_violation() {
                return Err(AppError::BadRequest(anyhow!(
                    "Email or username is already registered"
                )));
            }
        }
        tracing::error!("Database insert error (insert_user): {:?}", e);
        return Err(AppError::InternalServerError(anyhow!(
            "Failed to create user account"
        )));
    }

    Ok(())
}

pub async fn find_user_by_email(conn: &mut PgConnection, email: &str) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(conn)
        .await
        .map_err(|e| {
            tracing::error!("Database query error (find_user_by_email): {:?}", e);
            AppError::InternalServerError(anyhow!("Database error fetching user"))
        })?;

    Ok(user)
}

pub async fn find_user_by_id(conn: &mut PgConnection, user_id: Uuid) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(conn)
        .await
        .map_err(|e| {
            tracing::error!("Database query error (find_user_by_id): {:?}", e);
            AppError::InternalServerError(anyhow!("Database error fetching user"))
        })?;

    Ok(user)
}

/// Fetch a user that must exist for the operation to make sense.
pub async fn get_user(conn: &mut PgConnection, user_id: Uuid) -> AppResult<User> {
    find_user_by_id(conn, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("User not found")))
}

pub async fn mark_user_verified(conn: &mut PgConnection, user_id: Uuid) -> AppResult<()> {
    sqlx::query("UPDATE users SET verified = TRUE WHERE id = $1")
        .bind(user_id)
        .execute(conn)
        .await
        .map_err(|e| {
            tracing::error!("Database update error (mark_user_verified): {:?}", e);
            AppError::InternalServerError(anyhow!("Database error verifying user"))
        })?;

    Ok(())
}

/// All users visible to `viewer`: everyone except the viewer themselves and
/// anyone sharing a blocked relationship row with them, in either direction.
pub async fn list_users_visible_to(
    conn: &mut PgConnection,
    viewer: Uuid,
) -> AppResult<Vec<UserSummary>> {
    let users = sqlx::query_as::<_, UserSummary>(
        r#"
        SELECT u.id, u.username, u.first_name, u.last_name, u.profile_photo_url, u.verified
        FROM users u
        WHERE u.id <> $1
          AND NOT EXISTS (
              SELECT 1 FROM relationships r
              WHERE r.state = 'blocked'
                AND r.user_a = LEAST($1, u.id)
                AND r.user_b = GREATEST($1, u.id)
          )
        ORDER BY u.username
        "#,
    )
    .bind(viewer)
    .fetch_all(conn)
    .await
    .map_err(|e| {
        tracing::error!("Database query error (list_users_visible_to): {:?}", e);
        AppError::InternalServerError(anyhow!("Failed to fetch users"))
    })?;

    Ok(users)
}
