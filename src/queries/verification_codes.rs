use anyhow::anyhow;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::users::VerificationCode,
};

pub async fn insert_verification_code(
    conn: &mut PgConnection,
    id: Uuid,
    user_id: Uuid,
    code: &str,
    expires_at: DateTime<Utc>,
) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO verification_codes (id, user_id, code, expires_at) VALUES ($1, $2, $3, $4)",
    )
    .bind(id)
    .bind(user_id)
    .bind(code)
    .bind(expires_at)
    .execute(conn)
    .await
    .map_err(|e| {
        tracing::error!("Database insert error (insert_verification_code): {:?}", e);
        AppError::InternalServerError(anyhow!("Failed to store verification code"))
    })?;

    Ok(())
}

/// Find an unconsumed code for this user, locking it so a concurrent request
/// cannot consume the same code twice.
pub async fn find_unused_code_for_update(
    conn: &mut PgConnection,
    user_id: Uuid,
    code: &str,
) -> AppResult<Option<VerificationCode>> {
    let found = sqlx::query_as::<_, VerificationCode>(
        r#"
        SELECT * FROM verification_codes
        WHERE user_id = $1 AND code = $2 AND used_at IS NULL
        FOR UPDATE
        "#,
    )
    .bind(user_id)
    .bind(code)
    .fetch_optional(conn)
    .await
    .map_err(|e| {
        tracing::error!("Database query error (find_unused_code_for_update): {:?}", e);
        AppError::InternalServerError(anyhow!("Database error fetching verification code"))
    })?;

    Ok(found)
}

pub async fn mark_code_used(conn: &mut PgConnection, code_id: Uuid) -> AppResult<()> {
    sqlx::query("UPDATE verification_codes SET used_at = NOW() WHERE id = $1")
        .bind(code_id)
        .execute(conn)
        .await
        .map_err(|e| {
            tracing::error!("Database update error (mark_code_used): {:?}", e);
            AppError::InternalServerError(anyhow!("Database error consuming verification code"))
        })?;

    Ok(())
}
