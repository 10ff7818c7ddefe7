use anyhow::anyhow;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Record a notification for `recipient`. Callers treat this as
/// fire-and-forget: a failure is logged and never fails the request that
/// triggered it.
pub async fn insert_notification(
    pool: &PgPool,
    recipient_id: Uuid,
    sender_id: Uuid,
    kind: &str,
    message: &str,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO notifications (id, recipient_id, sender_id, kind, message)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(recipient_id)
    .bind(sender_id)
    .bind(kind)
    .bind(message)
    .execute(pool)
    .await
    .map_err(|e| {
        tracing::error!("Database insert error (insert_notification): {:?}", e);
        AppError::InternalServerError(anyhow!("Failed to record notification"))
    })?;

    Ok(())
}
