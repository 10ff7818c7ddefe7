use anyhow::anyhow;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        relationships::{canonical_pair, Relationship},
        users::FriendSummary,
    },
};

/// Insert a fresh relationship row. The pair primary key doubles as the
/// duplicate detector: a unique violation means a row already exists for this
/// pair (possibly written by a concurrent request), which surfaces as a
/// conflict either way.
pub async fn insert_relationship(conn: &mut PgConnection, rel: &Relationship) -> AppResult<()> {
    sqlx::query("INSERT INTO relationships (user_a, user_b, state, actor) VALUES ($1, $2, $3, $4)")
        .bind(rel.user_a)
        .bind(rel.user_b)
        .bind(rel.state)
        .bind(rel.actor)
        .execute(conn)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::Conflict(anyhow!(
                        "A relationship between these users already exists"
                    ));
                }
            }
            tracing::error!("Database insert error (insert_relationship): {:?}", e);
            AppError::InternalServerError(anyhow!("Failed to create relationship"))
        })?;

    Ok(())
}

pub async fn find_relationship(
    conn: &mut PgConnection,
    x: Uuid,
    y: Uuid,
) -> AppResult<Option<Relationship>> {
    let (user_a, user_b) = canonical_pair(x, y);
    let relationship = sqlx::query_as::<_, Relationship>(
        "SELECT * FROM relationships WHERE user_a = $1 AND user_b = $2",
    )
    .bind(user_a)
    .bind(user_b)
    .fetch_optional(conn)
    .await
    .map_err(|e| {
        tracing::error!("Database query error (find_relationship): {:?}", e);
        AppError::InternalServerError(anyhow!("Failed to fetch relationship"))
    })?;

    Ok(relationship)
}

/// Same lookup, but holds a row lock for the rest of the transaction so a
/// read-modify-write transition cannot race a concurrent writer.
pub async fn find_relationship_for_update(
    conn: &mut PgConnection,
    x: Uuid,
    y: Uuid,
) -> AppResult<Option<Relationship>> {
    let (user_a, user_b) = canonical_pair(x, y);
    let relationship = sqlx::query_as::<_, Relationship>(
        "SELECT * FROM relationships WHERE user_a = $1 AND user_b = $2 FOR UPDATE",
    )
    .bind(user_a)
    .bind(user_b)
    .fetch_optional(conn)
    .await
    .map_err(|e| {
        tracing::error!("Database query error (find_relationship_for_update): {:?}", e);
        AppError::InternalServerError(anyhow!("Failed to fetch relationship"))
    })?;

    Ok(relationship)
}

pub async fn update_relationship(conn: &mut PgConnection, rel: &Relationship) -> AppResult<()> {
    sqlx::query("UPDATE relationships SET state = $3, actor = $4 WHERE user_a = $1 AND user_b = $2")
        .bind(rel.user_a)
        .bind(rel.user_b)
        .bind(rel.state)
        .bind(rel.actor)
        .execute(conn)
        .await
        .map_err(|e| {
            tracing::error!("Database update error (update_relationship): {:?}", e);
            AppError::InternalServerError(anyhow!("Failed to update relationship"))
        })?;

    Ok(())
}

/// Write a block over whatever row exists for the pair, creating one if
/// absent. Atomic, so blocking can never lose a race or leave two rows.
pub async fn upsert_block(conn: &mut PgConnection, rel: &Relationship) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO relationships (user_a, user_b, state, actor) VALUES ($1, $2, $3, $4)
         ON CONFLICT (user_a, user_b) DO UPDATE SET state = EXCLUDED.state, actor = EXCLUDED.actor",
    )
    .bind(rel.user_a)
    .bind(rel.user_b)
    .bind(rel.state)
    .bind(rel.actor)
    .execute(conn)
    .await
    .map_err(|e| {
        tracing::error!("Database upsert error (upsert_block): {:?}", e);
        AppError::InternalServerError(anyhow!("Failed to block user"))
    })?;

    Ok(())
}

pub async fn delete_relationship(conn: &mut PgConnection, x: Uuid, y: Uuid) -> AppResult<()> {
    let (user_a, user_b) = canonical_pair(x, y);
    sqlx::query("DELETE FROM relationships WHERE user_a = $1 AND user_b = $2")
        .bind(user_a)
        .bind(user_b)
        .execute(conn)
        .await
        .map_err(|e| {
            tracing::error!("Database delete error (delete_relationship): {:?}", e);
            AppError::InternalServerError(anyhow!("Failed to delete relationship"))
        })?;

    Ok(())
}

/// Accepted rows touching `user`, resolved to the other party's profile.
pub async fn list_friends(conn: &mut PgConnection, user: Uuid) -> AppResult<Vec<FriendSummary>> {
    let friends = sqlx::query_as::<_, FriendSummary>(
        r#"
        SELECT u.id, u.username, u.first_name, u.last_name, u.profile_photo_url, u.verified,
               r.created_at AS friends_since
        FROM relationships r
        JOIN users u ON u.id = CASE WHEN r.user_a = $1 THEN r.user_b ELSE r.user_a END
        WHERE (r.user_a = $1 OR r.user_b = $1) AND r.state = 'accepted'
        ORDER BY r.created_at DESC
        "#,
    )
    .bind(user)
    .fetch_all(conn)
    .await
    .map_err(|e| {
        tracing::error!("Database query error (list_friends): {:?}", e);
        AppError::InternalServerError(anyhow!("Failed to fetch friends"))
    })?;

    Ok(friends)
}

/// Pending rows awaiting `user`'s decision, i.e. where someone else acted.
pub async fn list_pending_incoming(
    conn: &mut PgConnection,
    user: Uuid,
) -> AppResult<Vec<Relationship>> {
    let pending = sqlx::query_as::<_, Relationship>(
        r#"
        SELECT * FROM relationships
        WHERE (user_a = $1 OR user_b = $1) AND state = 'pending' AND actor <> $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(user)
    .fetch_all(conn)
    .await
    .map_err(|e| {
        tracing::error!("Database query error (list_pending_incoming): {:?}", e);
        AppError::InternalServerError(anyhow!("Failed to fetch pending friend requests"))
    })?;

    Ok(pending)
}

/// Blocked rows placed by `user`.
pub async fn list_blocked_by(
    conn: &mut PgConnection,
    user: Uuid,
) -> AppResult<Vec<Relationship>> {
    let blocked = sqlx::query_as::<_, Relationship>(
        r#"
        SELECT * FROM relationships
        WHERE (user_a = $1 OR user_b = $1) AND state = 'blocked' AND actor = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(user)
    .fetch_all(conn)
    .await
    .map_err(|e| {
        tracing::error!("Database query error (list_blocked_by): {:?}", e);
        AppError::InternalServerError(anyhow!("Failed to fetch blocked users"))
    })?;

    Ok(blocked)
}
