use anyhow::anyhow;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    app_state::AppState,
    error::{AppError, AppResult},
    models::relationships::{FriendshipStatus, RelationState, Relationship},
    queries::{notifications, relationships, users},
};

#[derive(Deserialize)]
pub struct FriendshipRequestData {
    pub from_user_id: Uuid,
    pub to_user_id: Uuid,
}

#[derive(Deserialize)]
pub struct BlockRequestData {
    pub blocker_user_id: Uuid,
    pub blocked_user_id: Uuid,
}

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

/// The first path segment is the caller; the blocked flags are relative to
/// them.
pub async fn get_status(
    State(state): State<AppState>,
    Path((caller, other)): Path<(Uuid, Uuid)>,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.db_pool.acquire().await.map_err(|e| {
        AppError::InternalServerError(anyhow!("Failed to acquire database connection: {}", e))
    })?;

    let status = match relationships::find_relationship(&mut conn, caller, other).await? {
        Some(rel) => rel.status_for(caller),
        None => FriendshipStatus::none(),
    };

    Ok(Json(status))
}

pub async fn send_request(
    State(state): State<AppState>,
    Json(payload): Json<FriendshipRequestData>,
) -> AppResult<impl IntoResponse> {
    let rel = Relationship::new_request(payload.from_user_id, payload.to_user_id)?;

    let mut conn = state.db_pool.acquire().await.map_err(|e| {
        AppError::InternalServerError(anyhow!("Failed to acquire database connection: {}", e))
    })?;

    // Both users must exist before a row referencing them is created.
    let sender = users::get_user(&mut conn, payload.from_user_id).await?;
    users::get_user(&mut conn, payload.to_user_id).await?;

    relationships::insert_relationship(&mut conn, &rel).await?;

    let pool = state.db_pool.clone();
    let message = format!("{} sent you a friend request", sender.display_name());
    tokio::spawn(async move {
        if let Err(e) = notifications::insert_notification(
            &pool,
            payload.to_user_id,
            payload.from_user_id,
            "friend_request",
            &message,
        )
        .await
        {
            tracing::warn!("Failed to record friend-request notification: {}", e);
        }
    });

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Friend request sent",
            "relationship": rel,
        })),
    ))
}

pub async fn accept(
    State(state): State<AppState>,
    Path(other): Path<Uuid>,
    Query(query): Query<UserIdQuery>,
) -> AppResult<impl IntoResponse> {
    let user = query.user_id;

    let mut tx = state.db_pool.begin().await.map_err(|e| {
        AppError::InternalServerError(anyhow!("Database transaction failed: {}", e))
    })?;

    // Lock the row so a concurrent block or cancel cannot interleave with
    // the pending check.
    let rel = relationships::find_relationship_for_update(&mut tx, user, other)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Friend request not found")))?;

    let accepted = rel.accepted_by(user)?;
    relationships::update_relationship(&mut tx, &accepted).await?;

    tx.commit().await.map_err(|e| {
        AppError::InternalServerError(anyhow!("Failed to commit transaction: {}", e))
    })?;

    let pool = state.db_pool.clone();
    tokio::spawn(async move {
        if let Err(e) = notifications::insert_notification(
            &pool,
            other,
            user,
            "friend_accept",
            "Your friend request was accepted",
        )
        .await
        {
            tracing::warn!("Failed to record friend-accept notification: {}", e);
        }
    });

    Ok(Json(json!({
        "message": "Friend request accepted",
        "relationship": accepted,
    })))
}

pub async fn cancel_request(
    State(state): State<AppState>,
    Json(payload): Json<FriendshipRequestData>,
) -> AppResult<impl IntoResponse> {
    let mut tx = state.db_pool.begin().await.map_err(|e| {
        AppError::InternalServerError(anyhow!("Database transaction failed: {}", e))
    })?;

    let rel = relationships::find_relationship_for_update(
        &mut tx,
        payload.from_user_id,
        payload.to_user_id,
    )
    .await?
    .ok_or_else(|| AppError::NotFound(anyhow!("Friend request not found")))?;

    rel.ensure_cancellable_by(payload.from_user_id)?;
    relationships::delete_relationship(&mut tx, payload.from_user_id, payload.to_user_id).await?;

    tx.commit().await.map_err(|e| {
        AppError::InternalServerError(anyhow!("Failed to commit transaction: {}", e))
    })?;

    Ok((StatusCode::OK, "Friend request cancelled"))
}

pub async fn remove_friendship(
    State(state): State<AppState>,
    Json(payload): Json<FriendshipRequestData>,
) -> AppResult<impl IntoResponse> {
    let mut tx = state.db_pool.begin().await.map_err(|e| {
        AppError::InternalServerError(anyhow!("Database transaction failed: {}", e))
    })?;

    let rel = relationships::find_relationship_for_update(
        &mut tx,
        payload.from_user_id,
        payload.to_user_id,
    )
    .await?;

    // Either party may unfriend; only an accepted row qualifies.
    match rel {
        Some(rel) if rel.state == RelationState::Accepted => {}
        _ => return Err(AppError::NotFound(anyhow!("Friendship not found"))),
    }

    relationships::delete_relationship(&mut tx, payload.from_user_id, payload.to_user_id).await?;

    tx.commit().await.map_err(|e| {
        AppError::InternalServerError(anyhow!("Failed to commit transaction: {}", e))
    })?;

    Ok((StatusCode::OK, "Friendship removed"))
}

/// POST /friendship/block
///
/// Blocking always succeeds and always wins: an existing row in any state is
/// overwritten in a single atomic upsert.
pub async fn block(
    State(state): State<AppState>,
    Json(payload): Json<BlockRequestData>,
) -> AppResult<impl IntoResponse> {
    let rel = Relationship::new_block(payload.blocker_user_id, payload.blocked_user_id)?;

    let mut conn = state.db_pool.acquire().await.map_err(|e| {
        AppError::InternalServerError(anyhow!("Failed to acquire database connection: {}", e))
    })?;

    users::get_user(&mut conn, payload.blocker_user_id).await?;
    users::get_user(&mut conn, payload.blocked_user_id).await?;

    relationships::upsert_block(&mut conn, &rel).await?;

    Ok((StatusCode::OK, "User blocked"))
}

/// POST /friendship/unblock
///
/// Only the blocker may lift the block; the row is deleted outright and
/// never reverts to a prior pending or accepted state.
pub async fn unblock(
    State(state): State<AppState>,
    Json(payload): Json<BlockRequestData>,
) -> AppResult<impl IntoResponse> {
    let mut tx = state.db_pool.begin().await.map_err(|e| {
        AppError::InternalServerError(anyhow!("Database transaction failed: {}", e))
    })?;

    let rel = relationships::find_relationship_for_update(
        &mut tx,
        payload.blocker_user_id,
        payload.blocked_user_id,
    )
    .await?
    .ok_or_else(|| AppError::NotFound(anyhow!("No block exists between these users")))?;

    rel.ensure_unblockable_by(payload.blocker_user_id)?;
    relationships::delete_relationship(&mut tx, payload.blocker_user_id, payload.blocked_user_id)
        .await?;

    tx.commit().await.map_err(|e| {
        AppError::InternalServerError(anyhow!("Failed to commit transaction: {}", e))
    })?;

    Ok((StatusCode::OK, "User unblocked"))
}

pub async fn list_friends(
    State(state): State<AppState>,
    Path(user): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.db_pool.acquire().await.map_err(|e| {
        AppError::InternalServerError(anyhow!("Failed to acquire database connection: {}", e))
    })?;

    let friends = relationships::list_friends(&mut conn, user).await?;
    Ok(Json(friends))
}

// Pending requests awaiting the user's decision, not the ones they sent.
pub async fn list_pending(
    State(state): State<AppState>,
    Query(query): Query<UserIdQuery>,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.db_pool.acquire().await.map_err(|e| {
        AppError::InternalServerError(anyhow!("Failed to acquire database connection: {}", e))
    })?;

    let pending = relationships::list_pending_incoming(&mut conn, query.user_id).await?;
    Ok(Json(pending))
}

pub async fn list_blocked(
    State(state): State<AppState>,
    Query(query): Query<UserIdQuery>,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.db_pool.acquire().await.map_err(|e| {
        AppError::InternalServerError(anyhow!("Failed to acquire database connection: {}", e))
    })?;

    let blocked = relationships::list_blocked_by(&mut conn, query.user_id).await?;
    Ok(Json(blocked))
}
