use anyhow::anyhow;
use axum::{extract::Request, middleware::Next, response::Response};
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::sessions::UserSession,
};

/// Reject requests that carry no logged-in session.
pub async fn auth_middleware(session: Session, req: Request, next: Next) -> AppResult<Response> {
    match session.get::<UserSession>("user").await {
        Ok(Some(_user_session)) => Ok(next.run(req).await),
        Ok(None) => Err(AppError::Unauthorized(anyhow!("Not logged in"))),
        Err(e) => Err(AppError::InternalServerError(anyhow!(
            "Session error: {}",
            e
        ))),
    }
}

/// The logged-in user's id, for handlers that need the caller's identity.
pub async fn current_user_id(session: &Session) -> AppResult<Uuid> {
    let user_session = session
        .get::<UserSession>("user")
        .await
        .map_err(|e| AppError::InternalServerError(anyhow!("Session error: {}", e)))?;

    match user_session {
        Some(user_session) => Ok(user_session.user_id),
        None => Err(AppError::Unauthorized(anyhow!("Not logged in"))),
    }
}
