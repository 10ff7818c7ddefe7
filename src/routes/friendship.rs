use crate::handlers::friendship;
use crate::{app_state::AppState, middlewares::auth::auth_middleware};
use axum::routing::{delete, get, post, put};
use axum::{middleware, Router};

pub fn friendship_routes() -> Router<AppState> {
    Router::new()
        .route("/status/{user_a}/{user_b}", get(friendship::get_status))
        .route(
            "/request",
            post(friendship::send_request).delete(friendship::cancel_request),
        )
        .route("/accept/{other}", put(friendship::accept))
        .route("/friendship", delete(friendship::remove_friendship))
        .route("/block", post(friendship::block))
        .route("/unblock", post(friendship::unblock))
        .route("/friends/{user}", get(friendship::list_friends))
        .route("/pending", get(friendship::list_pending))
        .route("/blocked", get(friendship::list_blocked))
        .layer(middleware::from_fn(auth_middleware))
}
