use crate::handlers::events;
use crate::{app_state::AppState, middlewares::auth::auth_middleware};
use axum::routing::{get, post};
use axum::{middleware, Router};

pub fn events_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(events::list_events).post(events::create_event))
        .route("/{id}/register", post(events::register_for_event))
        .layer(middleware::from_fn(auth_middleware))
}
