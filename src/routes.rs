mod auth;
mod events;
mod friendship;
mod index;
mod qr_attendance;
mod users;

use crate::app_state::AppState;
use axum::{http::header, Router};
use tower_http::cors::{Any, CorsLayer};

pub fn create_routes() -> Router<AppState> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([header::ACCEPT, header::AUTHORIZATION, header::CONTENT_TYPE]);

    Router::new()
        .merge(index::index_route())
        .nest("/auth", auth::auth_routes())
        .nest("/users", users::users_routes())
        .nest("/events", events::events_routes())
        .nest("/friendship", friendship::friendship_routes())
        .nest("/qr-attendance", qr_attendance::qr_attendance_routes())
        .layer(cors)
}
