use crate::handlers::qr_attendance;
use crate::{app_state::AppState, middlewares::auth::auth_middleware};
use axum::routing::{get, post};
use axum::{middleware, Router};

pub fn qr_attendance_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/generate-qr/{event_id}/{user_id}",
            post(qr_attendance::generate_qr),
        )
        .route("/verify-qr", post(qr_attendance::verify_qr))
        .route("/historial/{event_id}", get(qr_attendance::historial))
        .route("/estadisticas/{event_id}", get(qr_attendance::estadisticas))
        .layer(middleware::from_fn(auth_middleware))
}
