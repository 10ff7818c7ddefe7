#[derive(Clone)]
pub struct AppState {
    pub db_pool: sqlx::PgPool,
    /// Server-side secret mixed into QR payload signatures.
    pub qr_secret: String,
}
