pub mod auth;
pub mod events;
pub mod friendship;
pub mod qr_attendance;
pub mod users;
