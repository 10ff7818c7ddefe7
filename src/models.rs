pub mod attendance;
pub mod events;
pub mod inscriptions;
pub mod relationships;
pub mod sessions;
pub mod users;
