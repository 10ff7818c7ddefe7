use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "attendance_state", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AttendanceState {
    Registered,
    Attended,
    DidNotAttend,
}

/// A user's registration for an event. Identity is the (user, event) pair.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Inscription {
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub attendance_state: AttendanceState,
    pub registered_at: DateTime<Utc>,
}
