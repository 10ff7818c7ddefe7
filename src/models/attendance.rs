use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "verification_state", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum VerificationState {
    Pending,
    Verified,
    Cancelled,
}

/// Append-only audit record of a consumed QR scan. At most one verified row
/// may exist per (user, event) pair, enforced by a unique constraint.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct AttendanceVerification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub verifier_id: Uuid,
    pub qr_payload: String,
    pub verification_state: VerificationState,
    pub verified_at: DateTime<Utc>,
    pub location_lat: Option<f64>,
    pub location_lng: Option<f64>,
    pub notes: Option<String>,
}

/// Audit row joined with display names for the organizer-facing history view.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct VerificationRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub verifier_id: Uuid,
    pub verification_state: VerificationState,
    pub verified_at: DateTime<Utc>,
    pub location_lat: Option<f64>,
    pub location_lng: Option<f64>,
    pub notes: Option<String>,
    pub user_name: String,
    pub verifier_name: String,
}

#[derive(Debug, Default, Serialize)]
pub struct GenderBreakdown {
    pub male: i64,
    pub female: i64,
    pub other: i64,
}

#[derive(Debug, Serialize)]
pub struct DailyStat {
    pub date: String,
    pub registered: i64,
    pub attended: i64,
    pub rate: f64,
}

#[derive(Debug, Serialize)]
pub struct HourlyStat {
    pub hour: String,
    pub count: i64,
    pub share: f64,
}

/// Aggregate attendance figures for one event, derived entirely from stored
/// rows.
#[derive(Debug, Serialize)]
pub struct AttendanceStats {
    pub total_registered: i64,
    pub total_attended: i64,
    pub total_no_shows: i64,
    pub attendance_rate: f64,
    pub by_gender: GenderBreakdown,
    pub by_day: Vec<DailyStat>,
    pub by_hour: Vec<HourlyStat>,
}

/// `part` of `whole` as a percentage rounded to two decimals. A zero `whole`
/// yields 0 rather than dividing by zero.
pub fn percentage(part: i64, whole: i64) -> f64 {
    if whole > 0 {
        (part as f64 / whole as f64 * 10_000.0).round() / 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_rounds_to_two_decimals() {
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(2, 3), 66.67);
        assert_eq!(percentage(3, 3), 100.0);
    }

    #[test]
    fn percentage_of_zero_whole_is_zero() {
        assert_eq!(percentage(5, 0), 0.0);
        assert_eq!(percentage(0, 0), 0.0);
    }
}
