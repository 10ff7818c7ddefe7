use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_privacy", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventPrivacy {
    Public,
    Friends,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Active,
    Finished,
    Cancelled,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Event {
    pub id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub event_date: DateTime<Utc>,
    pub privacy: EventPrivacy,
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Short display title derived from the event body, used in verification
    /// responses and audit listings.
    pub fn title(&self) -> String {
        truncate_title(&self.body)
    }
}

const TITLE_MAX_CHARS: usize = 50;

pub fn truncate_title(body: &str) -> String {
    if body.chars().count() > TITLE_MAX_CHARS {
        let mut title: String = body.chars().take(TITLE_MAX_CHARS).collect();
        title.push_str("...");
        title
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_bodies_pass_through() {
        assert_eq!(truncate_title("Morning run"), "Morning run");
    }

    #[test]
    fn long_bodies_are_truncated_with_ellipsis() {
        let body = "x".repeat(80);
        let title = truncate_title(&body);
        assert_eq!(title.chars().count(), 53);
        assert!(title.ends_with("..."));
    }

    #[test]
    fn truncation_respects_multibyte_characters() {
        let body = "é".repeat(60);
        let title = truncate_title(&body);
        assert!(title.starts_with(&"é".repeat(50)));
        assert!(title.ends_with("..."));
    }
}
