use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/*
user_a UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
user_b UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
state relation_state NOT NULL,
actor UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
PRIMARY KEY (user_a, user_b),
CONSTRAINT chk_user_order CHECK (user_a < user_b)
 */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::Type)]
#[sqlx(type_name = "relation_state", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RelationState {
    Pending,
    Accepted,
    Blocked,
}

/// Normalize an unordered user pair into `(lesser, greater)`.
///
/// Every read and write of the relationships table goes through this, so a
/// pair can never produce two rows that disagree about the same relationship.
/// `Uuid` ordering matches Postgres uuid comparison, which is what the
/// `chk_user_order` check constraint enforces.
pub fn canonical_pair(x: Uuid, y: Uuid) -> (Uuid, Uuid) {
    if x <= y {
        (x, y)
    } else {
        (y, x)
    }
}

/// The single row describing the social state between two users.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Relationship {
    pub user_a: Uuid,
    pub user_b: Uuid,
    pub state: RelationState,
    pub actor: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Caller-relative view of a relationship row, as returned by the status
/// endpoint. The blocked flags are derived from who the acting user was.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FriendshipStatus {
    pub status: &'static str,
    #[serde(rename = "isBlockedByMe")]
    pub is_blocked_by_me: bool,
    #[serde(rename = "isBlockedByThem")]
    pub is_blocked_by_them: bool,
}

impl FriendshipStatus {
    pub fn none() -> Self {
        FriendshipStatus {
            status: "none",
            is_blocked_by_me: false,
            is_blocked_by_them: false,
        }
    }
}

impl Relationship {
    /// A fresh friend request from `from` to `to`.
    pub fn new_request(from: Uuid, to: Uuid) -> AppResult<Relationship> {
        if from == to {
            return Err(AppError::BadRequest(anyhow!(
                "You cannot send a friend request to yourself"
            )));
        }
        let (user_a, user_b) = canonical_pair(from, to);
        Ok(Relationship {
            user_a,
            user_b,
            state: RelationState::Pending,
            actor: from,
            created_at: Utc::now(),
        })
    }

    /// A fresh block of `blocked` by `blocker`, used when no row exists yet.
    pub fn new_block(blocker: Uuid, blocked: Uuid) -> AppResult<Relationship> {
        if blocker == blocked {
            return Err(AppError::BadRequest(anyhow!("You cannot block yourself")));
        }
        let (user_a, user_b) = canonical_pair(blocker, blocked);
        Ok(Relationship {
            user_a,
            user_b,
            state: RelationState::Blocked,
            actor: blocker,
            created_at: Utc::now(),
        })
    }

    /// The other party of the pair, from `user`'s perspective.
    pub fn other_of(&self, user: Uuid) -> Uuid {
        if self.user_a == user {
            self.user_b
        } else {
            self.user_a
        }
    }

    /// Accept a pending request. Only the recipient may accept: the row's
    /// actor is the requester, so `actor == user` means the caller is trying
    /// to accept their own outgoing request.
    pub fn accepted_by(mut self, user: Uuid) -> AppResult<Relationship> {
        if self.state != RelationState::Pending {
            return Err(AppError::NotFound(anyhow!("Friend request not found")));
        }
        if self.actor == user {
            return Err(AppError::BadRequest(anyhow!(
                "You cannot accept your own friend request"
            )));
        }
        self.state = RelationState::Accepted;
        self.actor = user;
        Ok(self)
    }

    /// Blocking overwrites whatever state the row held. It always succeeds
    /// and always wins over pending or accepted.
    pub fn blocked_by(mut self, blocker: Uuid) -> Relationship {
        self.state = RelationState::Blocked;
        self.actor = blocker;
        self
    }

    /// Only the original requester may cancel a pending request.
    pub fn ensure_cancellable_by(&self, user: Uuid) -> AppResult<()> {
        if self.state != RelationState::Pending {
            return Err(AppError::NotFound(anyhow!("Friend request not found")));
        }
        if self.actor != user {
            return Err(AppError::Forbidden(anyhow!(
                "Only the user who sent the request can cancel it"
            )));
        }
        Ok(())
    }

    /// Only the user who placed the block may lift it.
    pub fn ensure_unblockable_by(&self, user: Uuid) -> AppResult<()> {
        if self.state != RelationState::Blocked {
            return Err(AppError::NotFound(anyhow!(
                "No block exists between these users"
            )));
        }
        if self.actor != user {
            return Err(AppError::Forbidden(anyhow!(
                "Only the user who blocked can unblock"
            )));
        }
        Ok(())
    }

    /// Derive the caller-relative status view from the canonical row.
    pub fn status_for(&self, viewer: Uuid) -> FriendshipStatus {
        match self.state {
            RelationState::Pending => FriendshipStatus {
                status: "pending",
                is_blocked_by_me: false,
                is_blocked_by_them: false,
            },
            RelationState::Accepted => FriendshipStatus {
                status: "accepted",
                is_blocked_by_me: false,
                is_blocked_by_them: false,
            },
            RelationState::Blocked => {
                let mine = self.actor == viewer;
                FriendshipStatus {
                    status: "blocked",
                    is_blocked_by_me: mine,
                    is_blocked_by_them: !mine,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> (Uuid, Uuid) {
        (Uuid::new_v4(), Uuid::new_v4())
    }

    #[test]
    fn canonical_pair_is_order_independent() {
        let (x, y) = pair();
        assert_eq!(canonical_pair(x, y), canonical_pair(y, x));
        let (a, b) = canonical_pair(x, y);
        assert!(a < b);
    }

    #[test]
    fn request_stores_canonical_order_and_requester_as_actor() {
        let (x, y) = pair();
        let rel = Relationship::new_request(y, x).unwrap();
        assert!(rel.user_a < rel.user_b);
        assert_eq!(rel.state, RelationState::Pending);
        assert_eq!(rel.actor, y);
    }

    #[test]
    fn request_to_self_is_rejected() {
        let me = Uuid::new_v4();
        let err = Relationship::new_request(me, me).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        let err = Relationship::new_block(me, me).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn recipient_accepts_and_becomes_actor() {
        let (from, to) = pair();
        let rel = Relationship::new_request(from, to).unwrap();
        let accepted = rel.accepted_by(to).unwrap();
        assert_eq!(accepted.state, RelationState::Accepted);
        assert_eq!(accepted.actor, to);
    }

    #[test]
    fn requester_cannot_accept_own_request() {
        let (from, to) = pair();
        let rel = Relationship::new_request(from, to).unwrap();
        let err = rel.accepted_by(from).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn accepting_a_non_pending_row_is_not_found() {
        let (from, to) = pair();
        let rel = Relationship::new_request(from, to).unwrap().blocked_by(from);
        let err = rel.accepted_by(to).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn block_overwrites_accepted_state() {
        let (from, to) = pair();
        let rel = Relationship::new_request(from, to)
            .unwrap()
            .accepted_by(to)
            .unwrap()
            .blocked_by(to);
        assert_eq!(rel.state, RelationState::Blocked);
        assert_eq!(rel.actor, to);
    }

    #[test]
    fn only_requester_cancels() {
        let (from, to) = pair();
        let rel = Relationship::new_request(from, to).unwrap();
        assert!(rel.ensure_cancellable_by(from).is_ok());
        let err = rel.ensure_cancellable_by(to).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn only_blocker_unblocks() {
        let (blocker, blocked) = pair();
        let rel = Relationship::new_block(blocker, blocked).unwrap();
        assert!(rel.ensure_unblockable_by(blocker).is_ok());
        let err = rel.ensure_unblockable_by(blocked).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        // The row itself is untouched by the failed check.
        assert_eq!(rel.state, RelationState::Blocked);
        assert_eq!(rel.actor, blocker);
    }

    #[test]
    fn unblock_of_missing_block_is_not_found() {
        let (from, to) = pair();
        let rel = Relationship::new_request(from, to).unwrap();
        let err = rel.ensure_unblockable_by(from).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn blocked_status_is_relative_to_the_viewer() {
        let (blocker, blocked) = pair();
        let rel = Relationship::new_block(blocker, blocked).unwrap();

        let mine = rel.status_for(blocker);
        assert_eq!(mine.status, "blocked");
        assert!(mine.is_blocked_by_me);
        assert!(!mine.is_blocked_by_them);

        let theirs = rel.status_for(blocked);
        assert_eq!(theirs.status, "blocked");
        assert!(!theirs.is_blocked_by_me);
        assert!(theirs.is_blocked_by_them);
    }

    #[test]
    fn full_lifecycle_request_accept_block_unblock() {
        let (u1, u2) = pair();
        let rel = Relationship::new_request(u1, u2).unwrap();
        assert_eq!(rel.status_for(u1).status, "pending");

        let rel = rel.accepted_by(u2).unwrap();
        assert_eq!(rel.status_for(u1).status, "accepted");

        let rel = rel.blocked_by(u1);
        let view = rel.status_for(u1);
        assert_eq!(view.status, "blocked");
        assert!(view.is_blocked_by_me);

        // Unblock deletes the row outright; the resulting view is "none".
        assert!(rel.ensure_unblockable_by(u1).is_ok());
        assert_eq!(FriendshipStatus::none().status, "none");
    }

    #[test]
    fn status_view_serializes_with_camel_case_flags() {
        let (blocker, blocked) = pair();
        let rel = Relationship::new_block(blocker, blocked).unwrap();
        let json = serde_json::to_value(rel.status_for(blocker)).unwrap();
        assert_eq!(json["status"], "blocked");
        assert_eq!(json["isBlockedByMe"], true);
        assert_eq!(json["isBlockedByThem"], false);
    }

    #[test]
    fn other_of_resolves_the_opposite_party() {
        let (x, y) = pair();
        let rel = Relationship::new_request(x, y).unwrap();
        assert_eq!(rel.other_of(x), y);
        assert_eq!(rel.other_of(y), x);
    }
}
