//! Credential record - password hash and account-lockout state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::AuditStamp;

/// Authentication record, exactly one per user (unique index on `user_id`).
///
/// Stores the opaque password hash produced by the external hashing
/// collaborator - plaintext never reaches this layer - plus the failed-login
/// counter and the lockout expiry timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserAuth {
    pub id: i64,
    pub user_id: i64,
    pub username: Option<String>,
    pub password_hash: String,
    pub wrong_password_count: i64,
    pub account_locked_until: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: AuditStamp,
}

impl UserAuth {
    /// Whether the account is locked at `now`. Expiry is evaluated lazily;
    /// a past `account_locked_until` means unlocked.
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        matches!(self.account_locked_until, Some(until) if until > now)
    }
}

/// Input for creating a credential record.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewUserAuth {
    pub user_id: i64,
    #[validate(length(min = 1, max = 100))]
    pub username: Option<String>,
    #[validate(length(min = 1, max = 256))]
    pub password_hash: String,
}

impl NewUserAuth {
    pub fn new(user_id: i64, password_hash: impl Into<String>) -> Self {
        Self {
            user_id,
            username: None,
            password_hash: password_hash.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn auth(locked_until: Option<DateTime<Utc>>) -> UserAuth {
        let now = Utc::now();
        UserAuth {
            id: 1,
            user_id: 1,
            username: None,
            password_hash: "hash".into(),
            wrong_password_count: 0,
            account_locked_until: locked_until,
            last_login_at: None,
            audit: AuditStamp::new(None, now),
        }
    }

    #[test]
    fn lock_expiry_is_lazy() {
        let now = Utc::now();
        assert!(!auth(None).is_locked(now));
        assert!(auth(Some(now + Duration::minutes(5))).is_locked(now));
        assert!(!auth(Some(now - Duration::minutes(5))).is_locked(now));
    }
}
