//! Credential lockout state machine over user_auth.
//!
//! Thresholds and durations come from [`SecurityPolicy`]; nothing here is
//! hardcoded. Expiry is evaluated lazily against the caller-supplied `now`,
//! never by a background sweep. The state transitions are system-initiated
//! writes with no acting administrator, so they clear `updated_by`.

use chrono::{DateTime, Utc};

use crate::config::SecurityPolicy;
use crate::models::UserAuth;
use crate::services::database::Database;
use crate::services::error::{Result, ServiceError};

/// Lock state returned after recording a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// Still unlocked; carries the current consecutive failure count.
    Unlocked { failures: i64 },
    /// The failure threshold was reached; the account is locked until the
    /// given time and the counter has been reset.
    Locked { until: DateTime<Utc> },
}

#[derive(Clone)]
pub struct LockoutService {
    db: Database,
    policy: SecurityPolicy,
}

impl LockoutService {
    pub fn new(db: Database, policy: SecurityPolicy) -> Self {
        Self { db, policy }
    }

    /// Whether the credential record is locked at `now`.
    ///
    /// Callers must check this before verifying a password so that a locked
    /// account is rejected without leaking whether the password would have
    /// matched.
    pub fn is_locked(auth: &UserAuth, now: DateTime<Utc>) -> bool {
        auth.is_locked(now)
    }

    /// Record a failed login attempt.
    ///
    /// Increments the failure counter atomically (single-statement
    /// read-modify-write, so concurrent attempts cannot lose updates). When
    /// the counter reaches the configured threshold the account is locked
    /// for the configured duration and the counter is reset to 0, both in
    /// the same transaction: reset-on-threshold, so a lock that has expired
    /// grants a full window of fresh attempts.
    pub async fn record_failed_login(
        &self,
        auth_id: i64,
        now: DateTime<Utc>,
    ) -> Result<LockState> {
        let mut tx = self.db.pool().begin().await?;

        let failures: i64 = sqlx::query_scalar(
            r#"
            UPDATE user_auth
            SET wrong_password_count = wrong_password_count + 1,
                updated_at = ?1, updated_by = NULL
            WHERE id = ?2 AND deleted_at IS NULL
            RETURNING wrong_password_count
            "#,
        )
        .bind(now)
        .bind(auth_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ServiceError::not_found("user_auth", auth_id))?;

        if failures < i64::from(self.policy.lockout_threshold) {
            tx.commit().await?;
            return Ok(LockState::Unlocked { failures });
        }

        let until = now + self.policy.lockout_duration();
        let applied = sqlx::query(
            r#"
            UPDATE user_auth
            SET wrong_password_count = 0, account_locked_until = ?1,
                updated_at = ?2, updated_by = NULL
            WHERE id = ?3 AND deleted_at IS NULL AND wrong_password_count = ?4
            "#,
        )
        .bind(until)
        .bind(now)
        .bind(auth_id)
        .bind(failures)
        .execute(&mut *tx)
        .await?;
        if applied.rows_affected() == 0 {
            // Another transaction moved the counter between our two
            // statements; roll back and let the caller retry.
            tx.rollback().await?;
            return Err(ServiceError::ConcurrencyConflict);
        }

        tx.commit().await?;
        tracing::info!(auth_id, %until, "account locked after repeated failed logins");
        Ok(LockState::Locked { until })
    }

    /// Record a successful login: reset the failure counter, clear any
    /// stale lock, and stamp `last_login_at`. Idempotent.
    ///
    /// Rejected with [`ServiceError::Locked`] while the account is locked;
    /// callers were required to check the lock before verifying the
    /// password, so reaching this state means they skipped that check.
    pub async fn record_successful_login(
        &self,
        auth_id: i64,
        now: DateTime<Utc>,
    ) -> Result<UserAuth> {
        let auth = self
            .db
            .find_user_auth_by_id(auth_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("user_auth", auth_id))?;
        if let Some(until) = auth.account_locked_until {
            if until > now {
                return Err(ServiceError::Locked { until });
            }
        }

        sqlx::query_as::<_, UserAuth>(
            r#"
            UPDATE user_auth
            SET wrong_password_count = 0, account_locked_until = NULL,
                last_login_at = ?1, updated_at = ?1, updated_by = NULL
            WHERE id = ?2 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(now)
        .bind(auth_id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| ServiceError::not_found("user_auth", auth_id))
    }
}
