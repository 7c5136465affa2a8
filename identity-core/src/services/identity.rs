//! Identity verification: OTP challenge state machine and the primary-flag
//! switch.
//!
//! OTP codes are generated and delivered out of band; this layer only
//! stores and validates them. The TTL lives in [`SecurityPolicy`], not in
//! the row, and is evaluated lazily against the caller-supplied `now`.
//! Every transition here is a system-initiated write with no acting
//! administrator, so each clears `updated_by`.

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::config::SecurityPolicy;
use crate::models::UserIdentity;
use crate::services::database::Database;
use crate::services::error::{Result, ServiceError};

#[derive(Clone)]
pub struct IdentityService {
    db: Database,
    policy: SecurityPolicy,
}

impl IdentityService {
    pub fn new(db: Database, policy: SecurityPolicy) -> Self {
        Self { db, policy }
    }

    /// Mint a numeric OTP code for callers that want the core to produce
    /// it before handing it to the delivery collaborator.
    pub fn random_code(len: usize) -> String {
        let mut rng = rand::thread_rng();
        (0..len).map(|_| rng.gen_range(0..10).to_string()).collect()
    }

    /// Store a freshly issued OTP challenge on an identity.
    ///
    /// Rejected while the identity is OTP-locked. An expired lock does not
    /// block: expiry is lazy.
    pub async fn generate_otp(
        &self,
        identity_id: i64,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<UserIdentity> {
        let identity = self.require_identity(identity_id).await?;
        if let Some(until) = identity.otp_locked_until {
            if until > now {
                return Err(ServiceError::Locked { until });
            }
        }

        sqlx::query_as::<_, UserIdentity>(
            r#"
            UPDATE user_identity
            SET otp_code = ?1, otp_generated_at = ?2,
                updated_at = ?2, updated_by = NULL
            WHERE id = ?3 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(code)
        .bind(now)
        .bind(identity_id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| ServiceError::not_found("user_identity", identity_id))
    }

    /// Verify a submitted OTP code.
    ///
    /// While OTP-locked every attempt is rejected with
    /// [`ServiceError::Locked`], regardless of code correctness. A matching
    /// code within the TTL marks the identity verified, clears the
    /// challenge, and resets the failure counter. A mismatch increments the
    /// counter atomically; at the configured threshold the identity is
    /// locked for the configured duration and the counter resets to 0, in
    /// the same transaction. A matching but expired code is a failed
    /// attempt too, so replaying stale codes still walks toward the lock.
    pub async fn verify_otp(
        &self,
        identity_id: i64,
        submitted_code: &str,
        now: DateTime<Utc>,
    ) -> Result<UserIdentity> {
        let identity = self.require_identity(identity_id).await?;
        if let Some(until) = identity.otp_locked_until {
            if until > now {
                return Err(ServiceError::Locked { until });
            }
        }

        let Some(stored) = identity.otp_code.as_deref() else {
            return Err(ServiceError::Validation(
                "no otp challenge outstanding".into(),
            ));
        };

        if stored != submitted_code {
            return self.record_failed_otp(identity_id, now).await;
        }

        let expired = match identity.otp_generated_at {
            Some(generated_at) => now - generated_at > self.policy.otp_ttl(),
            None => true,
        };
        if expired {
            return self.record_failed_otp(identity_id, now).await;
        }

        sqlx::query_as::<_, UserIdentity>(
            r#"
            UPDATE user_identity
            SET is_verified = 1, otp_code = NULL, otp_generated_at = NULL,
                wrong_otp_count = 0, updated_at = ?1, updated_by = NULL
            WHERE id = ?2 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(now)
        .bind(identity_id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| ServiceError::not_found("user_identity", identity_id))
    }

    /// Mark an identity as the primary channel of its type for its user.
    ///
    /// Clears `is_primary` on every sibling identity of the same (user,
    /// type) pair and sets it on the target inside one transaction, so at
    /// most one primary per pair is observable at any point.
    pub async fn set_primary(&self, identity_id: i64, now: DateTime<Utc>) -> Result<UserIdentity> {
        let mut tx = self.db.pool().begin().await?;

        let identity = sqlx::query_as::<_, UserIdentity>(
            "SELECT * FROM user_identity WHERE id = ?1 AND deleted_at IS NULL",
        )
        .bind(identity_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ServiceError::not_found("user_identity", identity_id))?;

        sqlx::query(
            r#"
            UPDATE user_identity
            SET is_primary = 0, updated_at = ?1, updated_by = NULL
            WHERE user_id = ?2 AND type = ?3 AND id != ?4
              AND is_primary = 1 AND deleted_at IS NULL
            "#,
        )
        .bind(now)
        .bind(identity.user_id)
        .bind(&identity.identity_type)
        .bind(identity_id)
        .execute(&mut *tx)
        .await?;

        let updated = sqlx::query_as::<_, UserIdentity>(
            r#"
            UPDATE user_identity
            SET is_primary = 1, updated_at = ?1, updated_by = NULL
            WHERE id = ?2 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(now)
        .bind(identity_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ServiceError::ConcurrencyConflict)?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn require_identity(&self, identity_id: i64) -> Result<UserIdentity> {
        self.db
            .find_user_identity_by_id(identity_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("user_identity", identity_id))
    }

    /// Count a wrong OTP submission, locking the identity at the threshold.
    /// Always returns an error; the distinction is Validation vs Locked
    /// discovered on the next attempt.
    async fn record_failed_otp(
        &self,
        identity_id: i64,
        now: DateTime<Utc>,
    ) -> Result<UserIdentity> {
        let mut tx = self.db.pool().begin().await?;

        let failures: i64 = sqlx::query_scalar(
            r#"
            UPDATE user_identity
            SET wrong_otp_count = wrong_otp_count + 1,
                updated_at = ?1, updated_by = NULL
            WHERE id = ?2 AND deleted_at IS NULL
            RETURNING wrong_otp_count
            "#,
        )
        .bind(now)
        .bind(identity_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ServiceError::not_found("user_identity", identity_id))?;

        if failures >= i64::from(self.policy.otp_retry_threshold) {
            let until = now + self.policy.lockout_duration();
            let applied = sqlx::query(
                r#"
                UPDATE user_identity
                SET wrong_otp_count = 0, otp_locked_until = ?1,
                    updated_at = ?2, updated_by = NULL
                WHERE id = ?3 AND deleted_at IS NULL AND wrong_otp_count = ?4
                "#,
            )
            .bind(until)
            .bind(now)
            .bind(identity_id)
            .bind(failures)
            .execute(&mut *tx)
            .await?;
            if applied.rows_affected() == 0 {
                tx.rollback().await?;
                return Err(ServiceError::ConcurrencyConflict);
            }
            tx.commit().await?;
            tracing::info!(identity_id, %until, "identity otp-locked after repeated failures");
        } else {
            tx.commit().await?;
        }

        Err(ServiceError::Validation("invalid otp code".into()))
    }
}
