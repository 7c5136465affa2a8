//! Audit and soft-delete bookkeeping shared by every table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Audit columns carried by every entity: creation/update timestamps,
/// optional attribution to the acting user, and the soft-delete marker.
///
/// `created_by` / `updated_by` are nullable because the first user and
/// system-initiated writes have no actor. A non-null `deleted_at` marks the
/// row logically deleted; default read paths skip such rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AuditStamp {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<i64>,
    pub updated_by: Option<i64>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl AuditStamp {
    /// Stamp for a freshly created row.
    pub fn new(actor: Option<i64>, now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            updated_at: now,
            created_by: actor,
            updated_by: actor,
            deleted_at: None,
        }
    }

    /// Whether the row is logically deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
