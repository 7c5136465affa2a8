//! Many-to-many association between roles and privileges.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::AuditStamp;

/// One privilege granted to one role. The pair (role_id, privilege_id) is
/// unique; both foreign keys cascade on hard deletion of the parent.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RolePrivilege {
    pub id: i64,
    pub role_id: i64,
    pub privilege_id: i64,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: AuditStamp,
}
