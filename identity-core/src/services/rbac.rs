//! RBAC resolution: User -> Role -> Privilege.

use std::collections::HashSet;

use crate::models::{RoleWithPrivileges, User};
use crate::services::database::Database;
use crate::services::error::Result;

/// Read-only authorization queries.
///
/// Role and privilege rows are fetched together through a single join; the
/// caller never assembles the graph from lazy per-row lookups.
#[derive(Clone)]
pub struct RbacService {
    db: Database,
}

impl RbacService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Resolve the set of privilege names a user is authorized for.
    ///
    /// Fails open to "no access": a role that is missing or soft-deleted
    /// yields the empty set rather than an error. A role with no linked
    /// privileges also yields the empty set. Soft-deleted privileges and
    /// soft-deleted join rows are excluded, so revoking by soft delete
    /// takes effect immediately.
    pub async fn resolve_privileges(&self, user: &User) -> Result<HashSet<String>> {
        self.privilege_names_for_role(user.role_id).await
    }

    /// The privilege names linked to a role. Set semantics; callers must
    /// not rely on any ordering.
    pub async fn privilege_names_for_role(&self, role_id: i64) -> Result<HashSet<String>> {
        let names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT p.name
            FROM privilege p
            JOIN role_privilege rp ON rp.privilege_id = p.id
            JOIN role r ON r.id = rp.role_id
            WHERE r.id = ?1
              AND r.deleted_at IS NULL
              AND rp.deleted_at IS NULL
              AND p.deleted_at IS NULL
            "#,
        )
        .bind(role_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(names.into_iter().collect())
    }

    /// A role together with its privilege names (display view). Returns
    /// `None` for a missing or soft-deleted role.
    pub async fn role_with_privileges(&self, role_id: i64) -> Result<Option<RoleWithPrivileges>> {
        let Some(role) = self.db.find_role_by_id(role_id).await? else {
            return Ok(None);
        };
        let privilege_names = self.privilege_names_for_role(role_id).await?;
        Ok(Some(RoleWithPrivileges {
            role,
            privilege_names,
        }))
    }
}
