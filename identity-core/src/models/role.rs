//! Role model - named bundles of privileges assignable to users.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::AuditStamp;

/// Role entity. Examples: "SuperAdmin", "Moderator", "Viewer".
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: AuditStamp,
}

/// Input for creating a role.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewRole {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    #[validate(length(max = 256))]
    pub description: Option<String>,
}

impl NewRole {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }
}

/// Role together with the names of its linked privileges.
///
/// The name set is a display view; authorization decisions go through
/// `RbacService::resolve_privileges`.
#[derive(Debug, Clone, Serialize)]
pub struct RoleWithPrivileges {
    #[serde(flatten)]
    pub role: Role,
    pub privilege_names: HashSet<String>,
}
