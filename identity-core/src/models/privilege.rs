//! Privilege model - named, fine-grained access rights.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::AuditStamp;

/// Privilege entity. Example privileges: "create_user", "view_dashboard".
///
/// `name` is globally unique. The unique index does not exclude soft-deleted
/// rows, so a deleted privilege keeps its claim on the name.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Privilege {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: AuditStamp,
}

/// Input for creating a privilege.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewPrivilege {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    #[validate(length(max = 256))]
    pub description: Option<String>,
}

impl NewPrivilege {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }
}
