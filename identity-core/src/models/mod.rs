//! Entity models for the identity/RBAC schema.
//!
//! Every table registered in [`SCHEMA_TABLES`] maps 1:1 to a row struct here
//! and to a step in the migration history under `migrations/`.

pub mod audit;
pub mod privilege;
pub mod role;
pub mod role_privilege;
pub mod user;
pub mod user_auth;
pub mod user_identity;

pub use audit::AuditStamp;
pub use privilege::{NewPrivilege, Privilege};
pub use role::{NewRole, Role, RoleWithPrivileges};
pub use role_privilege::RolePrivilege;
pub use user::{Gender, NewUser, User};
pub use user_auth::{NewUserAuth, UserAuth};
pub use user_identity::{IdentityType, NewUserIdentity, UserIdentity};

/// Explicit schema registry: every table the migration history produces, in
/// creation order. New entities must be added here and given a migration;
/// nothing registers itself as a side effect of being imported.
pub const SCHEMA_TABLES: &[&str] = &[
    "privilege",
    "role",
    "role_privilege",
    "user",
    "user_auth",
    "user_identity",
];
