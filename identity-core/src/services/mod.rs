pub mod database;
pub mod error;
pub mod identity;
pub mod lockout;
pub mod rbac;

pub use database::Database;
pub use error::{Result, ServiceError};
pub use identity::IdentityService;
pub use lockout::{LockState, LockoutService};
pub use rbac::RbacService;
