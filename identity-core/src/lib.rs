//! Persistence core for an identity/access-control subsystem.
//!
//! Defines the relational schema and its linear migration history for
//! users, credentials, multi-channel identities (email/mobile/OAuth),
//! roles, and privileges, plus the data-access operations that enforce the
//! model's invariants: RBAC resolution, credential lockout, OTP
//! verification, primary-identity exclusivity, and audit/soft-delete
//! bookkeeping.
//!
//! Transport, session issuance, password hashing, and OTP delivery are
//! external collaborators; they call into this crate through the service
//! types in [`services`].

pub mod config;
pub mod db;
pub mod models;
pub mod services;

pub use services::{Result, ServiceError};
