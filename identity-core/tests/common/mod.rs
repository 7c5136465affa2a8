//! Shared setup for integration tests: an in-memory database with the full
//! migration history applied, plus builders for the common entities.

#![allow(dead_code)]

use std::str::FromStr;

use identity_core::config::SecurityPolicy;
use identity_core::db;
use identity_core::models::{
    NewPrivilege, NewRole, NewUser, NewUserAuth, NewUserIdentity, Privilege, Role, User, UserAuth,
    UserIdentity,
};
use identity_core::services::Database;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

/// Open a fresh in-memory database and apply the full migration history.
///
/// A single pooled connection keeps the in-memory database alive and
/// shared for the whole test.
pub async fn setup_db() -> Database {
    init_tracing();

    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("connect options")
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("failed to open in-memory database");

    db::run_migrations(&pool).await.expect("migrations failed");
    Database::new(pool)
}

fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "warn".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Short lockout/OTP windows so threshold tests stay readable.
pub fn test_policy() -> SecurityPolicy {
    SecurityPolicy {
        lockout_threshold: 3,
        lockout_duration_seconds: 900,
        otp_ttl_seconds: 300,
        otp_retry_threshold: 3,
    }
}

pub async fn create_role(db: &Database, name: &str) -> Role {
    db.insert_role(&NewRole::new(name), None)
        .await
        .expect("insert role")
}

pub async fn create_privilege(db: &Database, name: &str) -> Privilege {
    db.insert_privilege(&NewPrivilege::new(name), None)
        .await
        .expect("insert privilege")
}

/// Create a privilege and grant it to the role.
pub async fn grant(db: &Database, role_id: i64, privilege_name: &str) -> Privilege {
    let privilege = create_privilege(db, privilege_name).await;
    db.link_privilege(role_id, privilege.id, None)
        .await
        .expect("link privilege");
    privilege
}

pub async fn create_user(db: &Database, first_name: &str, role_id: i64) -> User {
    db.insert_user(&NewUser::new(first_name, role_id), None)
        .await
        .expect("insert user")
}

pub async fn create_auth(db: &Database, user_id: i64) -> UserAuth {
    db.insert_user_auth(&NewUserAuth::new(user_id, "argon2-opaque-hash"), None)
        .await
        .expect("insert user_auth")
}

pub async fn create_email_identity(db: &Database, user_id: i64, value: &str) -> UserIdentity {
    db.insert_user_identity(&NewUserIdentity::email(user_id, value), None)
        .await
        .expect("insert identity")
}
