//! Environment-based configuration.
//!
//! Policy knobs (lockout threshold/duration, OTP TTL and retry threshold)
//! are inputs to the data model, never constants inside it. In dev every
//! key falls back to a default; in prod a missing key is an error.

use serde::Deserialize;
use std::env;

use crate::services::error::ServiceError;

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    pub environment: Environment,
    pub log_level: String,
    pub database: DatabaseConfig,
    pub security: SecurityPolicy,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Lockout and OTP policy supplied by the deployment, consumed by
/// `LockoutService` and `IdentityService`.
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityPolicy {
    /// Consecutive failed logins that trigger an account lock.
    pub lockout_threshold: u32,
    /// How long an account or identity stays locked.
    pub lockout_duration_seconds: i64,
    /// Maximum age of an OTP before validators treat it as invalid.
    pub otp_ttl_seconds: i64,
    /// Consecutive wrong OTP submissions that trigger an identity lock.
    pub otp_retry_threshold: u32,
}

impl SecurityPolicy {
    pub fn lockout_duration(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.lockout_duration_seconds)
    }

    pub fn otp_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.otp_ttl_seconds)
    }
}

impl IdentityConfig {
    pub fn from_env() -> Result<Self, ServiceError> {
        dotenvy::dotenv().ok();

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| ServiceError::Config(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = IdentityConfig {
            environment,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            database: DatabaseConfig {
                url: get_env("DATABASE_URL", Some("sqlite://identity.db"), is_prod)?,
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", Some("5"), is_prod)?,
                min_connections: parse_env("DATABASE_MIN_CONNECTIONS", Some("1"), is_prod)?,
            },
            security: SecurityPolicy {
                lockout_threshold: parse_env("LOCKOUT_THRESHOLD", Some("5"), is_prod)?,
                lockout_duration_seconds: parse_env(
                    "LOCKOUT_DURATION_SECONDS",
                    Some("900"),
                    is_prod,
                )?,
                otp_ttl_seconds: parse_env("OTP_TTL_SECONDS", Some("300"), is_prod)?,
                otp_retry_threshold: parse_env("OTP_RETRY_THRESHOLD", Some("3"), is_prod)?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ServiceError> {
        if self.database.url.is_empty() {
            return Err(ServiceError::Config(anyhow::anyhow!(
                "DATABASE_URL must not be empty"
            )));
        }
        if self.database.max_connections == 0 {
            return Err(ServiceError::Config(anyhow::anyhow!(
                "DATABASE_MAX_CONNECTIONS must be greater than 0"
            )));
        }
        if self.security.lockout_threshold == 0 {
            return Err(ServiceError::Config(anyhow::anyhow!(
                "LOCKOUT_THRESHOLD must be greater than 0"
            )));
        }
        if self.security.lockout_duration_seconds <= 0 {
            return Err(ServiceError::Config(anyhow::anyhow!(
                "LOCKOUT_DURATION_SECONDS must be positive"
            )));
        }
        if self.security.otp_ttl_seconds <= 0 {
            return Err(ServiceError::Config(anyhow::anyhow!(
                "OTP_TTL_SECONDS must be positive"
            )));
        }
        if self.security.otp_retry_threshold == 0 {
            return Err(ServiceError::Config(anyhow::anyhow!(
                "OTP_RETRY_THRESHOLD must be greater than 0"
            )));
        }
        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, ServiceError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(ServiceError::Config(anyhow::anyhow!(
                    "{key} is required in production but not set"
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(ServiceError::Config(anyhow::anyhow!(
                    "{key} is required but not set"
                )))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: Option<&str>, is_prod: bool) -> Result<T, ServiceError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env(key, default, is_prod)?
        .parse()
        .map_err(|e: T::Err| ServiceError::Config(anyhow::anyhow!("{key}: {e}")))
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}
