//! Identity model - email/mobile/OAuth channels with OTP verification state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::AuditStamp;

/// Identity channel codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityType {
    Email,
    Mobile,
    Oauth,
}

impl IdentityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityType::Email => "email",
            IdentityType::Mobile => "mobile",
            IdentityType::Oauth => "oauth",
        }
    }
}

impl std::str::FromStr for IdentityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "email" => Ok(IdentityType::Email),
            "mobile" => Ok(IdentityType::Mobile),
            "oauth" => Ok(IdentityType::Oauth),
            _ => Err(format!("Invalid identity type: {}", s)),
        }
    }
}

/// One contact/login channel belonging to a user.
///
/// The triple (type, value, oauth_provider) is globally unique, so an email
/// address, phone number, or OAuth subject can be claimed by at most one
/// identity row. `oauth_provider` is set only for `type = oauth`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserIdentity {
    pub id: i64,
    pub user_id: i64,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub identity_type: String,
    pub value: String,
    pub is_verified: Option<bool>,
    pub is_primary: Option<bool>,
    pub oauth_provider: Option<String>,
    pub otp_code: Option<String>,
    pub otp_generated_at: Option<DateTime<Utc>>,
    pub wrong_otp_count: i64,
    pub otp_locked_until: Option<DateTime<Utc>>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: AuditStamp,
}

impl UserIdentity {
    /// Whether OTP attempts are locked out at `now`. Expiry is evaluated
    /// lazily; a past `otp_locked_until` means attempts are allowed again.
    pub fn is_otp_locked(&self, now: DateTime<Utc>) -> bool {
        matches!(self.otp_locked_until, Some(until) if until > now)
    }

    /// Whether this identity has been verified (OTP or OAuth).
    pub fn is_verified(&self) -> bool {
        self.is_verified.unwrap_or(false)
    }

    /// Whether this is the user's primary channel of its type.
    pub fn is_primary(&self) -> bool {
        self.is_primary.unwrap_or(false)
    }
}

/// Input for creating an identity.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewUserIdentity {
    pub user_id: i64,
    #[serde(rename = "type")]
    pub identity_type: IdentityType,
    #[validate(length(min = 1, max = 191))]
    pub value: String,
    #[validate(length(min = 1, max = 50))]
    pub oauth_provider: Option<String>,
}

impl NewUserIdentity {
    pub fn email(user_id: i64, value: impl Into<String>) -> Self {
        Self {
            user_id,
            identity_type: IdentityType::Email,
            value: value.into(),
            oauth_provider: None,
        }
    }

    pub fn mobile(user_id: i64, value: impl Into<String>) -> Self {
        Self {
            user_id,
            identity_type: IdentityType::Mobile,
            value: value.into(),
            oauth_provider: None,
        }
    }

    pub fn oauth(user_id: i64, provider: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            user_id,
            identity_type: IdentityType::Oauth,
            value: subject.into(),
            oauth_provider: Some(provider.into()),
        }
    }
}
