//! User model - core profile data and the role assignment.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::AuditStamp;

/// Gender codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
    PreferNotToSay,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
            Gender::PreferNotToSay => "prefer_not_to_say",
        }
    }
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            "prefer_not_to_say" => Ok(Gender::PreferNotToSay),
            _ => Err(format!("Invalid gender code: {}", s)),
        }
    }
}

/// User entity - root of the identity graph.
///
/// References exactly one role (RESTRICT, so a role in use cannot be hard
/// deleted). Credentials live in `user_auth`, contact/login channels in
/// `user_identity`; both are owned and removed by cascade when the user row
/// is hard deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub job_title: Option<String>,
    pub gender: Option<String>,
    pub dob: Option<NaiveDate>,
    pub profile_image_url: Option<String>,
    pub is_active: bool,
    pub role_id: i64,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: AuditStamp,
}

/// Input for creating a user.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewUser {
    #[validate(length(min = 1, max = 64))]
    pub first_name: String,
    #[validate(length(max = 64))]
    pub last_name: Option<String>,
    #[validate(length(max = 128))]
    pub job_title: Option<String>,
    pub gender: Option<Gender>,
    pub dob: Option<NaiveDate>,
    #[validate(length(max = 512))]
    pub profile_image_url: Option<String>,
    pub role_id: i64,
}

impl NewUser {
    pub fn new(first_name: impl Into<String>, role_id: i64) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: None,
            job_title: None,
            gender: None,
            dob: None,
            profile_image_url: None,
            role_id,
        }
    }
}
