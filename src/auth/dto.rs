use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use super::claims::Role;

/// Request body for user registration.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Full name is required"))]
    pub full_name: String,
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    #[validate(length(min = 1, message = "Password confirmation is required"))]
    pub password_confirmation: String,
}

/// Request body for login.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Old password is required"))]
    pub old_password: String,
    #[validate(length(min = 1, message = "New password is required"))]
    pub new_password: String,
    #[validate(length(min = 1, message = "New password confirmation is required"))]
    pub new_password_confirmation: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct VerifyRequest {
    #[validate(length(min = 1, message = "OTP code is required"))]
    pub code_otp: String,
}

/// Payload returned after a successful login.
#[derive(Debug, Serialize)]
pub struct LoginData {
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileData {
    pub user_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub role_code: Role,
    #[serde(
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub verified_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub member_since: OffsetDateTime,
}

impl RegisterRequest {
    pub fn check(&self) -> Result<(), ValidationErrors> {
        with_email_check(self.validate(), &self.email)
    }
}

impl LoginRequest {
    pub fn check(&self) -> Result<(), ValidationErrors> {
        with_email_check(self.validate(), &self.email)
    }
}

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email.trim())
}

/// Adds an `email` field error to the derived validation result when the
/// address does not look like one.
fn with_email_check(
    derived: Result<(), ValidationErrors>,
    email: &str,
) -> Result<(), ValidationErrors> {
    let mut errors = derived.err().unwrap_or_default();
    if !is_valid_email(email) {
        let mut err = ValidationError::new("email");
        err.message = Some("Invalid email".into());
        errors.add("email", err);
    }
    if errors.field_errors().is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Trimmed, lowercased email used as the login identifier.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
