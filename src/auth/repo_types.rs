use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::claims::Role;
use crate::audit::Audit;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    pub full_name: String,
    pub role_code: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub verified_at: Option<OffsetDateTime>,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub audit: Audit,
}

impl User {
    pub fn role(&self) -> anyhow::Result<Role> {
        self.role_code.parse()
    }

    pub fn is_verified(&self) -> bool {
        self.verified_at.is_some()
    }
}

/// Pending verification code; one row per email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserOtp {
    pub email: String,
    pub otp_code: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expired_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl UserOtp {
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now > self.expired_at
    }
}
