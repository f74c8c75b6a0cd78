use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Caller role. Exactly one role is accepted per protected operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(alias = "Owner")]
    Owner,
    #[serde(alias = "Instructor")]
    Instructor,
    #[serde(alias = "User")]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Instructor => "instructor",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "owner" => Ok(Role::Owner),
            "instructor" => Ok(Role::Instructor),
            "user" => Ok(Role::User),
            other => anyhow::bail!("unknown role code: {other}"),
        }
    }
}

/// JWT payload of a session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: Uuid,         // user ID
    pub email: String,
    pub full_name: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<String>, // RFC 3339
    pub iat: usize,        // issued at (unix timestamp)
    pub exp: usize,        // expires at (unix timestamp)
    pub iss: String,
    pub aud: String,
}

impl Claims {
    /// Seconds the token stays valid after `now`; zero or negative once expired.
    pub fn remaining_secs(&self, now: OffsetDateTime) -> i64 {
        self.exp as i64 - now.unix_timestamp()
    }
}
