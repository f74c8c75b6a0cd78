use std::{path::PathBuf, str::FromStr};

use anyhow::Context;

use crate::auth::otp::OtpPolicy;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub from: String,
    pub tls: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Local,
    S3,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(StorageBackend::Local),
            "s3" | "minio" => Ok(StorageBackend::S3),
            other => anyhow::bail!("unknown STORAGE_BACKEND: {other}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub root: PathBuf,
    /// Public base URL that image links are built from.
    pub service_url: String,
    pub minio_endpoint: String,
    pub minio_bucket: String,
    pub minio_access_key: String,
    pub minio_secret_key: String,
}

#[derive(Debug, Clone)]
pub struct OtpConfig {
    pub length: usize,
    pub ttl_seconds: i64,
    pub cooldown_seconds: i64,
}

impl OtpConfig {
    pub fn policy(&self) -> OtpPolicy {
        OtpPolicy {
            length: self.length,
            ttl: time::Duration::seconds(self.ttl_seconds),
            cooldown: time::Duration::seconds(self.cooldown_seconds),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmailQueueConfig {
    pub capacity: usize,
    pub retry_max_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub smtp: SmtpConfig,
    pub storage: StorageConfig,
    pub otp: OtpConfig,
    pub email_queue: EmailQueueConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; required keys are
    /// `DATABASE_URL` and `JWT_SECRET`.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let database_url = lookup("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt = JwtConfig {
            secret: lookup("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: get("JWT_ISSUER", "lms-backend"),
            audience: get("JWT_AUDIENCE", "lms-users"),
            ttl_minutes: number(&lookup, "JWT_TTL_MINUTES", 24 * 60)?,
        };
        let smtp = SmtpConfig {
            host: get("SMTP_HOST", "localhost"),
            port: number(&lookup, "SMTP_PORT", 587)?,
            user: get("SMTP_USER", ""),
            password: get("SMTP_PASSWORD", ""),
            from: get("SMTP_FROM", "LMS <no-reply@lms.local>"),
            tls: get("SMTP_TLS", "true").eq_ignore_ascii_case("true"),
        };
        let storage = StorageConfig {
            backend: get("STORAGE_BACKEND", "local").parse()?,
            root: PathBuf::from(get("STORAGE_ROOT", "storage")),
            service_url: get("STORAGE_SERVICE_URL", "http://localhost:8080/storage")
                .trim_end_matches('/')
                .to_string(),
            minio_endpoint: get("MINIO_ENDPOINT", "http://localhost:9000"),
            minio_bucket: get("MINIO_BUCKET", "lms"),
            minio_access_key: get("MINIO_ACCESS_KEY", "minioadmin"),
            minio_secret_key: get("MINIO_SECRET_KEY", "minioadmin"),
        };
        let otp = OtpConfig {
            length: number(&lookup, "OTP_LENGTH", 6)?,
            ttl_seconds: number(&lookup, "OTP_TTL_SECONDS", 5 * 60)?,
            cooldown_seconds: number(&lookup, "OTP_COOLDOWN_SECONDS", 60)?,
        };
        let email_queue = EmailQueueConfig {
            capacity: number(&lookup, "EMAIL_QUEUE_CAPACITY", 256)?,
            retry_max_seconds: number(&lookup, "EMAIL_RETRY_MAX_SECONDS", 120)?,
        };

        Ok(Self {
            database_url,
            host: get("APP_HOST", "0.0.0.0"),
            port: number(&lookup, "APP_PORT", 8080)?,
            jwt,
            smtp,
            storage,
            otp,
            email_queue,
        })
    }
}

fn number<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a number, got {raw:?}")),
        None => Ok(default),
    }
}
