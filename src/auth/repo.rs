use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{User, UserOtp};
use crate::error::DbError;

/// Users and their pending verification codes.
#[async_trait]
pub trait AuthRepository: Send + Sync {
    /// Live (not soft-deleted) user with this email.
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DbError>;
    async fn insert_user(&self, user: &User) -> Result<(), DbError>;
    async fn update_user_password(
        &self,
        user_id: Uuid,
        password_hash: &str,
        updated_by: &str,
    ) -> Result<(), DbError>;

    /// Inserts or replaces the single code kept per email.
    async fn upsert_otp(&self, otp: &UserOtp) -> Result<(), DbError>;
    async fn get_otp_by_email(&self, email: &str) -> Result<Option<UserOtp>, DbError>;

    /// Sets `verified_at` and consumes the email's code atomically.
    async fn complete_verification(
        &self,
        user_id: Uuid,
        email: &str,
        verified_at: OffsetDateTime,
    ) -> Result<(), DbError>;
}

pub struct PgAuthRepository {
    pool: PgPool,
}

impl PgAuthRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthRepository for PgAuthRepository {
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, full_name, role_code, verified_at,
                   created_at, created_by, updated_at, updated_by, deleted_at, deleted_by
            FROM users
            WHERE email = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn insert_user(&self, user: &User) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, full_name, role_code, created_at, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(&user.role_code)
        .bind(user.audit.created_at)
        .bind(&user.audit.created_by)
        .execute(&self.pool)
        .await
        .map_err(DbError::from_insert)?;
        Ok(())
    }

    async fn update_user_password(
        &self,
        user_id: Uuid,
        password_hash: &str,
        updated_by: &str,
    ) -> Result<(), DbError> {
        sqlx::query(
            r#"
            UPDATE users SET password_hash = $1, updated_at = $2, updated_by = $3
            WHERE id = $4 AND deleted_at IS NULL
            "#,
        )
        .bind(password_hash)
        .bind(OffsetDateTime::now_utc())
        .bind(updated_by)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_otp(&self, otp: &UserOtp) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO user_otps (email, otp_code, expired_at, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email)
            DO UPDATE SET otp_code = EXCLUDED.otp_code,
                          expired_at = EXCLUDED.expired_at,
                          created_at = EXCLUDED.created_at
            "#,
        )
        .bind(&otp.email)
        .bind(&otp.otp_code)
        .bind(otp.expired_at)
        .bind(otp.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_otp_by_email(&self, email: &str) -> Result<Option<UserOtp>, DbError> {
        let otp = sqlx::query_as::<_, UserOtp>(
            "SELECT email, otp_code, expired_at, created_at FROM user_otps WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(otp)
    }

    async fn complete_verification(
        &self,
        user_id: Uuid,
        email: &str,
        verified_at: OffsetDateTime,
    ) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE users SET verified_at = $1 WHERE id = $2 AND verified_at IS NULL")
            .bind(verified_at)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM user_otps WHERE email = $1")
            .bind(email)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}
