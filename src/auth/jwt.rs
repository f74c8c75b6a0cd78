use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{format_description::well_known::Rfc3339, Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use super::{claims::Claims, repo_types::User};
use crate::{config::JwtConfig, db::Backend, state::AppState};

/// HS256 signing and verification keys plus the claim constants they enforce.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl<B: Backend> FromRef<AppState<B>> for JwtKeys {
    fn from_ref(state: &AppState<B>) -> Self {
        state.jwt.clone()
    }
}

impl JwtKeys {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            ttl: Duration::from_secs(config.ttl_minutes.max(1) as u64 * 60),
        }
    }

    /// Mints a session token for `user`, valid for the configured TTL from now.
    pub fn sign(&self, user: &User) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let verified_at = user
            .verified_at
            .map(|at| at.format(&Rfc3339))
            .transpose()?;
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            role: user.role()?,
            verified_at,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user.id, role = %claims.role, "jwt signed");
        Ok(token)
    }

    /// Checks signature, expiry, issuer and audience. No clock leeway: a
    /// token past `exp` is rejected, matching the revocation TTL.
    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{audit::Audit, auth::claims::Role};
    use uuid::Uuid;

    fn config(issuer: &str, audience: &str) -> JwtConfig {
        JwtConfig {
            secret: "dev-secret".into(),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl_minutes: 24 * 60,
        }
    }

    fn user(verified: bool) -> User {
        User {
            id: Uuid::new_v4(),
            email: "a@x.com".into(),
            password_hash: "unused".into(),
            full_name: "Alice".into(),
            role_code: "owner".into(),
            verified_at: verified.then(OffsetDateTime::now_utc),
            audit: Audit::created_now("Alice"),
        }
    }

    #[test]
    fn sign_and_verify_session_token() {
        let keys = JwtKeys::new(&config("lms", "lms-users"));
        let user = user(false);
        let token = keys.sign(&user).expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.full_name, "Alice");
        assert_eq!(claims.role, Role::Owner);
        assert_eq!(claims.verified_at, None);
        assert_eq!(claims.iss, "lms");
        assert_eq!(claims.aud, "lms-users");
    }

    #[test]
    fn token_expires_a_day_after_issue() {
        let keys = JwtKeys::new(&config("lms", "lms-users"));
        let claims = keys.verify(&keys.sign(&user(true)).unwrap()).unwrap();
        assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
        assert!(claims.verified_at.is_some());
    }

    #[test]
    fn verify_rejects_wrong_issuer_or_audience() {
        let good = JwtKeys::new(&config("good-iss", "good-aud"));
        let bad = JwtKeys::new(&config("bad-iss", "bad-aud"));
        let token = good.sign(&user(false)).unwrap();
        assert!(bad.verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_token_just_past_expiry() {
        let keys = JwtKeys::new(&config("lms", "lms-users"));
        let user = user(false);
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            role: Role::Owner,
            verified_at: None,
            iat: (now - 3600) as usize,
            exp: (now - 30) as usize,
            iss: "lms".into(),
            aud: "lms-users".into(),
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).unwrap();
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_tampered_token() {
        let keys = JwtKeys::new(&config("lms", "lms-users"));
        let mut token = keys.sign(&user(false)).unwrap();
        token.push('x');
        assert!(keys.verify(&token).is_err());
    }
}
