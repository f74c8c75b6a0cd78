use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    claims::Role,
    dto::{
        normalize_email, ChangePasswordRequest, LoginData, LoginRequest, ProfileData,
        RegisterRequest, VerifyRequest,
    },
    extractors::Session,
    jwt::JwtKeys,
    otp::OtpPolicy,
    password::{hash_password, verify_password},
    repo::AuthRepository,
    repo_types::{User, UserOtp},
    revocation::RevocationStore,
};
use crate::{
    audit::Audit,
    error::{AppError, DbError},
    notifications::{
        template::{otp_email, OTP_SUBJECT},
        EmailQueue, OutboundEmail,
    },
    response::ApiResponse,
};

/// Registration, sessions, passwords and email verification.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn AuthRepository>,
    jwt: JwtKeys,
    revocations: Arc<dyn RevocationStore>,
    emails: EmailQueue,
    otp: OtpPolicy,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn AuthRepository>,
        jwt: JwtKeys,
        revocations: Arc<dyn RevocationStore>,
        emails: EmailQueue,
        otp: OtpPolicy,
    ) -> Self {
        Self {
            users,
            jwt,
            revocations,
            emails,
            otp,
        }
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<ApiResponse<()>, AppError> {
        if req.password != req.password_confirmation {
            return Ok(ApiResponse::bad_request("Password is not matched"));
        }

        let email = normalize_email(&req.email);
        if self.users.get_user_by_email(&email).await?.is_some() {
            warn!(%email, "register with existing email");
            return Ok(ApiResponse::bad_request("User already exist"));
        }

        let user = User {
            id: Uuid::new_v4(),
            email,
            password_hash: hash_password(&req.password)?,
            full_name: req.full_name.trim().to_string(),
            role_code: Role::User.as_str().to_string(),
            verified_at: None,
            audit: Audit::created_now(req.full_name.trim()),
        };

        match self.users.insert_user(&user).await {
            Ok(()) => {}
            Err(DbError::Constraint(_)) => {
                warn!(email = %user.email, "concurrent registration lost the race");
                return Ok(ApiResponse::bad_request("User already exist"));
            }
            Err(e) => return Err(e.into()),
        }

        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok(ApiResponse::ok("User is registered"))
    }

    /// A wrong password is `Unauthenticated`; an unknown email is a business
    /// not-found.
    pub async fn login(&self, req: LoginRequest) -> Result<ApiResponse<LoginData>, AppError> {
        let email = normalize_email(&req.email);
        let Some(user) = self.users.get_user_by_email(&email).await? else {
            warn!(%email, "login unknown email");
            return Ok(ApiResponse::not_found("User is not registered"));
        };

        if !verify_password(&req.password, &user.password_hash)? {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AppError::Unauthenticated);
        }

        let access_token = self.jwt.sign(&user)?;
        info!(user_id = %user.id, email = %user.email, "user logged in");
        Ok(ApiResponse::success(
            "Login successful",
            LoginData { access_token },
        ))
    }

    /// Denylists the session token for the rest of its lifetime.
    pub async fn logout(&self, session: &Session) -> Result<ApiResponse<()>, AppError> {
        let remaining = session.claims.remaining_secs(OffsetDateTime::now_utc());
        if remaining > 0 {
            self.revocations
                .put(
                    &session.token,
                    std::time::Duration::from_secs(remaining as u64),
                )
                .await;
        }
        info!(user_id = %session.claims.sub, "user logged out");
        Ok(ApiResponse::ok("Logout success"))
    }

    pub async fn change_password(
        &self,
        session: &Session,
        req: ChangePasswordRequest,
    ) -> Result<ApiResponse<()>, AppError> {
        if req.new_password != req.new_password_confirmation {
            return Ok(ApiResponse::bad_request("New password is not matched"));
        }

        let Some(user) = self.users.get_user_by_email(&session.claims.email).await? else {
            return Ok(ApiResponse::bad_request("User does not exist"));
        };

        if !verify_password(&req.old_password, &user.password_hash)? {
            warn!(user_id = %user.id, "change password with wrong old password");
            return Ok(ApiResponse::bad_request("Old password is not matched"));
        }

        let hash = hash_password(&req.new_password)?;
        self.users
            .update_user_password(user.id, &hash, &session.claims.full_name)
            .await?;

        info!(user_id = %user.id, "password changed");
        Ok(ApiResponse::ok("Change password success"))
    }

    pub async fn profile(&self, session: &Session) -> Result<ApiResponse<ProfileData>, AppError> {
        let claims = &session.claims;
        let Some(user) = self.users.get_user_by_email(&claims.email).await? else {
            return Ok(ApiResponse::bad_request("User doesn't exist"));
        };

        Ok(ApiResponse::success(
            "Get Profile success",
            ProfileData {
                user_id: claims.sub,
                full_name: claims.full_name.clone(),
                email: claims.email.clone(),
                role_code: claims.role,
                verified_at: user.verified_at,
                member_since: user.audit.created_at,
            },
        ))
    }

    /// Issues a fresh code unless the previous one is still inside the
    /// resend cooldown. Delivery is queued; its outcome never reaches the caller.
    pub async fn request_otp(&self, session: &Session) -> Result<ApiResponse<()>, AppError> {
        let email = session.claims.email.as_str();
        let now = OffsetDateTime::now_utc();

        if let Some(previous) = self.users.get_otp_by_email(email).await? {
            if let Some(wait) = self.otp.cooldown_remaining(previous.created_at, now) {
                warn!(%email, wait, "otp requested during cooldown");
                return Ok(ApiResponse::bad_request(format!(
                    "Please wait {wait} seconds before requesting a new code"
                )));
            }
        }

        let code = self.otp.generate();
        self.users
            .upsert_otp(&UserOtp {
                email: email.to_string(),
                otp_code: code.clone(),
                expired_at: self.otp.expires_at(now),
                created_at: now,
            })
            .await?;

        let queued = self.emails.enqueue(OutboundEmail {
            to: email.to_string(),
            subject: OTP_SUBJECT.to_string(),
            html: otp_email(&code, self.otp.ttl.whole_minutes()),
        });
        if !queued {
            warn!(%email, "otp email not queued");
        }

        info!(user_id = %session.claims.sub, "otp issued");
        Ok(ApiResponse::ok("Send or Resend OTP success"))
    }

    /// Already-verified users are rejected before the code is looked at, so a
    /// second successful-looking verify always reports "Email already verified".
    pub async fn verify(
        &self,
        session: &Session,
        req: VerifyRequest,
    ) -> Result<ApiResponse<()>, AppError> {
        let email = session.claims.email.as_str();
        let Some(user) = self.users.get_user_by_email(email).await? else {
            return Ok(ApiResponse::bad_request("User doesn't exist"));
        };
        if user.is_verified() {
            return Ok(ApiResponse::bad_request("Email already verified"));
        }

        let Some(otp) = self.users.get_otp_by_email(email).await? else {
            return Ok(ApiResponse::bad_request("OTP not found"));
        };
        let now = OffsetDateTime::now_utc();
        if otp.is_expired(now) {
            return Ok(ApiResponse::bad_request("OTP has expired"));
        }
        if otp.otp_code != req.code_otp.trim() {
            warn!(user_id = %user.id, "incorrect otp");
            return Ok(ApiResponse::bad_request("Incorrect OTP code"));
        }

        self.users.complete_verification(user.id, email, now).await?;
        info!(user_id = %user.id, "email verified");
        Ok(ApiResponse::ok("Verify success"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestApp;

    fn register_req(email: &str, pw: &str, confirm: &str) -> RegisterRequest {
        RegisterRequest {
            full_name: "Alice".into(),
            email: email.into(),
            password: pw.into(),
            password_confirmation: confirm.into(),
        }
    }

    async fn registered_session(app: &TestApp, email: &str, pw: &str) -> Session {
        let auth = &app.state.auth;
        auth.register(register_req(email, pw, pw)).await.unwrap();
        let res = auth
            .login(LoginRequest {
                email: email.into(),
                password: pw.into(),
            })
            .await
            .unwrap();
        let token = res.data.unwrap().access_token;
        let claims = app.state.jwt.verify(&token).unwrap();
        Session { token, claims }
    }

    #[tokio::test]
    async fn register_then_duplicate() {
        let app = TestApp::new();
        let auth = &app.state.auth;

        let first = auth.register(register_req("a@x.com", "pw1", "pw1")).await.unwrap();
        assert!(!first.is_error());
        assert_eq!(first.base.message, "User is registered");

        let again = auth.register(register_req("A@x.com ", "other", "other")).await.unwrap();
        assert!(again.is_error());
        assert_eq!(again.base.message, "User already exist");

        let stored = app.backend.auth().user("a@x.com").unwrap();
        assert_eq!(stored.role_code, "user");
        assert_eq!(stored.audit.created_by, "Alice");
        assert_ne!(stored.password_hash, "pw1");
    }

    #[tokio::test]
    async fn register_rejects_mismatched_confirmation() {
        let app = TestApp::new();
        let res = app
            .state
            .auth
            .register(register_req("a@x.com", "pw1", "pw2"))
            .await
            .unwrap();
        assert_eq!(res.base.status_code, 400);
        assert_eq!(res.base.message, "Password is not matched");
        assert!(app.backend.auth().user("a@x.com").is_none());
    }

    #[tokio::test]
    async fn login_outcomes() {
        let app = TestApp::new();
        let auth = &app.state.auth;
        auth.register(register_req("a@x.com", "pw1", "pw1")).await.unwrap();

        let unknown = auth
            .login(LoginRequest {
                email: "b@x.com".into(),
                password: "pw1".into(),
            })
            .await
            .unwrap();
        assert_eq!(unknown.base.status_code, 404);
        assert_eq!(unknown.base.message, "User is not registered");

        let wrong = auth
            .login(LoginRequest {
                email: "a@x.com".into(),
                password: "nope".into(),
            })
            .await;
        assert!(matches!(wrong, Err(AppError::Unauthenticated)));

        let ok = auth
            .login(LoginRequest {
                email: "A@X.com".into(),
                password: "pw1".into(),
            })
            .await
            .unwrap();
        assert_eq!(ok.base.message, "Login successful");
        let claims = app.state.jwt.verify(&ok.data.unwrap().access_token).unwrap();
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.role, Role::User);
        assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
    }

    #[tokio::test]
    async fn logout_revokes_for_remaining_lifetime() {
        let app = TestApp::new();
        let session = registered_session(&app, "a@x.com", "pw1").await;

        let res = app.state.auth.logout(&session).await.unwrap();
        assert_eq!(res.base.message, "Logout success");
        assert!(app.state.revocations.exists(&session.token).await);
        assert_eq!(app.revocations.len(), 1);
    }

    #[tokio::test]
    async fn logout_of_expired_claims_stores_nothing() {
        let app = TestApp::new();
        let mut session = registered_session(&app, "a@x.com", "pw1").await;
        session.claims.exp = session.claims.iat.saturating_sub(10);

        app.state.auth.logout(&session).await.unwrap();
        assert!(!app.state.revocations.exists(&session.token).await);
    }

    #[tokio::test]
    async fn change_password_flow() {
        let app = TestApp::new();
        let auth = &app.state.auth;
        let session = registered_session(&app, "a@x.com", "old").await;

        let mismatch = auth
            .change_password(
                &session,
                ChangePasswordRequest {
                    old_password: "old".into(),
                    new_password: "new".into(),
                    new_password_confirmation: "other".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(mismatch.base.message, "New password is not matched");

        let wrong_old = auth
            .change_password(
                &session,
                ChangePasswordRequest {
                    old_password: "bad".into(),
                    new_password: "new".into(),
                    new_password_confirmation: "new".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(wrong_old.base.message, "Old password is not matched");

        let ok = auth
            .change_password(
                &session,
                ChangePasswordRequest {
                    old_password: "old".into(),
                    new_password: "new".into(),
                    new_password_confirmation: "new".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(ok.base.message, "Change password success");

        let stored = app.backend.auth().user("a@x.com").unwrap();
        assert!(verify_password("new", &stored.password_hash).unwrap());
        assert_eq!(stored.audit.updated_by.as_deref(), Some("Alice"));
    }

    #[tokio::test]
    async fn profile_reports_claims_and_member_since() {
        let app = TestApp::new();
        let session = registered_session(&app, "a@x.com", "pw").await;

        let res = app.state.auth.profile(&session).await.unwrap();
        assert_eq!(res.base.message, "Get Profile success");
        let profile = res.data.unwrap();
        let stored = app.backend.auth().user("a@x.com").unwrap();
        assert_eq!(profile.user_id, stored.id);
        assert_eq!(profile.full_name, "Alice");
        assert_eq!(profile.role_code, Role::User);
        assert_eq!(profile.member_since, stored.audit.created_at);
        assert_eq!(profile.verified_at, None);
    }

    #[tokio::test]
    async fn otp_cooldown_then_resend_replaces_code() {
        let app = TestApp::new();
        let auth = &app.state.auth;
        let session = registered_session(&app, "a@x.com", "pw").await;

        let first = auth.request_otp(&session).await.unwrap();
        assert_eq!(first.base.message, "Send or Resend OTP success");
        let first_code = app.backend.auth().otp("a@x.com").unwrap();

        let second = auth.request_otp(&session).await.unwrap();
        assert!(second.is_error());
        assert!(second.base.message.starts_with("Please wait "));
        assert!(second.base.message.ends_with(" seconds before requesting a new code"));

        app.backend
            .auth()
            .backdate_otp("a@x.com", time::Duration::seconds(61));
        let third = auth.request_otp(&session).await.unwrap();
        assert!(!third.is_error());
        let replaced = app.backend.auth().otp("a@x.com").unwrap();
        assert!(replaced.created_at > first_code.created_at);
        assert_eq!(replaced.otp_code.len(), 6);
    }

    #[tokio::test]
    async fn otp_email_is_delivered_through_the_queue() {
        let app = TestApp::new();
        let session = registered_session(&app, "a@x.com", "pw").await;
        app.state.auth.request_otp(&session).await.unwrap();
        let code = app.backend.auth().otp("a@x.com").unwrap().otp_code;

        for _ in 0..50 {
            if !app.sender.sent().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        let sent = app.sender.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "a@x.com");
        assert_eq!(sent[0].subject, OTP_SUBJECT);
        assert!(sent[0].html.contains("expires in 5 minutes"));
        for digit in code.chars() {
            assert!(sent[0].html.contains(&format!(">{digit}<")));
        }
    }

    #[tokio::test]
    async fn verify_failures_and_success() {
        let app = TestApp::new();
        let auth = &app.state.auth;
        let session = registered_session(&app, "a@x.com", "pw").await;
        let verify = |code: &str| VerifyRequest {
            code_otp: code.to_string(),
        };

        let none = auth.verify(&session, verify("000000")).await.unwrap();
        assert_eq!(none.base.message, "OTP not found");

        auth.request_otp(&session).await.unwrap();
        let code = app.backend.auth().otp("a@x.com").unwrap().otp_code;
        let wrong = if code == "000000" { "111111" } else { "000000" };
        let incorrect = auth.verify(&session, verify(wrong)).await.unwrap();
        assert_eq!(incorrect.base.message, "Incorrect OTP code");

        let ok = auth.verify(&session, verify(&code)).await.unwrap();
        assert_eq!(ok.base.message, "Verify success");
        assert!(app.backend.auth().user("a@x.com").unwrap().is_verified());
        assert!(app.backend.auth().otp("a@x.com").is_none());

        let twice = auth.verify(&session, verify(&code)).await.unwrap();
        assert_eq!(twice.base.message, "Email already verified");
    }

    #[tokio::test]
    async fn verify_expired_code_fails_even_when_it_matches() {
        let app = TestApp::new();
        let auth = &app.state.auth;
        let session = registered_session(&app, "a@x.com", "pw").await;
        auth.request_otp(&session).await.unwrap();
        let code = app.backend.auth().otp("a@x.com").unwrap().otp_code;

        app.backend
            .auth()
            .backdate_otp("a@x.com", time::Duration::minutes(6));
        let res = auth
            .verify(&session, VerifyRequest { code_otp: code })
            .await
            .unwrap();
        assert_eq!(res.base.message, "OTP has expired");
        assert!(!app.backend.auth().user("a@x.com").unwrap().is_verified());
    }
}
