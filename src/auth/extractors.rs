use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::warn;

use super::claims::Claims;
use crate::{db::Backend, error::AppError, state::AppState};

/// Authenticated caller: the raw bearer token and its verified claims.
///
/// Rejects with `Unauthenticated` when the header is missing, the token does
/// not verify, or the token was revoked by logout.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub claims: Claims,
}

#[async_trait]
impl<B: Backend> FromRequestParts<AppState<B>> for Session {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<B>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(AppError::Unauthenticated)?;

        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::Unauthenticated)?;

        let claims = state.jwt.verify(token).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            AppError::Unauthenticated
        })?;

        if state.revocations.exists(token).await {
            warn!(user_id = %claims.sub, "revoked token used");
            return Err(AppError::Unauthenticated);
        }

        Ok(Session {
            token: token.to_string(),
            claims,
        })
    }
}
