use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use validator::Validate;

use super::{
    dto::{
        ChangePasswordRequest, LoginData, LoginRequest, ProfileData, RegisterRequest,
        VerifyRequest,
    },
    extractors::Session,
};
use crate::{
    db::Backend,
    error::AppError,
    response::{ApiResponse, JsonBody},
    state::AppState,
};

type Reply<T> = Result<Json<ApiResponse<T>>, AppError>;

pub fn routes<B: Backend>() -> Router<AppState<B>> {
    Router::new()
        .route("/auth/register", post(register::<B>))
        .route("/auth/login", post(login::<B>))
        .route("/auth/logout", post(logout::<B>))
        .route("/auth/change-password", post(change_password::<B>))
        .route("/auth/profile", get(profile::<B>))
        .route("/auth/otp", post(request_otp::<B>))
        .route("/auth/verify", post(verify::<B>))
}

#[instrument(skip(state, payload))]
pub async fn register<B: Backend>(
    State(state): State<AppState<B>>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> Reply<()> {
    if let Err(e) = payload.check() {
        return Ok(Json(ApiResponse::invalid(&e)));
    }
    Ok(Json(state.auth.register(payload).await?))
}

#[instrument(skip(state, payload))]
pub async fn login<B: Backend>(
    State(state): State<AppState<B>>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Reply<LoginData> {
    if let Err(e) = payload.check() {
        return Ok(Json(ApiResponse::invalid(&e)));
    }
    Ok(Json(state.auth.login(payload).await?))
}

#[instrument(skip_all, fields(user_id = %session.claims.sub))]
pub async fn logout<B: Backend>(State(state): State<AppState<B>>, session: Session) -> Reply<()> {
    Ok(Json(state.auth.logout(&session).await?))
}

#[instrument(skip_all, fields(user_id = %session.claims.sub))]
pub async fn change_password<B: Backend>(
    State(state): State<AppState<B>>,
    session: Session,
    JsonBody(payload): JsonBody<ChangePasswordRequest>,
) -> Reply<()> {
    if let Err(e) = payload.validate() {
        return Ok(Json(ApiResponse::invalid(&e)));
    }
    Ok(Json(state.auth.change_password(&session, payload).await?))
}

#[instrument(skip_all, fields(user_id = %session.claims.sub))]
pub async fn profile<B: Backend>(
    State(state): State<AppState<B>>,
    session: Session,
) -> Reply<ProfileData> {
    Ok(Json(state.auth.profile(&session).await?))
}

#[instrument(skip_all, fields(user_id = %session.claims.sub))]
pub async fn request_otp<B: Backend>(
    State(state): State<AppState<B>>,
    session: Session,
) -> Reply<()> {
    Ok(Json(state.auth.request_otp(&session).await?))
}

#[instrument(skip_all, fields(user_id = %session.claims.sub))]
pub async fn verify<B: Backend>(
    State(state): State<AppState<B>>,
    session: Session,
    JsonBody(payload): JsonBody<VerifyRequest>,
) -> Reply<()> {
    if let Err(e) = payload.validate() {
        return Ok(Json(ApiResponse::invalid(&e)));
    }
    Ok(Json(state.auth.verify(&session, payload).await?))
}
