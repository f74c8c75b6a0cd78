use axum::Router;

use crate::{db::Backend, state::AppState};

pub mod claims;
pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod otp;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod revocation;
pub mod services;

pub fn router<B: Backend>() -> Router<AppState<B>> {
    handlers::routes()
}
