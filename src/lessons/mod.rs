use axum::Router;

use crate::{db::Backend, state::AppState};

pub mod dto;
pub mod handlers;
pub mod repo_types;
pub mod services;

pub fn router<B: Backend>() -> Router<AppState<B>> {
    handlers::routes()
}
