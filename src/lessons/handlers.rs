use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use validator::Validate;

use super::{dto::ChapterLessonRequest, repo_types::ChapterLessonView};
use crate::{
    auth::extractors::Session,
    db::Backend,
    error::AppError,
    field_mask::FieldsQuery,
    response::{parse_path_id, ApiResponse, EntityId, JsonBody},
    state::AppState,
};

type Reply<T> = Result<Json<ApiResponse<T>>, AppError>;

pub fn routes<B: Backend>() -> Router<AppState<B>> {
    Router::new()
        .route("/lessons", post(create::<B>))
        .route(
            "/lessons/:id",
            get(detail::<B>).put(edit::<B>).delete(delete::<B>),
        )
}

#[instrument(skip(state, session, payload), fields(user_id = %session.claims.sub))]
pub async fn create<B: Backend>(
    State(state): State<AppState<B>>,
    session: Session,
    JsonBody(payload): JsonBody<ChapterLessonRequest>,
) -> Reply<EntityId> {
    if let Err(e) = payload.validate() {
        return Ok(Json(ApiResponse::invalid(&e)));
    }
    Ok(Json(state.lessons.create(&session, payload).await?))
}

#[instrument(skip(state, session), fields(user_id = %session.claims.sub))]
pub async fn detail<B: Backend>(
    State(state): State<AppState<B>>,
    session: Session,
    Path(id): Path<String>,
    Query(query): Query<FieldsQuery>,
) -> Reply<ChapterLessonView> {
    let id = match parse_path_id(&id) {
        Ok(id) => id,
        Err(res) => return Ok(Json(res)),
    };
    Ok(Json(state.lessons.detail(&session, id, &query.names()).await?))
}

#[instrument(skip(state, session, payload), fields(user_id = %session.claims.sub))]
pub async fn edit<B: Backend>(
    State(state): State<AppState<B>>,
    session: Session,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<ChapterLessonRequest>,
) -> Reply<EntityId> {
    let id = match parse_path_id(&id) {
        Ok(id) => id,
        Err(res) => return Ok(Json(res)),
    };
    if let Err(e) = payload.validate() {
        return Ok(Json(ApiResponse::invalid(&e)));
    }
    Ok(Json(state.lessons.edit(&session, id, payload).await?))
}

#[instrument(skip(state, session), fields(user_id = %session.claims.sub))]
pub async fn delete<B: Backend>(
    State(state): State<AppState<B>>,
    session: Session,
    Path(id): Path<String>,
) -> Reply<()> {
    let id = match parse_path_id(&id) {
        Ok(id) => id,
        Err(res) => return Ok(Json(res)),
    };
    Ok(Json(state.lessons.delete(&session, id).await?))
}
