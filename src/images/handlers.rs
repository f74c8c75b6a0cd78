use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use tracing::{instrument, warn};
use uuid::Uuid;

use super::services::{ImageKind, UploadRejection, UploadedImage};
use crate::{
    auth::extractors::Session,
    db::Backend,
    error::AppError,
    policy::Operation,
    response::{ApiResponse, BaseResponse, ValidationError},
    state::AppState,
};

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn upload_routes<B: Backend>() -> Router<AppState<B>> {
    Router::new()
        .route("/courses/upload", post(upload_course_image::<B>))
        .route("/stores/upload", post(upload_store_image::<B>))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// Public file serving, mounted outside the API prefix.
pub fn file_routes<B: Backend>() -> Router<AppState<B>> {
    Router::new().route("/storage/:id/:kind/:filename", get(serve_image::<B>))
}

#[instrument(skip_all, fields(user_id = %session.claims.sub))]
pub async fn upload_course_image<B: Backend>(
    State(state): State<AppState<B>>,
    session: Session,
    mp: Multipart,
) -> Result<Json<ApiResponse<UploadedImage>>, AppError> {
    state
        .policy
        .authorize(Operation::UploadCourseImage, &session)?;
    upload(&state, ImageKind::Course, "course_id", mp).await
}

#[instrument(skip_all, fields(user_id = %session.claims.sub))]
pub async fn upload_store_image<B: Backend>(
    State(state): State<AppState<B>>,
    session: Session,
    mp: Multipart,
) -> Result<Json<ApiResponse<UploadedImage>>, AppError> {
    state
        .policy
        .authorize(Operation::UploadStoreImage, &session)?;
    upload(&state, ImageKind::Store, "store_id", mp).await
}

struct ImagePart {
    file_name: String,
    content_type: String,
    body: Bytes,
}

/// Reads the `image` part and the optional `{kind}_id` text field.
async fn upload<B: Backend>(
    state: &AppState<B>,
    kind: ImageKind,
    id_field: &'static str,
    mut mp: Multipart,
) -> Result<Json<ApiResponse<UploadedImage>>, AppError> {
    let mut raw_id: Option<String> = None;
    let mut image: Option<ImagePart> = None;

    loop {
        let field = match mp.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "malformed multipart body");
                return Ok(Json(ApiResponse::bad_request(e.body_text())));
            }
        };
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let body = match field.bytes().await {
                    Ok(body) => body,
                    Err(e) => {
                        warn!(error = %e, "image part unreadable");
                        return Ok(Json(ApiResponse::bad_request(e.body_text())));
                    }
                };
                image = Some(ImagePart {
                    file_name,
                    content_type,
                    body,
                });
            }
            name if name == id_field => {
                raw_id = field.text().await.ok().map(|s| s.trim().to_string());
            }
            _ => {}
        }
    }

    let id = match raw_id.as_deref().filter(|s| !s.is_empty()) {
        None => None,
        Some(raw) => match Uuid::parse_str(raw) {
            Ok(id) => Some(id),
            Err(_) => {
                return Ok(Json(ApiResponse::from_base(BaseResponse::validation(vec![
                    ValidationError {
                        field: id_field.into(),
                        message: "Invalid id".into(),
                    },
                ]))));
            }
        },
    };

    let Some(image) = image else {
        return Ok(Json(ApiResponse::bad_request(
            UploadRejection::MissingImage.message(),
        )));
    };

    let uploaded = state
        .images
        .upload(kind, id, &image.file_name, &image.content_type, image.body)
        .await?;
    Ok(Json(match uploaded {
        Ok(uploaded) => ApiResponse::success("Upload success", uploaded),
        Err(rejection) => ApiResponse::bad_request(rejection.message()),
    }))
}

#[instrument(skip(state))]
pub async fn serve_image<B: Backend>(
    State(state): State<AppState<B>>,
    Path((id, kind, filename)): Path<(String, String, String)>,
) -> Result<Response, AppError> {
    let (Ok(id), Ok(kind)) = (Uuid::parse_str(&id), kind.parse::<ImageKind>()) else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };

    match state.images.fetch(id, kind, &filename).await? {
        Some((body, content_type)) => {
            Ok(([(header::CONTENT_TYPE, content_type)], body).into_response())
        }
        None => Ok(StatusCode::NOT_FOUND.into_response()),
    }
}
