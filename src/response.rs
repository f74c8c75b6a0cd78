use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;
use validator::ValidationErrors;

/// One structural problem with a request field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

/// Result envelope carried by every response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseResponse {
    pub status_code: u16,
    pub message: String,
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_errors: Vec<ValidationError>,
}

impl BaseResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status_code: 200,
            message: message.into(),
            is_error: false,
            validation_errors: Vec::new(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status_code: 400,
            message: message.into(),
            is_error: true,
            validation_errors: Vec::new(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status_code: 404,
            message: message.into(),
            is_error: true,
            validation_errors: Vec::new(),
        }
    }

    pub fn validation(validation_errors: Vec<ValidationError>) -> Self {
        Self {
            status_code: 400,
            message: "Validation error".into(),
            is_error: true,
            validation_errors,
        }
    }
}

/// Payload of create and edit calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityId {
    pub id: Uuid,
}

/// Envelope plus the endpoint-specific payload, flattened next to `base`.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub base: BaseResponse,
    #[serde(flatten)]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            base: BaseResponse::success(message),
            data: Some(data),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::from_base(BaseResponse::bad_request(message))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::from_base(BaseResponse::not_found(message))
    }

    pub fn invalid(errors: &ValidationErrors) -> Self {
        Self::from_base(BaseResponse::validation(validation_errors(errors)))
    }

    pub fn from_base(base: BaseResponse) -> Self {
        Self { base, data: None }
    }

    #[cfg(test)]
    pub fn is_error(&self) -> bool {
        self.base.is_error
    }
}

impl ApiResponse<()> {
    pub fn ok(message: impl Into<String>) -> Self {
        Self::from_base(BaseResponse::success(message))
    }
}

/// Parses a path identifier; a malformed one becomes a validation error on `id`.
pub fn parse_path_id<T>(raw: &str) -> Result<Uuid, ApiResponse<T>> {
    Uuid::parse_str(raw.trim()).map_err(|_| {
        ApiResponse::from_base(BaseResponse::validation(vec![ValidationError {
            field: "id".into(),
            message: "Invalid id".into(),
        }]))
    })
}

/// JSON request body whose decode failures become a validation envelope
/// (HTTP 200) instead of a plain-text rejection.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Json<ApiResponse<()>>;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => {
                let error = body_error(&rejection);
                warn!(field = %error.field, reason = %error.message, "request body rejected");
                Err(Json(ApiResponse::from_base(BaseResponse::validation(vec![
                    error,
                ]))))
            }
        }
    }
}

const DATA_ERROR_PREFIX: &str = "Failed to deserialize the JSON body into the target type: ";

/// Field path and reason of a body rejection; anything not tied to one field
/// is reported on `body`.
fn body_error(rejection: &JsonRejection) -> ValidationError {
    let text = rejection.body_text();
    if let JsonRejection::JsonDataError(_) = rejection {
        let detail = text.strip_prefix(DATA_ERROR_PREFIX).unwrap_or(&text);
        if let Some((path, reason)) = detail.split_once(": ") {
            if !path.is_empty() && path != "." && !path.contains(' ') {
                return ValidationError {
                    field: path.to_string(),
                    message: reason.to_string(),
                };
            }
        }
    }
    ValidationError {
        field: "body".into(),
        message: text,
    }
}

/// Flattens `validator` output into field/message pairs, sorted by field.
pub fn validation_errors(errors: &ValidationErrors) -> Vec<ValidationError> {
    let mut out: Vec<ValidationError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            let field = field.to_string();
            errs.iter().map(move |e| ValidationError {
                field: field.clone(),
                message: e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string()),
            })
        })
        .collect();
    out.sort_by(|a, b| a.field.cmp(&b.field).then(a.message.cmp(&b.message)));
    out
}
