use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Failures raised below the service layer by a persistence backend.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("transaction already finished")]
    TransactionClosed,

    #[error("row serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DbError {
    /// Maps unique/foreign-key violations to `Constraint`, everything else to `Sqlx`.
    pub fn from_insert(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db)
                if db.is_unique_violation() || db.is_foreign_key_violation() =>
            {
                DbError::Constraint(db.message().to_string())
            }
            _ => DbError::Sqlx(err),
        }
    }
}

/// Fatal call failures. Business outcomes never use this type; they travel in
/// the response envelope instead.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthenticated")]
    Unauthenticated,

    #[error(transparent)]
    Database(#[from] DbError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorBody {
            error: &'static str,
        }

        let (status, message) = match &self {
            AppError::Unauthenticated => (StatusCode::UNAUTHORIZED, "Unauthenticated"),
            AppError::Database(e) => {
                error!(error = %e, "database failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            AppError::Internal(e) => {
                error!(error = %e, "internal failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
