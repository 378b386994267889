use axum::extract::rejection::JsonRejection;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::warn;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StoreError {
    #[error("a pastie with id {0} already exists")]
    DuplicateId(i64),
    #[error("pastie with id {0} not found")]
    NotFound(i64),
    #[error("pastie id counter has not been initialized")]
    CounterMissing,
    #[error("pastie {0} could not be read back after insert")]
    WriteLost(i64),
    #[error("storage unavailable")]
    Unavailable {
        #[from]
        source: sqlx::Error,
    },
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ApiError {
    #[error("not found")]
    NotFound,
    #[error("unauthorized")]
    Unauthorized,
    #[error("invalid request body: {source}")]
    InvalidBody {
        #[from]
        source: JsonRejection,
    },
    #[error("{source}")]
    Store { source: StoreError },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code = match &self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::InvalidBody { .. } => StatusCode::BAD_REQUEST,
            ApiError::Store { source } => match source {
                StoreError::NotFound(_) => StatusCode::NOT_FOUND,
                StoreError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        };

        if status_code.is_server_error() {
            warn!("request failed: {self:?}");
        }

        let body = Json(json!({
            "error": status_code.canonical_reason().unwrap_or("Error"),
            "details": self.to_string(),
        }));

        if let ApiError::Unauthorized = self {
            return (
                status_code,
                [(header::WWW_AUTHENTICATE, "Basic realm=\"pasties\"")],
                body,
            )
                .into_response();
        }

        (status_code, body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(source: StoreError) -> Self {
        match source {
            StoreError::NotFound(_) => ApiError::NotFound,
            _ => ApiError::Store { source },
        }
    }
}

impl StoreError {
    /// Classify an insert failure, reporting unique-key violations on `id` as
    /// duplicates.
    pub(crate) fn from_insert(source: sqlx::Error, id: i64) -> Self {
        let unique_violation = match &source {
            // sqlite: SQLITE_CONSTRAINT_UNIQUE / SQLITE_CONSTRAINT_PRIMARYKEY
            sqlx::Error::Database(err) => matches!(err.code().as_deref(), Some("2067" | "1555")),
            _ => false,
        };
        if unique_violation {
            StoreError::DuplicateId(id)
        } else {
            StoreError::Unavailable { source }
        }
    }
}
