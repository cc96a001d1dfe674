//! Maps engine- and transport-level errors onto HTTP status codes
//! and the `{code, message}` envelope every error response carries.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pe_engine::EngineError;
use serde_json::json;

pub enum ApiError {
    Engine(EngineError),
    /// A query-string or path value the route couldn't parse (e.g. an
    /// unknown `status` filter or a malformed `version`). Not part of the
    /// engine's own error taxonomy since it never reaches the engine.
    BadRequest(String),
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        Self::Engine(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "code": "VALIDATION_ERROR", "message": message })),
            )
                .into_response(),
            ApiError::Engine(err) => {
                let status = match &err {
                    EngineError::NotFound(_) => StatusCode::NOT_FOUND,
                    EngineError::StateForbidden(_) => StatusCode::CONFLICT,
                    EngineError::Validation(_) => StatusCode::BAD_REQUEST,
                    EngineError::Unauthorized(_) => StatusCode::FORBIDDEN,
                    EngineError::Store(_) | EngineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };

                let body = match &err {
                    EngineError::Validation(issues) => json!({
                        "code": err.error_code().to_string(),
                        "message": err.to_string(),
                        "issues": issues,
                    }),
                    _ => json!({
                        "code": err.error_code().to_string(),
                        "message": err.to_string(),
                    }),
                };

                (status, Json(body)).into_response()
            }
        }
    }
}
