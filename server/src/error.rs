//! Maps `note_core::NoteError` onto HTTP responses, per spec §6/§7. A
//! newtype is required since neither the trait nor the error type lives in
//! this crate.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use note_core::NoteError;
use tracing::error;
use tracing::warn;

use crate::dto::ConflictResponse;
use crate::dto::ErrorResponse;

pub struct AppError(pub NoteError);

impl From<NoteError> for AppError {
    fn from(err: NoteError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self.0 {
            NoteError::Conflict { title, detail } => {
                warn!(title, "save rejected: conflict");
                (
                    StatusCode::CONFLICT,
                    Json(ConflictResponse {
                        error_code: "NOTE_CONFLICT",
                        message: format!("note '{title}' was modified by someone else"),
                        conflict_data: *detail,
                    }),
                )
                    .into_response()
            }
            NoteError::NotFound(title) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse { detail: format!("note '{title}' not found") }))
                    .into_response()
            }
            NoteError::Validation(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { detail: message })).into_response()
            }
            NoteError::Io(message) => {
                error!(message, "storage unavailable");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse { detail: "storage unavailable".to_string() }))
                    .into_response()
            }
            NoteError::Internal(message) => {
                error!(message, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse { detail: "internal error".to_string() }))
                    .into_response()
            }
        }
    }
}
