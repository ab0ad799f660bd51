pub mod auth;
pub mod profile;

use crate::api::ErrorResponse;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use libris::auth::AuthError;

/// GET /health
pub async fn health_check() -> &'static str {
    "OK"
}

/// Map a core error onto a status code and a client-safe body. Internal
/// errors are logged in full here and leave only a generic message.
pub(crate) fn auth_error_response(error: AuthError) -> Response {
    let status = match &error {
        AuthError::Validation(_) | AuthError::WrongCurrentPassword => StatusCode::BAD_REQUEST,
        AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthError::UserNotFound => StatusCode::NOT_FOUND,
        AuthError::Conflict => StatusCode::CONFLICT,
        AuthError::Store(_) | AuthError::Serialization(_) | AuthError::PasswordHash(_) => {
            tracing::error!(%error, "internal auth failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(ErrorResponse::new(error.public_message()))).into_response()
}
