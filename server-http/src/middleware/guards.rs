use crate::api::ErrorResponse;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use libris::auth::AccessDecision;

/// Turn a guard verdict into an early response. Anonymous callers get a
/// 303 to the login page, authenticated-but-unentitled callers a 403.
pub fn enforce(decision: AccessDecision) -> Result<(), Response> {
    match decision {
        AccessDecision::Allowed => Ok(()),
        AccessDecision::RedirectTo(url) => Err((
            StatusCode::SEE_OTHER,
            [(header::LOCATION, url)],
            Json(ErrorResponse::new("Authentication required")),
        )
            .into_response()),
        AccessDecision::Forbidden => Err((
            StatusCode::FORBIDDEN,
            Json(ErrorResponse::new("Forbidden")),
        )
            .into_response()),
    }
}
