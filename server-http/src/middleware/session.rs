use crate::cookies::{
    append_set_cookie, cookie_value, has_set_cookie, render_directive, session_cookie,
    SESSION_COOKIE,
};
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use libris::auth::{ClientInfo, Session, REMEMBER_COOKIE};

/// Extract the caller's IP from proxy headers only
fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("X-Forwarded-For")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .or_else(|| {
            headers
                .get("X-Real-IP")
                .and_then(|h| h.to_str().ok())
                .map(|s| s.to_string())
        })
}

/// Opens or resumes the session for every request and parks it in the
/// request extensions. The session cookie is (re)set on the way out unless
/// a handler already did so itself, which login and logout do after
/// swapping identifiers.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let headers = request.headers();
    let presented = cookie_value(headers, SESSION_COOKIE);
    let remember_token = cookie_value(headers, REMEMBER_COOKIE);
    let client = ClientInfo {
        ip: client_ip(headers),
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|h| h.to_str().ok())
            .map(|s| s.to_string()),
    };

    let (session, clear_remember) = match state
        .auth
        .open_session(presented.as_deref(), remember_token.as_deref(), &client)
        .await
    {
        Ok(opened) => opened,
        Err(error) => {
            tracing::error!(%error, "failed to open session");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let session_id = session.id.clone();
    request.extensions_mut().insert::<Session>(session);

    let mut response = next.run(request).await;

    if !has_set_cookie(response.headers(), SESSION_COOKIE) {
        let cookie = session_cookie(&session_id, state.secure_cookies);
        append_set_cookie(response.headers_mut(), &cookie);
    }
    // A rejected remember-me token is cleared so the browser stops
    // presenting it on every request. A handler that issued a fresh token
    // on this same request (login with a stale cookie) wins.
    if let Some(directive) = clear_remember {
        if !has_set_cookie(response.headers(), REMEMBER_COOKIE) {
            append_set_cookie(response.headers_mut(), &render_directive(&directive));
        }
    }

    response
}
