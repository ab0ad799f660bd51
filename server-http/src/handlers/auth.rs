use super::auth_error_response;
use crate::api::{
    LoginRequest, LoginResponse, MessageResponse, RegisterRequest, ResetPasswordRequest,
    SessionResponse, UserResponse,
};
use crate::cookies::{append_set_cookie, render_directive, session_cookie};
use crate::state::AppState;
use axum::{
    extract::State,
    response::{IntoResponse, Json, Response},
    Extension,
};
use libris::auth::{ClientInfo, Registration, Session};

fn client_of(session: &Session) -> ClientInfo {
    ClientInfo {
        ip: session.client_ip.clone(),
        user_agent: session.user_agent.clone(),
    }
}

/// POST /auth/login
///
/// On success the session identifier changes, so this handler sets the
/// session cookie itself rather than leaving it to the middleware.
pub async fn login(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(request): Json<LoginRequest>,
) -> Response {
    let client = client_of(&session);

    let outcome = match state
        .auth
        .login(
            session,
            &request.email,
            &request.password,
            request.remember_me,
            &client,
        )
        .await
    {
        Ok(outcome) => outcome,
        Err(error) => return auth_error_response(error),
    };

    // Consume the stashed post-login destination
    let mut session = outcome.session;
    let redirect_to = session
        .redirect_after_login
        .take()
        .unwrap_or_else(|| "/".to_string());
    if let Err(error) = state.auth.sessions().save(&session).await {
        return auth_error_response(error);
    }

    let body = LoginResponse {
        user: UserResponse::from(outcome.user),
        csrf_token: session.csrf_token.clone(),
        redirect_to,
    };

    let mut response = Json(body).into_response();
    append_set_cookie(
        response.headers_mut(),
        &session_cookie(&session.id, state.secure_cookies),
    );
    if let Some(directive) = outcome.remember_cookie {
        append_set_cookie(response.headers_mut(), &render_directive(&directive));
    }
    response
}

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(request): Json<RegisterRequest>,
) -> Response {
    let client = client_of(&session);
    let registration = Registration {
        username: request.username,
        email: request.email,
        password: request.password,
        first_name: request.first_name,
        last_name: request.last_name,
        phone: request.phone,
        address: request.address,
        // Self-service registration never grants elevated roles
        role: None,
    };

    match state.auth.register(registration, &client).await {
        Ok(user) => (
            axum::http::StatusCode::CREATED,
            Json(UserResponse::from(user)),
        )
            .into_response(),
        Err(error) => auth_error_response(error),
    }
}

/// POST /auth/logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Response {
    let client = client_of(&session);

    let outcome = match state.auth.logout(session, &client).await {
        Ok(outcome) => outcome,
        Err(error) => return auth_error_response(error),
    };

    let mut response = Json(MessageResponse::new("Logged out.")).into_response();
    append_set_cookie(
        response.headers_mut(),
        &session_cookie(&outcome.session.id, state.secure_cookies),
    );
    append_set_cookie(
        response.headers_mut(),
        &render_directive(&outcome.clear_remember),
    );
    response
}

/// GET /auth/session
pub async fn session_info(Extension(session): Extension<Session>) -> Json<SessionResponse> {
    Json(SessionResponse::from_session(&session))
}

/// POST /auth/reset-password
///
/// Always answers with the same message; whether the email was on file is
/// not observable from the response.
pub async fn reset_password(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(request): Json<ResetPasswordRequest>,
) -> Response {
    let client = client_of(&session);
    match state.auth.reset_password(&request.email, &client).await {
        Ok(message) => Json(MessageResponse::new(message)).into_response(),
        Err(error) => auth_error_response(error),
    }
}
