use super::auth_error_response;
use crate::api::{
    ChangePasswordRequest, MessageResponse, StatsResponse, UpdateProfileRequest, UserResponse,
};
use crate::middleware::enforce;
use crate::state::AppState;
use axum::{
    extract::State,
    response::{IntoResponse, Json, Response},
    Extension,
};
use libris::auth::{ClientInfo, ProfileUpdate, Session};

fn client_of(session: &Session) -> ClientInfo {
    ClientInfo {
        ip: session.client_ip.clone(),
        user_agent: session.user_agent.clone(),
    }
}

async fn require_login(
    state: &AppState,
    session: &mut Session,
) -> Result<(), Response> {
    let decision = state
        .auth
        .require_login(session, None)
        .await
        .map_err(auth_error_response)?;
    enforce(decision)
}

/// PUT /profile
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(mut session): Extension<Session>,
    Json(request): Json<UpdateProfileRequest>,
) -> Response {
    if let Err(response) = require_login(&state, &mut session).await {
        return response;
    }

    let client = client_of(&session);
    let update = ProfileUpdate {
        first_name: request.first_name,
        last_name: request.last_name,
        phone: request.phone,
        address: request.address,
    };

    match state
        .auth
        .update_profile(&mut session, update, &client)
        .await
    {
        Ok(user) => Json(UserResponse::from(user)).into_response(),
        Err(error) => auth_error_response(error),
    }
}

/// PUT /profile/password
pub async fn change_password(
    State(state): State<AppState>,
    Extension(mut session): Extension<Session>,
    Json(request): Json<ChangePasswordRequest>,
) -> Response {
    if let Err(response) = require_login(&state, &mut session).await {
        return response;
    }

    let client = client_of(&session);
    match state
        .auth
        .change_password(
            &session,
            &request.current_password,
            &request.new_password,
            &client,
        )
        .await
    {
        Ok(()) => Json(MessageResponse::new("Password updated.")).into_response(),
        Err(error) => auth_error_response(error),
    }
}

/// GET /profile/stats
pub async fn stats(
    State(state): State<AppState>,
    Extension(mut session): Extension<Session>,
) -> Response {
    if let Err(response) = require_login(&state, &mut session).await {
        return response;
    }

    // require_login guarantees an identity is present
    let Some(user_id) = session.user_id().map(|id| id.to_string()) else {
        return auth_error_response(libris::auth::AuthError::UserNotFound);
    };

    let stats = state.auth.user_stats(&user_id).await;
    Json(StatsResponse::from(stats)).into_response()
}
