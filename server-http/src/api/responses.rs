use libris::auth::{PublicUser, Role, Session, UserStats};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub full_name: String,
}

impl From<PublicUser> for UserResponse {
    fn from(user: PublicUser) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            full_name: user.full_name,
        }
    }
}

/// What the client sees about its own session. The identifier itself stays
/// in the cookie.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    pub user: Option<UserResponse>,
    pub csrf_token: String,
    pub redirect_after_login: Option<String>,
}

impl SessionResponse {
    pub fn from_session(session: &Session) -> Self {
        Self {
            authenticated: session.is_authenticated(),
            user: session
                .identity
                .as_ref()
                .map(|identity| UserResponse::from(identity.public_user())),
            csrf_token: session.csrf_token.clone(),
            redirect_after_login: session.redirect_after_login.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: UserResponse,
    pub csrf_token: String,
    pub redirect_to: String,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_loans: u64,
    pub active_loans: u64,
    pub total_reservations: u64,
    pub reviews_written: u64,
}

impl From<UserStats> for StatsResponse {
    fn from(stats: UserStats) -> Self {
        Self {
            total_loans: stats.total_loans,
            active_loans: stats.active_loans,
            total_reservations: stats.total_reservations,
            reviews_written: stats.reviews_written,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
