use super::error::AuthError;
use super::models::{StoredToken, User};
use super::repository::UserRepository;
use super::session::generate_token;
use chrono::{Duration, Utc};
use std::sync::Arc;

/// Cookie the remember-me token travels in.
pub const REMEMBER_COOKIE: &str = "remember_token";

const DEFAULT_TTL_DAYS: i64 = 30;

/// A cookie the HTTP surface should set or clear. The core stays transport
/// agnostic; rendering a Set-Cookie header is the server's job.
#[derive(Debug, Clone, PartialEq)]
pub struct CookieDirective {
    pub name: &'static str,
    pub value: String,
    /// Zero means delete the cookie now
    pub max_age_secs: u64,
    pub path: &'static str,
    pub http_only: bool,
    pub secure: bool,
}

impl CookieDirective {
    fn store(value: String, max_age_secs: u64) -> Self {
        Self {
            name: REMEMBER_COOKIE,
            value,
            max_age_secs,
            path: "/",
            http_only: true,
            secure: true,
        }
    }

    pub fn clear() -> Self {
        Self::store(String::new(), 0)
    }

    pub fn is_removal(&self) -> bool {
        self.max_age_secs == 0
    }
}

/// Outcome of presenting a remember-me token.
#[derive(Debug)]
pub enum AutoLogin {
    Accepted(User),
    Rejected,
}

/// Issues and redeems long-lived remember-me tokens. Tokens are stored on
/// the user record itself; one token per user, a new login overwrites the
/// previous one.
pub struct RememberMeService {
    users: Arc<dyn UserRepository>,
    ttl: Duration,
}

impl RememberMeService {
    pub fn new(users: Arc<dyn UserRepository>, ttl_days: i64) -> Self {
        Self {
            users,
            ttl: Duration::days(ttl_days),
        }
    }

    pub fn with_default_ttl(users: Arc<dyn UserRepository>) -> Self {
        Self::new(users, DEFAULT_TTL_DAYS)
    }

    /// Mint a fresh token for the user, persist it, and return the cookie
    /// the server should set.
    pub async fn issue(&self, user: &User) -> Result<CookieDirective, AuthError> {
        let token = generate_token();
        let mut updated = user.clone();
        updated.remember_token = Some(StoredToken::new(token.clone(), Utc::now() + self.ttl));
        updated.updated_at = Utc::now();
        self.users.update(updated).await?;

        Ok(CookieDirective::store(token, self.ttl.num_seconds() as u64))
    }

    /// Redeem a presented token. Only an unexpired token belonging to an
    /// active user is accepted; everything else is a silent rejection.
    pub async fn try_auto_login(&self, token: &str) -> Result<AutoLogin, AuthError> {
        if token.is_empty() {
            return Ok(AutoLogin::Rejected);
        }
        match self.users.find_by_remember_token(token).await? {
            Some(user) => Ok(AutoLogin::Accepted(user)),
            None => Ok(AutoLogin::Rejected),
        }
    }

    /// Forget the browser-side token. The stored token stays on the record
    /// until the next issue overwrites it.
    pub fn revoke(&self) -> CookieDirective {
        CookieDirective::clear()
    }
}
