use super::models::{PublicUser, Role, User};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Opaque session identifier - a secure random string
pub type SessionId = String;

/// Get current timestamp in milliseconds since Unix epoch
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}

/// Generate a cryptographically secure random token (session ids, CSRF
/// tokens, remember-me and reset tokens).
pub fn generate_token() -> String {
    use rand::Rng;

    // 32 random bytes encoded as hex (64 characters, 256 bits of entropy)
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..32).map(|_| rng.random()).collect();

    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<String>()
}

/// Identity fields cached in the session at login time. Present as a whole
/// or not at all: a session is either fully authenticated or fully
/// anonymous, never in between.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionIdentity {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub full_name: String,
    pub login_time: u64, // UTC timestamp in milliseconds
}

impl SessionIdentity {
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            full_name: user.full_name(),
            login_time: current_timestamp_ms(),
        }
    }

    pub fn public_user(&self) -> PublicUser {
        PublicUser {
            id: self.user_id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role,
            full_name: self.full_name.clone(),
        }
    }
}

/// Per-request session state, passed explicitly through every call rather
/// than living in a global.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub identity: Option<SessionIdentity>,
    pub created_at: u64,    // UTC timestamp in milliseconds
    pub last_activity: u64, // UTC timestamp in milliseconds
    pub last_rotation: u64, // UTC timestamp in milliseconds
    pub csrf_token: String,
    pub redirect_after_login: Option<String>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

impl Session {
    /// Open a fresh anonymous session with a new identifier and the
    /// rotation clock set to now.
    pub fn anonymous() -> Self {
        let now = current_timestamp_ms();
        Self {
            id: generate_token(),
            identity: None,
            created_at: now,
            last_activity: now,
            last_rotation: now,
            csrf_token: generate_token(),
            redirect_after_login: None,
            client_ip: None,
            user_agent: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// Write identity fields into the session (anonymous -> authenticated)
    pub fn authenticate_as(&mut self, user: &User) {
        self.identity = Some(SessionIdentity::from_user(user));
    }

    pub fn role(&self) -> Option<Role> {
        self.identity.as_ref().map(|i| i.role)
    }

    pub fn user_id(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.user_id.as_str())
    }

    /// Age since the last activity stamp, in milliseconds
    pub fn idle_ms(&self, now: u64) -> u64 {
        now.saturating_sub(self.last_activity)
    }

    /// Age since the identifier was last rotated, in milliseconds
    pub fn rotation_age_ms(&self, now: u64) -> u64 {
        now.saturating_sub(self.last_rotation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::Role;

    fn sample_user() -> User {
        User::new(
            "alice".to_string(),
            "alice@x.com".to_string(),
            "hash".to_string(),
            "A".to_string(),
            "L".to_string(),
            Role::User,
        )
    }

    #[test]
    fn test_generate_token() {
        let token1 = generate_token();
        let token2 = generate_token();

        // 32 bytes as hex
        assert_eq!(token1.len(), 64);
        assert_eq!(token2.len(), 64);
        assert_ne!(token1, token2);
        assert!(token1.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_anonymous_session_is_not_authenticated() {
        let session = Session::anonymous();
        assert!(!session.is_authenticated());
        assert!(session.identity.is_none());
        assert_eq!(session.csrf_token.len(), 64);
        assert_ne!(session.id, session.csrf_token);
    }

    #[test]
    fn test_authenticate_populates_all_identity_fields() {
        let mut session = Session::anonymous();
        let user = sample_user();
        session.authenticate_as(&user);

        let identity = session.identity.as_ref().unwrap();
        assert_eq!(identity.user_id, user.id);
        assert_eq!(identity.username, "alice");
        assert_eq!(identity.email, "alice@x.com");
        assert_eq!(identity.full_name, "A L");
        assert_eq!(session.role(), Some(Role::User));
    }

    #[test]
    fn test_age_helpers() {
        let mut session = Session::anonymous();
        let now = current_timestamp_ms();
        session.last_activity = now - 5_000;
        session.last_rotation = now - 10_000;

        assert!(session.idle_ms(now) >= 5_000);
        assert!(session.rotation_age_ms(now) >= 10_000);
        // A stamp in the future saturates to zero rather than wrapping
        session.last_activity = now + 60_000;
        assert_eq!(session.idle_ms(now), 0);
    }
}
