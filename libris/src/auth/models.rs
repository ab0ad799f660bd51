use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Coarse identity classification driving permission defaults.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Librarian,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Librarian => "librarian",
            Role::User => "user",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Inactive,
    Suspended,
}

/// Single-slot opaque token with an expiry. Used for both the remember-me
/// token and the password-reset token; a new issuance overwrites the old one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl StoredToken {
    pub fn new(value: String, expires_at: DateTime<Utc>) -> Self {
        Self { value, expires_at }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: Role,
    pub status: UserStatus,
    pub remember_token: Option<StoredToken>,
    pub password_reset: Option<StoredToken>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        username: String,
        email: String,
        password_hash: String,
        first_name: String,
        last_name: String,
        role: Role,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            username,
            email,
            password_hash,
            first_name,
            last_name,
            phone: None,
            address: None,
            role,
            status: UserStatus::Active,
            remember_token: None,
            password_reset: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

/// The shape the facade hands back to callers. Never carries the hash.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub full_name: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            full_name: user.full_name(),
        }
    }
}

/// Registration input. Role defaults to the least-privileged value when
/// unspecified.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: Option<Role>,
}

/// Whitelisted profile fields. Anything outside this set cannot be changed
/// through the profile path.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.phone.is_none()
            && self.address.is_none()
    }

    pub fn touches_name(&self) -> bool {
        self.first_name.is_some() || self.last_name.is_some()
    }
}

/// Statistics relation names understood by the credential store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Loans,
    ActiveLoans,
    Reservations,
    Reviews,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct UserStats {
    pub total_loans: u64,
    pub active_loans: u64,
    pub total_reservations: u64,
    pub reviews_written: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_full_name() {
        let user = User::new(
            "alice".to_string(),
            "alice@x.com".to_string(),
            "hash".to_string(),
            "A".to_string(),
            "L".to_string(),
            Role::User,
        );
        assert_eq!(user.full_name(), "A L");
    }

    #[test]
    fn test_public_user_never_carries_hash() {
        let user = User::new(
            "alice".to_string(),
            "alice@x.com".to_string(),
            "secret_hash".to_string(),
            "A".to_string(),
            "L".to_string(),
            Role::Librarian,
        );
        let public = PublicUser::from(&user);
        let json = serde_json::to_string(&public).unwrap();
        assert!(!json.contains("secret_hash"));
        assert_eq!(public.role, Role::Librarian);
    }

    #[test]
    fn test_stored_token_expiry() {
        let live = StoredToken::new("t".to_string(), Utc::now() + Duration::hours(1));
        let dead = StoredToken::new("t".to_string(), Utc::now() - Duration::seconds(1));
        assert!(!live.is_expired());
        assert!(dead.is_expired());
    }

    #[test]
    fn test_role_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Librarian).unwrap(), "\"librarian\"");
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::Admin);
    }

    #[test]
    fn test_profile_update_emptiness() {
        assert!(ProfileUpdate::default().is_empty());
        let update = ProfileUpdate {
            phone: Some("123".to_string()),
            ..Default::default()
        };
        assert!(!update.is_empty());
        assert!(!update.touches_name());
    }
}
