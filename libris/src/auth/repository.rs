use super::error::AuthError;
use super::models::{Relation, User};
use async_trait::async_trait;

/// Credential-store boundary. Every write applies the whole record in one
/// operation, so concurrent logins and password changes on the same user
/// can never observe a half-written row.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user. Fails with `Conflict` if the username or email is
    /// already taken.
    async fn create(&self, user: User) -> Result<User, AuthError>;

    /// Find a user by ID
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AuthError>;

    /// Find a user by email, regardless of status
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    /// Login-relevant lookup: only returns a user whose status is active
    async fn find_active_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    /// Single uniqueness probe covering both the username and the email
    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, AuthError>;

    /// Remember-me lookup: only matches an active user whose stored token
    /// has not expired
    async fn find_by_remember_token(&self, token: &str) -> Result<Option<User>, AuthError>;

    /// Replace the stored record with `user` in a single atomic write
    async fn update(&self, user: User) -> Result<User, AuthError>;

    /// Count records related to a user (loans, reservations, reviews) for
    /// dashboard statistics
    async fn count_related(&self, user_id: &str, relation: Relation) -> Result<u64, AuthError>;
}
