use thiserror::Error;

/// Shown to callers whenever a persistence or hashing failure would
/// otherwise leak internals.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing or malformed input. The message names the field and is safe
    /// to show verbatim.
    #[error("{0}")]
    Validation(String),

    /// Uniform response for both unknown email and wrong password, so the
    /// login form never reveals which one was wrong.
    #[error("Invalid email or password.")]
    InvalidCredentials,

    /// Registration collided with an existing username or email. A single
    /// message covers both to match the single uniqueness probe.
    #[error("Username or email already exists.")]
    Conflict,

    #[error("User not found.")]
    UserNotFound,

    /// Change-password only; login never uses this wording.
    #[error("Current password is incorrect.")]
    WrongCurrentPassword,

    #[error("Storage error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),
}

impl AuthError {
    /// Message safe to surface to an end user. Store-layer detail is logged
    /// by the caller and replaced with a generic retry message here.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::Store(_) | AuthError::Serialization(_) | AuthError::PasswordHash(_) => {
                GENERIC_FAILURE_MESSAGE.to_string()
            }
            other => other.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AuthError::Validation(message.into())
    }
}

impl From<sled::Error> for AuthError {
    fn from(err: sled::Error) -> Self {
        AuthError::Store(err.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        AuthError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_hidden_from_public_message() {
        let err = AuthError::Store("sled tree corrupted at page 42".to_string());
        assert_eq!(err.public_message(), GENERIC_FAILURE_MESSAGE);
        assert!(err.to_string().contains("page 42"));
    }

    #[test]
    fn test_validation_message_shown_verbatim() {
        let err = AuthError::validation("Email is required.");
        assert_eq!(err.public_message(), "Email is required.");
    }
}
