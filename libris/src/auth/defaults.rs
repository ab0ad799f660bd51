use super::error::AuthError;
use super::models::{Role, User};
use super::password::hash_password;
use super::repository::UserRepository;
use std::sync::Arc;
use tracing::info;

/// Ensure the bootstrap admin account exists. Safe to call on every startup;
/// an existing account (by username or email) is left untouched, including
/// its password.
pub async fn seed_default_admin(
    users: &Arc<dyn UserRepository>,
    username: &str,
    email: &str,
    password: &str,
) -> Result<(), AuthError> {
    if users
        .find_by_username_or_email(username, email)
        .await?
        .is_some()
    {
        return Ok(());
    }

    let password_hash = hash_password(password)?;
    let admin = User::new(
        username.to_string(),
        email.to_string(),
        password_hash,
        "System".to_string(),
        "Administrator".to_string(),
        Role::Admin,
    );
    let created = users.create(admin).await?;
    info!(username = %created.username, "seeded default admin account");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;
    use crate::auth::sled_repository::SledUserRepository;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let repo: Arc<dyn UserRepository> =
            Arc::new(SledUserRepository::new(temp_dir.path().join("users.sled")).unwrap());

        seed_default_admin(&repo, "admin", "admin@library.local", "admin123")
            .await
            .unwrap();
        let admin = repo
            .find_by_email("admin@library.local")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert!(verify_password("admin123", &admin.password_hash));

        // A second run with a different password must not overwrite
        seed_default_admin(&repo, "admin", "admin@library.local", "changed-later")
            .await
            .unwrap();
        let same = repo
            .find_by_email("admin@library.local")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(same.id, admin.id);
        assert!(verify_password("admin123", &same.password_hash));
    }
}
