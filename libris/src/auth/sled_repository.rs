use super::error::AuthError;
use super::models::{Relation, User};
use super::repository::UserRepository;
use async_trait::async_trait;
use sled::Db;
use std::path::Path;

const USERS_TREE: &str = "users";
const USERS_BY_USERNAME_TREE: &str = "users_by_username";
const USERS_BY_EMAIL_TREE: &str = "users_by_email";
const USERS_BY_REMEMBER_TOKEN_TREE: &str = "users_by_remember_token";
const LOANS_TREE: &str = "loans";
const RESERVATIONS_TREE: &str = "reservations";
const REVIEWS_TREE: &str = "reviews";

/// Sled-backed credential store. Users are stored whole (one JSON document
/// per id), so every update is a single atomic insert; secondary trees map
/// username, email and remember-token back to the id.
#[derive(Clone)]
pub struct SledUserRepository {
    db: Db,
}

impl SledUserRepository {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, AuthError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    fn users_tree(&self) -> Result<sled::Tree, AuthError> {
        Ok(self.db.open_tree(USERS_TREE)?)
    }

    fn username_tree(&self) -> Result<sled::Tree, AuthError> {
        Ok(self.db.open_tree(USERS_BY_USERNAME_TREE)?)
    }

    fn email_tree(&self) -> Result<sled::Tree, AuthError> {
        Ok(self.db.open_tree(USERS_BY_EMAIL_TREE)?)
    }

    fn remember_tree(&self) -> Result<sled::Tree, AuthError> {
        Ok(self.db.open_tree(USERS_BY_REMEMBER_TOKEN_TREE)?)
    }

    fn relation_tree(&self, relation: Relation) -> Result<sled::Tree, AuthError> {
        let name = match relation {
            Relation::Loans | Relation::ActiveLoans => LOANS_TREE,
            Relation::Reservations => RESERVATIONS_TREE,
            Relation::Reviews => REVIEWS_TREE,
        };
        Ok(self.db.open_tree(name)?)
    }

    fn load_user(&self, id: &[u8]) -> Result<Option<User>, AuthError> {
        let users_tree = self.users_tree()?;
        if let Some(user_data) = users_tree.get(id)? {
            let user: User = serde_json::from_slice(&user_data)?;
            return Ok(Some(user));
        }
        Ok(None)
    }

    fn load_by_index(&self, index: &sled::Tree, key: &str) -> Result<Option<User>, AuthError> {
        if let Some(user_id) = index.get(key.as_bytes())? {
            return self.load_user(&user_id);
        }
        Ok(None)
    }

    /// Record a related row for a user. The loan/reservation/review CRUD
    /// pages own these entries; the credential store only counts them.
    pub fn record_related(
        &self,
        relation: Relation,
        user_id: &str,
        record_id: &str,
        status: &str,
    ) -> Result<(), AuthError> {
        let tree = self.relation_tree(relation)?;
        let key = format!("{}:{}", user_id, record_id);
        let payload = serde_json::to_vec(&serde_json::json!({ "status": status }))?;
        tree.insert(key.as_bytes(), payload)?;
        Ok(())
    }
}

#[async_trait]
impl UserRepository for SledUserRepository {
    async fn create(&self, user: User) -> Result<User, AuthError> {
        if self
            .find_by_username_or_email(&user.username, &user.email)
            .await?
            .is_some()
        {
            return Err(AuthError::Conflict);
        }

        let users_tree = self.users_tree()?;
        let username_tree = self.username_tree()?;
        let email_tree = self.email_tree()?;

        let user_json = serde_json::to_vec(&user)?;

        users_tree.insert(user.id.as_bytes(), user_json)?;
        username_tree.insert(user.username.as_bytes(), user.id.as_bytes())?;
        email_tree.insert(user.email.as_bytes(), user.id.as_bytes())?;

        if let Some(token) = &user.remember_token {
            self.remember_tree()?
                .insert(token.value.as_bytes(), user.id.as_bytes())?;
        }

        Ok(user)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AuthError> {
        self.load_user(id.as_bytes())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        self.load_by_index(&self.email_tree()?, email)
    }

    async fn find_active_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        Ok(self
            .find_by_email(email)
            .await?
            .filter(|user| user.is_active()))
    }

    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, AuthError> {
        if let Some(user) = self.load_by_index(&self.username_tree()?, username)? {
            return Ok(Some(user));
        }
        self.find_by_email(email).await
    }

    async fn find_by_remember_token(&self, token: &str) -> Result<Option<User>, AuthError> {
        let user = self.load_by_index(&self.remember_tree()?, token)?;

        // Only an active user with a live, matching token counts
        Ok(user.filter(|u| {
            u.is_active()
                && u.remember_token
                    .as_ref()
                    .is_some_and(|t| t.value == token && !t.is_expired())
        }))
    }

    async fn update(&self, user: User) -> Result<User, AuthError> {
        let users_tree = self.users_tree()?;

        let Some(previous) = self.load_user(user.id.as_bytes())? else {
            return Err(AuthError::UserNotFound);
        };

        let user_json = serde_json::to_vec(&user)?;
        users_tree.insert(user.id.as_bytes(), user_json)?;

        // Reconcile secondary indexes against the previous row
        if previous.username != user.username {
            let username_tree = self.username_tree()?;
            username_tree.remove(previous.username.as_bytes())?;
            username_tree.insert(user.username.as_bytes(), user.id.as_bytes())?;
        }
        if previous.email != user.email {
            let email_tree = self.email_tree()?;
            email_tree.remove(previous.email.as_bytes())?;
            email_tree.insert(user.email.as_bytes(), user.id.as_bytes())?;
        }

        let old_token = previous.remember_token.as_ref().map(|t| t.value.as_str());
        let new_token = user.remember_token.as_ref().map(|t| t.value.as_str());
        if old_token != new_token {
            let remember_tree = self.remember_tree()?;
            if let Some(old) = old_token {
                remember_tree.remove(old.as_bytes())?;
            }
            if let Some(new) = new_token {
                remember_tree.insert(new.as_bytes(), user.id.as_bytes())?;
            }
        }

        Ok(user)
    }

    async fn count_related(&self, user_id: &str, relation: Relation) -> Result<u64, AuthError> {
        let tree = self.relation_tree(relation)?;
        let prefix = format!("{}:", user_id);
        let mut count = 0u64;

        for item in tree.scan_prefix(prefix.as_bytes()) {
            let (_, payload) = item?;
            if relation == Relation::ActiveLoans {
                let row: serde_json::Value = serde_json::from_slice(&payload)?;
                if row.get("status").and_then(|s| s.as_str()) != Some("active") {
                    continue;
                }
            }
            count += 1;
        }

        Ok(count)
    }
}
