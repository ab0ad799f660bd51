use super::audit::{AuditAction, AuditEntry, AuditSink};
use super::error::AuthError;
use super::models::{
    ProfileUpdate, PublicUser, Registration, Relation, Role, StoredToken, User, UserStats,
};
use super::password::{hash_password, verify_password};
use super::permissions::PermissionTable;
use super::remember::{AutoLogin, CookieDirective, RememberMeService};
use super::repository::UserRepository;
use super::session::{generate_token, Session};
use super::session_store::{SessionManager, SessionRepository};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::warn;

/// Where anonymous callers get sent when a guard turns them away.
pub const LOGIN_URL: &str = "/login";

/// Constant response for reset requests, whether or not the email exists.
pub const RESET_MESSAGE: &str = "If the email exists, a reset link has been sent.";

const MIN_PASSWORD_LEN: usize = 8;
const RESET_TOKEN_TTL_HOURS: i64 = 1;

/// Request-scoped caller details, threaded through for the audit trail.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

/// Guard verdict. The caller decides how to act on it; nothing here halts
/// or redirects on its own.
#[derive(Debug, Clone, PartialEq)]
pub enum AccessDecision {
    Allowed,
    /// Anonymous caller; send them to the given URL to authenticate
    RedirectTo(String),
    /// Authenticated but not entitled
    Forbidden,
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allowed)
    }
}

/// What a successful login hands back: the updated session (under a fresh
/// identifier), the signed-in user, and a remember-me cookie when requested.
#[derive(Debug)]
pub struct LoginOutcome {
    pub session: Session,
    pub user: PublicUser,
    pub remember_cookie: Option<CookieDirective>,
}

/// Post-logout state: a fresh anonymous session plus the directive clearing
/// the remember-me cookie.
#[derive(Debug)]
pub struct LogoutOutcome {
    pub session: Session,
    pub clear_remember: CookieDirective,
}

/// The authentication facade. Owns login, registration, session guards,
/// and the account self-service operations; everything below it is reached
/// through injected handles.
pub struct Auth<R: SessionRepository> {
    users: Arc<dyn UserRepository>,
    sessions: Arc<SessionManager<R>>,
    remember: RememberMeService,
    permissions: PermissionTable,
    audit: Arc<dyn AuditSink>,
}

impl<R: SessionRepository> Auth<R> {
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: Arc<SessionManager<R>>,
        remember: RememberMeService,
        permissions: PermissionTable,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            users,
            sessions,
            remember,
            permissions,
            audit,
        }
    }

    pub fn sessions(&self) -> &SessionManager<R> {
        &self.sessions
    }

    /// Per-request entry point: resume or open a session, then, if it is
    /// still anonymous and a remember-me token was presented, try a silent
    /// auto-login. A rejected token comes back with a clear-cookie
    /// directive so the browser stops presenting it.
    pub async fn open_session(
        &self,
        presented: Option<&str>,
        remember_token: Option<&str>,
        client: &ClientInfo,
    ) -> Result<(Session, Option<CookieDirective>), AuthError> {
        let mut session = self
            .sessions
            .open(presented, client.ip.clone(), client.user_agent.clone())
            .await?;

        let mut cookie = None;
        if !session.is_authenticated() {
            if let Some(token) = remember_token {
                match self.remember.try_auto_login(token).await? {
                    AutoLogin::Accepted(user) => {
                        session.authenticate_as(&user);
                        self.sessions.save(&session).await?;
                        self.audit
                            .record(
                                AuditEntry::new(AuditAction::AutoLogin)
                                    .on_user(&user.id)
                                    .by(&user.id)
                                    .from_client(client.ip.clone(), client.user_agent.clone()),
                            )
                            .await;
                    }
                    AutoLogin::Rejected => {
                        cookie = Some(self.remember.revoke());
                    }
                }
            }
        }

        Ok((session, cookie))
    }

    /// Interactive login. Failures are deliberately uniform: a missing
    /// account, a suspended account and a wrong password all come back as
    /// the same error.
    pub async fn login(
        &self,
        session: Session,
        email: &str,
        password: &str,
        remember_me: bool,
        client: &ClientInfo,
    ) -> Result<LoginOutcome, AuthError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::validation("Email and password are required."));
        }
        validate_email(email)?;

        let user = match self.users.find_active_by_email(email).await? {
            Some(user) if verify_password(password, &user.password_hash) => user,
            _ => {
                self.audit
                    .record(
                        AuditEntry::new(AuditAction::LoginFailed)
                            .from_client(client.ip.clone(), client.user_agent.clone()),
                    )
                    .await;
                return Err(AuthError::InvalidCredentials);
            }
        };

        // Stamp the login on the record
        let mut user = user;
        user.updated_at = Utc::now();
        let user = self.users.update(user).await?;

        // Swap the identifier at the privilege boundary so a pre-login id
        // can never name an authenticated session.
        let mut session = session;
        let old_id = session.id.clone();
        session.id = generate_token();
        session.last_rotation = super::session::current_timestamp_ms();
        session.authenticate_as(&user);
        self.sessions.save(&session).await?;
        self.sessions.discard(&old_id).await?;

        let remember_cookie = if remember_me {
            Some(self.remember.issue(&user).await?)
        } else {
            None
        };

        self.audit
            .record(
                AuditEntry::new(AuditAction::LoginSucceeded)
                    .on_user(&user.id)
                    .by(&user.id)
                    .from_client(client.ip.clone(), client.user_agent.clone()),
            )
            .await;

        Ok(LoginOutcome {
            session,
            user: PublicUser::from(&user),
            remember_cookie,
        })
    }

    /// Create an account. New registrations default to the least-privileged
    /// role unless the caller explicitly asks otherwise.
    pub async fn register(
        &self,
        registration: Registration,
        client: &ClientInfo,
    ) -> Result<PublicUser, AuthError> {
        validate_registration(&registration)?;

        let password_hash = hash_password(&registration.password)?;
        let mut user = User::new(
            registration.username.trim().to_string(),
            registration.email.trim().to_lowercase(),
            password_hash,
            registration.first_name.trim().to_string(),
            registration.last_name.trim().to_string(),
            registration.role.unwrap_or(Role::User),
        );
        user.phone = registration.phone;
        user.address = registration.address;

        let created = self.users.create(user).await?;

        self.audit
            .record(
                AuditEntry::new(AuditAction::Registered)
                    .on_user(&created.id)
                    .from_client(client.ip.clone(), client.user_agent.clone()),
            )
            .await;

        Ok(PublicUser::from(&created))
    }

    /// Tear down the session and clear the remember-me cookie.
    pub async fn logout(
        &self,
        session: Session,
        client: &ClientInfo,
    ) -> Result<LogoutOutcome, AuthError> {
        if let Some(user_id) = session.user_id() {
            self.audit
                .record(
                    AuditEntry::new(AuditAction::Logout)
                        .on_user(user_id)
                        .by(user_id)
                        .from_client(client.ip.clone(), client.user_agent.clone()),
                )
                .await;
        }

        let replacement = self.sessions.destroy(session).await?;
        Ok(LogoutOutcome {
            session: replacement,
            clear_remember: self.remember.revoke(),
        })
    }

    pub fn is_logged_in(&self, session: &Session) -> bool {
        session.is_authenticated()
    }

    /// The user behind the session, freshly loaded from the store.
    pub async fn current_user(&self, session: &Session) -> Result<Option<User>, AuthError> {
        match session.user_id() {
            Some(user_id) => self.users.find_by_id(user_id).await,
            None => Ok(None),
        }
    }

    pub fn has_role(&self, session: &Session, role: Role) -> bool {
        session.role() == Some(role)
    }

    pub fn has_permission(&self, session: &Session, permission: &str) -> bool {
        match session.role() {
            Some(role) => self.permissions.allows(role, permission),
            None => false,
        }
    }

    /// Guard: caller must be authenticated. On rejection the requested path
    /// is stashed so login can bounce the user back afterwards.
    pub async fn require_login(
        &self,
        session: &mut Session,
        requested_path: Option<&str>,
    ) -> Result<AccessDecision, AuthError> {
        if session.is_authenticated() {
            return Ok(AccessDecision::Allowed);
        }
        if let Some(path) = requested_path {
            session.redirect_after_login = Some(path.to_string());
            self.sessions.save(session).await?;
        }
        Ok(AccessDecision::RedirectTo(LOGIN_URL.to_string()))
    }

    /// Guard: caller must hold the exact role.
    pub async fn require_role(
        &self,
        session: &mut Session,
        role: Role,
        requested_path: Option<&str>,
    ) -> Result<AccessDecision, AuthError> {
        match self.require_login(session, requested_path).await? {
            AccessDecision::Allowed if self.has_role(session, role) => Ok(AccessDecision::Allowed),
            AccessDecision::Allowed => Ok(AccessDecision::Forbidden),
            redirect => Ok(redirect),
        }
    }

    /// Guard: caller must hold the permission under the table.
    pub async fn require_permission(
        &self,
        session: &mut Session,
        permission: &str,
        requested_path: Option<&str>,
    ) -> Result<AccessDecision, AuthError> {
        match self.require_login(session, requested_path).await? {
            AccessDecision::Allowed if self.has_permission(session, permission) => {
                Ok(AccessDecision::Allowed)
            }
            AccessDecision::Allowed => Ok(AccessDecision::Forbidden),
            redirect => Ok(redirect),
        }
    }

    /// Change the caller's own password after re-proving the current one.
    pub async fn change_password(
        &self,
        session: &Session,
        current_password: &str,
        new_password: &str,
        client: &ClientInfo,
    ) -> Result<(), AuthError> {
        let Some(user) = self.current_user(session).await? else {
            return Err(AuthError::UserNotFound);
        };

        if !verify_password(current_password, &user.password_hash) {
            return Err(AuthError::WrongCurrentPassword);
        }
        validate_password(new_password)?;

        let mut updated = user;
        updated.password_hash = hash_password(new_password)?;
        updated.updated_at = Utc::now();
        self.users.update(updated).await?;

        if let Some(user_id) = session.user_id() {
            self.audit
                .record(
                    AuditEntry::new(AuditAction::PasswordChanged)
                        .on_user(user_id)
                        .by(user_id)
                        .from_client(client.ip.clone(), client.user_agent.clone()),
                )
                .await;
        }
        Ok(())
    }

    /// Start a password reset. The response never reveals whether the email
    /// is on file; when it is, a one-hour token lands on the user record for
    /// the mail pipeline to pick up. Status is not filtered here: an
    /// inactive user may still recover the account, login stays refused.
    pub async fn reset_password(
        &self,
        email: &str,
        client: &ClientInfo,
    ) -> Result<&'static str, AuthError> {
        if let Some(user) = self.users.find_by_email(email.trim()).await? {
            let mut updated = user;
            updated.password_reset = Some(StoredToken::new(
                generate_token(),
                Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS),
            ));
            updated.updated_at = Utc::now();
            let user_id = updated.id.clone();
            self.users.update(updated).await?;

            self.audit
                .record(
                    AuditEntry::new(AuditAction::PasswordResetRequested)
                        .on_user(&user_id)
                        .from_client(client.ip.clone(), client.user_agent.clone()),
                )
                .await;
        }

        Ok(RESET_MESSAGE)
    }

    /// Apply whitelisted profile fields. When the name changes, the cached
    /// session identity is refreshed so the display name stays current.
    pub async fn update_profile(
        &self,
        session: &mut Session,
        update: ProfileUpdate,
        client: &ClientInfo,
    ) -> Result<PublicUser, AuthError> {
        if update.is_empty() {
            return Err(AuthError::validation("Nothing to update."));
        }
        let Some(user) = self.current_user(session).await? else {
            return Err(AuthError::UserNotFound);
        };

        let refresh_identity = update.touches_name();
        let mut updated = user;
        if let Some(first_name) = update.first_name {
            let first_name = first_name.trim().to_string();
            if first_name.is_empty() {
                return Err(AuthError::validation("First name cannot be empty."));
            }
            updated.first_name = first_name;
        }
        if let Some(last_name) = update.last_name {
            let last_name = last_name.trim().to_string();
            if last_name.is_empty() {
                return Err(AuthError::validation("Last name cannot be empty."));
            }
            updated.last_name = last_name;
        }
        if let Some(phone) = update.phone {
            updated.phone = Some(phone);
        }
        if let Some(address) = update.address {
            updated.address = Some(address);
        }
        updated.updated_at = Utc::now();
        let saved = self.users.update(updated).await?;

        if refresh_identity {
            if let Some(identity) = session.identity.as_mut() {
                identity.full_name = saved.full_name();
                self.sessions.save(session).await?;
            }
        }

        self.audit
            .record(
                AuditEntry::new(AuditAction::ProfileUpdated)
                    .on_user(&saved.id)
                    .by(&saved.id)
                    .from_client(client.ip.clone(), client.user_agent.clone()),
            )
            .await;

        Ok(PublicUser::from(&saved))
    }

    /// Activity counters for the account page. Counting is best effort: a
    /// failed count logs a warning and reads as zero rather than failing the
    /// page.
    pub async fn user_stats(&self, user_id: &str) -> UserStats {
        UserStats {
            total_loans: self.count_or_zero(user_id, Relation::Loans).await,
            active_loans: self.count_or_zero(user_id, Relation::ActiveLoans).await,
            total_reservations: self.count_or_zero(user_id, Relation::Reservations).await,
            reviews_written: self.count_or_zero(user_id, Relation::Reviews).await,
        }
    }

    async fn count_or_zero(&self, user_id: &str, relation: Relation) -> u64 {
        match self.users.count_related(user_id, relation).await {
            Ok(count) => count,
            Err(error) => {
                warn!(%error, ?relation, "stats count failed, reporting zero");
                0
            }
        }
    }
}

fn validate_registration(registration: &Registration) -> Result<(), AuthError> {
    if registration.username.trim().is_empty()
        || registration.email.trim().is_empty()
        || registration.first_name.trim().is_empty()
        || registration.last_name.trim().is_empty()
    {
        return Err(AuthError::validation("All fields are required."));
    }
    validate_email(registration.email.trim())?;
    validate_password(&registration.password)?;
    Ok(())
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AuthError::validation(
            "Password must be at least 8 characters long.",
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), AuthError> {
    let valid = email.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty()
            && domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
    });
    if !valid {
        return Err(AuthError::validation("Invalid email format."));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::audit::MemoryAuditSink;
    use crate::auth::moka_session_repository::MokaSessionRepository;
    use crate::auth::session_store::SessionPolicy;
    use crate::auth::sled_repository::SledUserRepository;
    use tempfile::TempDir;

    struct Fixture {
        _temp_dir: TempDir,
        auth: Auth<MokaSessionRepository>,
        users: Arc<SledUserRepository>,
        audit: Arc<MemoryAuditSink>,
    }

    fn fixture() -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let users = Arc::new(SledUserRepository::new(temp_dir.path().join("users.sled")).unwrap());
        let sessions = Arc::new(SessionManager::new(
            Arc::new(MokaSessionRepository::with_defaults()),
            SessionPolicy::default(),
        ));
        let audit = Arc::new(MemoryAuditSink::new());
        let auth = Auth::new(
            users.clone(),
            sessions,
            RememberMeService::with_default_ttl(users.clone()),
            PermissionTable::default(),
            audit.clone(),
        );
        Fixture {
            _temp_dir: temp_dir,
            auth,
            users,
            audit,
        }
    }

    fn registration(email: &str) -> Registration {
        Registration {
            username: email.split('@').next().unwrap().to_string(),
            email: email.to_string(),
            password: "password123".to_string(),
            first_name: "Alice".to_string(),
            last_name: "Liddell".to_string(),
            phone: None,
            address: None,
            role: None,
        }
    }

    fn client() -> ClientInfo {
        ClientInfo {
            ip: Some("10.0.0.1".to_string()),
            user_agent: Some("test".to_string()),
        }
    }

    async fn signed_in(fixture: &Fixture, email: &str) -> Session {
        fixture
            .auth
            .register(registration(email), &client())
            .await
            .unwrap();
        let session = fixture
            .auth
            .open_session(None, None, &client())
            .await
            .unwrap()
            .0;
        fixture
            .auth
            .login(session, email, "password123", false, &client())
            .await
            .unwrap()
            .session
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let fixture = fixture();
        let public = fixture
            .auth
            .register(registration("alice@x.com"), &client())
            .await
            .unwrap();
        assert_eq!(public.role, Role::User);

        let session = fixture
            .auth
            .open_session(None, None, &client())
            .await
            .unwrap()
            .0;
        let outcome = fixture
            .auth
            .login(session, "alice@x.com", "password123", false, &client())
            .await
            .unwrap();
        assert!(outcome.session.is_authenticated());
        assert_eq!(outcome.user.email, "alice@x.com");
        assert!(outcome.remember_cookie.is_none());
    }

    #[tokio::test]
    async fn test_login_regenerates_session_id() {
        let fixture = fixture();
        fixture
            .auth
            .register(registration("alice@x.com"), &client())
            .await
            .unwrap();
        let session = fixture
            .auth
            .open_session(None, None, &client())
            .await
            .unwrap()
            .0;
        let pre_login_id = session.id.clone();

        let outcome = fixture
            .auth
            .login(session, "alice@x.com", "password123", false, &client())
            .await
            .unwrap();
        assert_ne!(outcome.session.id, pre_login_id);
    }

    #[tokio::test]
    async fn test_login_failures_are_uniform() {
        let fixture = fixture();
        fixture
            .auth
            .register(registration("alice@x.com"), &client())
            .await
            .unwrap();

        // Wrong password
        let session = fixture
            .auth
            .open_session(None, None, &client())
            .await
            .unwrap()
            .0;
        let wrong_password = fixture
            .auth
            .login(session, "alice@x.com", "nope-nope", false, &client())
            .await
            .unwrap_err();

        // Unknown email
        let session = fixture
            .auth
            .open_session(None, None, &client())
            .await
            .unwrap()
            .0;
        let unknown_email = fixture
            .auth
            .login(session, "ghost@x.com", "password123", false, &client())
            .await
            .unwrap_err();

        // Suspended account with the right password
        let mut user = fixture
            .users
            .find_by_email("alice@x.com")
            .await
            .unwrap()
            .unwrap();
        user.status = crate::auth::models::UserStatus::Suspended;
        fixture.users.update(user).await.unwrap();
        let session = fixture
            .auth
            .open_session(None, None, &client())
            .await
            .unwrap()
            .0;
        let suspended = fixture
            .auth
            .login(session, "alice@x.com", "password123", false, &client())
            .await
            .unwrap_err();

        assert_eq!(wrong_password.to_string(), "Invalid email or password.");
        assert_eq!(unknown_email.to_string(), wrong_password.to_string());
        assert_eq!(suspended.to_string(), wrong_password.to_string());
    }

    #[tokio::test]
    async fn test_login_ignores_password_length_policy() {
        let fixture = fixture();
        fixture
            .auth
            .register(registration("alice@x.com"), &client())
            .await
            .unwrap();

        // A password below the registration minimum is just a wrong
        // password at login, not a validation error.
        let session = fixture
            .auth
            .open_session(None, None, &client())
            .await
            .unwrap()
            .0;
        let result = fixture
            .auth
            .login(session, "alice@x.com", "short", false, &client())
            .await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_duplicate_registration_conflicts() {
        let fixture = fixture();
        fixture
            .auth
            .register(registration("alice@x.com"), &client())
            .await
            .unwrap();
        let result = fixture
            .auth
            .register(registration("alice@x.com"), &client())
            .await;
        assert!(matches!(result, Err(AuthError::Conflict)));
    }

    #[tokio::test]
    async fn test_registration_validation() {
        let fixture = fixture();

        let mut bad_email = registration("alice@x.com");
        bad_email.email = "not-an-email".to_string();
        assert!(matches!(
            fixture.auth.register(bad_email, &client()).await,
            Err(AuthError::Validation(_))
        ));

        let mut short_password = registration("bob@x.com");
        short_password.password = "12345".to_string();
        assert!(matches!(
            fixture.auth.register(short_password, &client()).await,
            Err(AuthError::Validation(_))
        ));

        let mut blank = registration("carol@x.com");
        blank.first_name = "   ".to_string();
        assert!(matches!(
            fixture.auth.register(blank, &client()).await,
            Err(AuthError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_remember_me_round_trip() {
        let fixture = fixture();
        fixture
            .auth
            .register(registration("alice@x.com"), &client())
            .await
            .unwrap();
        let session = fixture
            .auth
            .open_session(None, None, &client())
            .await
            .unwrap()
            .0;
        let outcome = fixture
            .auth
            .login(session, "alice@x.com", "password123", true, &client())
            .await
            .unwrap();
        let cookie = outcome.remember_cookie.unwrap();

        // A brand new request with only the remember-me token signs in
        // silently, and no clear-cookie directive is issued.
        let (session, directive) = fixture
            .auth
            .open_session(None, Some(&cookie.value), &client())
            .await
            .unwrap();
        assert!(session.is_authenticated());
        assert!(directive.is_none());
        assert!(fixture
            .audit
            .actions()
            .contains(&AuditAction::AutoLogin));
    }

    #[tokio::test]
    async fn test_rejected_remember_token_gets_cleared() {
        let fixture = fixture();
        let (session, directive) = fixture
            .auth
            .open_session(None, Some("bogus-token"), &client())
            .await
            .unwrap();
        assert!(!session.is_authenticated());
        assert!(directive.unwrap().is_removal());
    }

    #[tokio::test]
    async fn test_logout_clears_everything() {
        let fixture = fixture();
        let session = signed_in(&fixture, "alice@x.com").await;
        let old_id = session.id.clone();

        let outcome = fixture.auth.logout(session, &client()).await.unwrap();
        assert!(!outcome.session.is_authenticated());
        assert_ne!(outcome.session.id, old_id);
        assert!(outcome.clear_remember.is_removal());
        assert!(fixture.auth.sessions().peek(&old_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_guards() {
        let fixture = fixture();
        let mut anonymous = fixture
            .auth
            .open_session(None, None, &client())
            .await
            .unwrap()
            .0;

        let decision = fixture
            .auth
            .require_login(&mut anonymous, Some("/books/42"))
            .await
            .unwrap();
        assert_eq!(decision, AccessDecision::RedirectTo(LOGIN_URL.to_string()));
        assert_eq!(
            anonymous.redirect_after_login.as_deref(),
            Some("/books/42")
        );

        let mut member = signed_in(&fixture, "alice@x.com").await;
        assert!(fixture
            .auth
            .require_login(&mut member, None)
            .await
            .unwrap()
            .is_allowed());
        assert!(fixture
            .auth
            .require_permission(&mut member, "borrow_books", None)
            .await
            .unwrap()
            .is_allowed());
        assert_eq!(
            fixture
                .auth
                .require_permission(&mut member, "manage_books", None)
                .await
                .unwrap(),
            AccessDecision::Forbidden
        );
        assert_eq!(
            fixture
                .auth
                .require_role(&mut member, Role::Admin, None)
                .await
                .unwrap(),
            AccessDecision::Forbidden
        );
    }

    #[tokio::test]
    async fn test_change_password() {
        let fixture = fixture();
        let session = signed_in(&fixture, "alice@x.com").await;

        let wrong = fixture
            .auth
            .change_password(&session, "not-current", "newpassword", &client())
            .await;
        assert!(matches!(wrong, Err(AuthError::WrongCurrentPassword)));

        fixture
            .auth
            .change_password(&session, "password123", "newpassword", &client())
            .await
            .unwrap();

        // Old password no longer works, new one does
        let fresh = fixture
            .auth
            .open_session(None, None, &client())
            .await
            .unwrap()
            .0;
        assert!(fixture
            .auth
            .login(fresh, "alice@x.com", "password123", false, &client())
            .await
            .is_err());
        let fresh = fixture
            .auth
            .open_session(None, None, &client())
            .await
            .unwrap()
            .0;
        assert!(fixture
            .auth
            .login(fresh, "alice@x.com", "newpassword", false, &client())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_reset_password_does_not_leak_existence() {
        let fixture = fixture();
        fixture
            .auth
            .register(registration("alice@x.com"), &client())
            .await
            .unwrap();

        let known = fixture
            .auth
            .reset_password("alice@x.com", &client())
            .await
            .unwrap();
        let unknown = fixture
            .auth
            .reset_password("ghost@x.com", &client())
            .await
            .unwrap();
        assert_eq!(known, unknown);
        assert_eq!(known, RESET_MESSAGE);

        // The known account got a live token; only that request was audited
        let user = fixture
            .users
            .find_by_email("alice@x.com")
            .await
            .unwrap()
            .unwrap();
        let token = user.password_reset.unwrap();
        assert_eq!(token.value.len(), 64);
        assert!(!token.is_expired());
        assert_eq!(
            fixture
                .audit
                .actions()
                .iter()
                .filter(|a| **a == AuditAction::PasswordResetRequested)
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_reset_password_reaches_inactive_accounts() {
        let fixture = fixture();
        fixture
            .auth
            .register(registration("alice@x.com"), &client())
            .await
            .unwrap();
        let mut user = fixture
            .users
            .find_by_email("alice@x.com")
            .await
            .unwrap()
            .unwrap();
        user.status = crate::auth::models::UserStatus::Suspended;
        fixture.users.update(user).await.unwrap();

        fixture
            .auth
            .reset_password("alice@x.com", &client())
            .await
            .unwrap();
        let stored = fixture
            .users
            .find_by_email("alice@x.com")
            .await
            .unwrap()
            .unwrap();
        assert!(stored.password_reset.is_some());
    }

    #[tokio::test]
    async fn test_update_profile_refreshes_session_name() {
        let fixture = fixture();
        let mut session = signed_in(&fixture, "alice@x.com").await;

        let update = ProfileUpdate {
            first_name: Some("Alicia".to_string()),
            phone: Some("555-0100".to_string()),
            ..Default::default()
        };
        let public = fixture
            .auth
            .update_profile(&mut session, update, &client())
            .await
            .unwrap();
        assert_eq!(public.full_name, "Alicia Liddell");
        assert_eq!(
            session.identity.as_ref().unwrap().full_name,
            "Alicia Liddell"
        );

        // Untouched fields survive
        let stored = fixture
            .users
            .find_by_email("alice@x.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.last_name, "Liddell");
        assert_eq!(stored.phone.as_deref(), Some("555-0100"));
    }

    #[tokio::test]
    async fn test_update_profile_rejects_empty_and_blank() {
        let fixture = fixture();
        let mut session = signed_in(&fixture, "alice@x.com").await;

        assert!(matches!(
            fixture
                .auth
                .update_profile(&mut session, ProfileUpdate::default(), &client())
                .await,
            Err(AuthError::Validation(_))
        ));

        let blank_name = ProfileUpdate {
            first_name: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            fixture
                .auth
                .update_profile(&mut session, blank_name, &client())
                .await,
            Err(AuthError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_user_stats() {
        let fixture = fixture();
        fixture
            .auth
            .register(registration("alice@x.com"), &client())
            .await
            .unwrap();
        let user = fixture
            .users
            .find_by_email("alice@x.com")
            .await
            .unwrap()
            .unwrap();

        fixture
            .users
            .record_related(Relation::Loans, &user.id, "l1", "active")
            .unwrap();
        fixture
            .users
            .record_related(Relation::Loans, &user.id, "l2", "returned")
            .unwrap();
        fixture
            .users
            .record_related(Relation::Reviews, &user.id, "r1", "published")
            .unwrap();

        let stats = fixture.auth.user_stats(&user.id).await;
        assert_eq!(
            stats,
            UserStats {
                total_loans: 2,
                active_loans: 1,
                total_reservations: 0,
                reviews_written: 1,
            }
        );

        // Unknown user reads as all zeros, not an error
        let empty = fixture.auth.user_stats("no-such-user").await;
        assert_eq!(empty, UserStats::default());
    }

    #[tokio::test]
    async fn test_audit_trail_for_login_attempts() {
        let fixture = fixture();
        fixture
            .auth
            .register(registration("alice@x.com"), &client())
            .await
            .unwrap();
        let session = fixture
            .auth
            .open_session(None, None, &client())
            .await
            .unwrap()
            .0;
        let _ = fixture
            .auth
            .login(session, "alice@x.com", "wrong-password", false, &client())
            .await;
        let session = fixture
            .auth
            .open_session(None, None, &client())
            .await
            .unwrap()
            .0;
        fixture
            .auth
            .login(session, "alice@x.com", "password123", false, &client())
            .await
            .unwrap();

        let actions = fixture.audit.actions();
        assert!(actions.contains(&AuditAction::Registered));
        assert!(actions.contains(&AuditAction::LoginFailed));
        assert!(actions.contains(&AuditAction::LoginSucceeded));
    }

    #[test]
    fn test_email_validation() {
        assert!(validate_email("a@b.co").is_ok());
        assert!(validate_email("with.dots@sub.domain.org").is_ok());
        assert!(validate_email("nope").is_err());
        assert!(validate_email("@b.co").is_err());
        assert!(validate_email("a@nodot").is_err());
        assert!(validate_email("a@.starts-with-dot.com").is_err());
    }
}
