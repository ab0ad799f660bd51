use super::error::AuthError;
use super::session::{current_timestamp_ms, generate_token, Session, SessionId};
use async_trait::async_trait;
use std::sync::Arc;

/// Uniform get/put/destroy contract over a session backend (in-memory map,
/// external key-value store, or anything else).
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn get(&self, id: &SessionId) -> Result<Option<Session>, AuthError>;

    async fn put(&self, session: Session) -> Result<(), AuthError>;

    /// Remove a session, returning whether it existed
    async fn remove(&self, id: &SessionId) -> Result<bool, AuthError>;
}

/// Timing rules applied to every request.
#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy {
    /// Idle age after which the session is torn down as if logout were
    /// called (1 hour).
    pub idle_timeout_ms: u64,
    /// Identifier age after which the id is regenerated, bounding how long
    /// an intercepted identifier stays useful (5 minutes).
    pub rotation_interval_ms: u64,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            idle_timeout_ms: 3_600_000,
            rotation_interval_ms: 300_000,
        }
    }
}

impl SessionPolicy {
    pub fn from_secs(idle_timeout_secs: u64, rotation_interval_secs: u64) -> Self {
        Self {
            idle_timeout_ms: idle_timeout_secs * 1000,
            rotation_interval_ms: rotation_interval_secs * 1000,
        }
    }
}

/// Owns the per-request session lifecycle: creation, periodic identifier
/// rotation, idle timeout, destruction.
pub struct SessionManager<R: SessionRepository> {
    repository: Arc<R>,
    policy: SessionPolicy,
}

impl<R: SessionRepository> SessionManager<R> {
    pub fn new(repository: Arc<R>, policy: SessionPolicy) -> Self {
        Self { repository, policy }
    }

    pub fn policy(&self) -> SessionPolicy {
        self.policy
    }

    /// Per-request entry point. Resumes the presented session or opens a
    /// fresh anonymous one, then applies, in this order: identifier
    /// rotation, idle timeout, activity stamp. The returned session is
    /// already persisted; its id may differ from the presented one.
    pub async fn open(
        &self,
        presented: Option<&str>,
        client_ip: Option<String>,
        user_agent: Option<String>,
    ) -> Result<Session, AuthError> {
        let now = current_timestamp_ms();

        let mut session = match presented {
            Some(id) => self
                .repository
                .get(&id.to_string())
                .await?
                .unwrap_or_else(Session::anonymous),
            None => Session::anonymous(),
        };

        // Rotation first: regenerate the identifier and invalidate the old
        // one once it has been in use past the rotation interval.
        if session.rotation_age_ms(now) > self.policy.rotation_interval_ms {
            self.repository.remove(&session.id).await?;
            session.id = generate_token();
            session.last_rotation = now;
        }

        // Then the idle timeout: an expired session is torn down before the
        // request is processed any further, exactly as logout would.
        if session.idle_ms(now) > self.policy.idle_timeout_ms {
            self.repository.remove(&session.id).await?;
            session = Session::anonymous();
        }

        session.last_activity = now;
        session.client_ip = client_ip;
        session.user_agent = user_agent;

        self.repository.put(session.clone()).await?;
        Ok(session)
    }

    /// Persist in-place mutations (login, redirect target, display name)
    pub async fn save(&self, session: &Session) -> Result<(), AuthError> {
        self.repository.put(session.clone()).await
    }

    /// Destroy a session and immediately open a fresh anonymous one so the
    /// caller still has somewhere to put post-logout flash state.
    pub async fn destroy(&self, session: Session) -> Result<Session, AuthError> {
        self.repository.remove(&session.id).await?;

        let mut replacement = Session::anonymous();
        replacement.client_ip = session.client_ip;
        replacement.user_agent = session.user_agent;
        self.repository.put(replacement.clone()).await?;
        Ok(replacement)
    }

    /// Remove a session without opening a replacement. Used when an
    /// identifier is retired mid-request (login regeneration).
    pub async fn discard(&self, id: &SessionId) -> Result<bool, AuthError> {
        self.repository.remove(id).await
    }

    /// Look up a session without applying lifecycle rules (used by tests
    /// and diagnostics).
    pub async fn peek(&self, id: &SessionId) -> Result<Option<Session>, AuthError> {
        self.repository.get(id).await
    }
}
