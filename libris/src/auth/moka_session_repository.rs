use super::error::AuthError;
use super::session::{Session, SessionId};
use super::session_store::SessionRepository;
use async_trait::async_trait;
use moka::future::Cache;
use std::time::Duration;

/// Moka-based in-memory session repository. The cache TTL is a backstop
/// behind the manager's own idle-timeout handling: entries the manager never
/// revisits still get evicted eventually.
pub struct MokaSessionRepository {
    sessions: Cache<SessionId, Session>,
}

impl MokaSessionRepository {
    pub fn new(max_sessions: Option<u64>, eviction_ttl: Option<Duration>) -> Self {
        let mut builder = Cache::builder();

        if let Some(capacity) = max_sessions {
            builder = builder.max_capacity(capacity);
        }

        if let Some(ttl) = eviction_ttl {
            builder = builder.time_to_idle(ttl);
        }

        Self {
            sessions: builder.build(),
        }
    }

    /// Unbounded capacity, 2 hour eviction backstop
    pub fn with_defaults() -> Self {
        Self::new(None, Some(Duration::from_secs(7200)))
    }
}

#[async_trait]
impl SessionRepository for MokaSessionRepository {
    async fn get(&self, id: &SessionId) -> Result<Option<Session>, AuthError> {
        Ok(self.sessions.get(id).await)
    }

    async fn put(&self, session: Session) -> Result<(), AuthError> {
        self.sessions.insert(session.id.clone(), session).await;
        Ok(())
    }

    async fn remove(&self, id: &SessionId) -> Result<bool, AuthError> {
        Ok(self.sessions.remove(id).await.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_remove_roundtrip() {
        let repo = MokaSessionRepository::with_defaults();
        let session = Session::anonymous();
        let id = session.id.clone();

        repo.put(session).await.unwrap();
        assert!(repo.get(&id).await.unwrap().is_some());

        assert!(repo.remove(&id).await.unwrap());
        assert!(repo.get(&id).await.unwrap().is_none());
        assert!(!repo.remove(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_put_overwrites_existing_entry() {
        let repo = MokaSessionRepository::with_defaults();
        let mut session = Session::anonymous();
        let id = session.id.clone();
        repo.put(session.clone()).await.unwrap();

        session.redirect_after_login = Some("/books".to_string());
        repo.put(session).await.unwrap();

        let stored = repo.get(&id).await.unwrap().unwrap();
        assert_eq!(stored.redirect_after_login.as_deref(), Some("/books"));
    }
}
