use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

/// Security-relevant actions worth an immutable trail entry. Auto-login is
/// recorded separately from interactive login so the two can be told apart
/// during review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    LoginSucceeded,
    LoginFailed,
    AutoLogin,
    Logout,
    Registered,
    PasswordChanged,
    PasswordResetRequested,
    ProfileUpdated,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub action: AuditAction,
    pub table: Option<&'static str>,
    pub record_id: Option<String>,
    pub actor_user_id: Option<String>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(action: AuditAction) -> Self {
        Self {
            action,
            table: None,
            record_id: None,
            actor_user_id: None,
            client_ip: None,
            user_agent: None,
            at: Utc::now(),
        }
    }

    pub fn on_user(mut self, user_id: impl Into<String>) -> Self {
        self.table = Some("users");
        self.record_id = Some(user_id.into());
        self
    }

    pub fn by(mut self, actor_user_id: impl Into<String>) -> Self {
        self.actor_user_id = Some(actor_user_id.into());
        self
    }

    pub fn from_client(mut self, ip: Option<String>, user_agent: Option<String>) -> Self {
        self.client_ip = ip;
        self.user_agent = user_agent;
        self
    }
}

/// Fire-and-forget audit boundary. Implementations must never fail the
/// triggering operation; there is no Result to propagate.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: AuditEntry);
}

/// Writes audit entries to the tracing pipeline as structured events.
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, entry: AuditEntry) {
        tracing::info!(
            action = ?entry.action,
            table = entry.table,
            record_id = entry.record_id.as_deref(),
            actor = entry.actor_user_id.as_deref(),
            client_ip = entry.client_ip.as_deref(),
            "audit"
        );
    }
}

/// In-memory sink, handy for tests and for surfacing recent activity in an
/// admin view.
#[derive(Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().clone()
    }

    pub fn actions(&self) -> Vec<AuditAction> {
        self.entries.lock().iter().map(|e| e.action).collect()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, entry: AuditEntry) {
        self.entries.lock().push(entry);
    }
}
