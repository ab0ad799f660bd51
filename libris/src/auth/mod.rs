// Public API
pub mod audit;
pub mod defaults;
pub mod error;
pub mod facade;
pub mod models;
pub mod moka_session_repository;
pub mod password;
pub mod permissions;
pub mod remember;
pub mod repository;
pub mod session;
pub mod session_store;
pub mod sled_repository;

// Re-export commonly used types
pub use audit::{AuditAction, AuditEntry, AuditSink, MemoryAuditSink, TracingAuditSink};
pub use defaults::seed_default_admin;
pub use error::AuthError;
pub use facade::{
    AccessDecision, Auth, ClientInfo, LoginOutcome, LogoutOutcome, LOGIN_URL, RESET_MESSAGE,
};
pub use models::{
    ProfileUpdate, PublicUser, Registration, Relation, Role, StoredToken, User, UserStats,
    UserStatus,
};
pub use moka_session_repository::MokaSessionRepository;
pub use permissions::PermissionTable;
pub use remember::{AutoLogin, CookieDirective, RememberMeService, REMEMBER_COOKIE};
pub use repository::UserRepository;
pub use session::{current_timestamp_ms, generate_token, Session, SessionId, SessionIdentity};
pub use session_store::{SessionManager, SessionPolicy, SessionRepository};
pub use sled_repository::SledUserRepository;
