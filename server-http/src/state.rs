use libris::auth::{Auth, MokaSessionRepository};
use std::sync::Arc;

/// Server state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<Auth<MokaSessionRepository>>,
    /// Mark cookies Secure (set when serving over TLS)
    pub secure_cookies: bool,
}

impl AppState {
    pub fn new(auth: Arc<Auth<MokaSessionRepository>>, secure_cookies: bool) -> Self {
        Self {
            auth,
            secure_cookies,
        }
    }
}
