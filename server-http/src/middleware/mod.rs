pub mod guards;
pub mod session;

pub use guards::enforce;
pub use session::session_middleware;
