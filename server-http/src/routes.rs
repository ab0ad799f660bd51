use crate::handlers;
use crate::middleware::session_middleware;
use crate::state::AppState;
use axum::{
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::normalize_path::NormalizePathLayer;
use tower_http::trace::TraceLayer;

/// Build and configure the application router
pub fn build_router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Auth routes
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/session", get(handlers::auth::session_info))
        .route("/auth/reset-password", post(handlers::auth::reset_password))
        // Account self-service routes
        .route("/profile", put(handlers::profile::update_profile))
        .route("/profile/password", put(handlers::profile::change_password))
        .route("/profile/stats", get(handlers::profile::stats))
        // Middleware
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ))
        .layer(cors_layer(allowed_origins))
        .layer(NormalizePathLayer::trim_trailing_slash())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    if allowed_origins.iter().any(|origin| origin == "*") {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        layer.allow_origin(AllowOrigin::list(origins))
    }
}
