use libris::auth::{
    seed_default_admin, Auth, MokaSessionRepository, PermissionTable, RememberMeService,
    SessionManager, SessionPolicy, SledUserRepository, TracingAuditSink, UserRepository,
};
use shared::Config;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn, Level};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    info!("Starting Libris Server");

    // Load environment variables
    match dotenvy::dotenv() {
        Ok(_) => info!("Loaded environment variables from .env file"),
        Err(_) => info!("No .env file found, using system environment variables"),
    }

    let config = Config::from_env();

    // ============================================
    // STEP 1: Initialize credential store
    // ============================================
    let data_path = std::path::Path::new(&config.data_dir).join(".libris");
    std::fs::create_dir_all(&data_path)?;

    let user_repository: Arc<dyn UserRepository> =
        Arc::new(SledUserRepository::new(data_path.join("users.sled"))?);

    info!("Seeding default admin account if missing...");
    seed_default_admin(
        &user_repository,
        &config.admin_username,
        &config.admin_email,
        &config.admin_password,
    )
    .await?;

    // ============================================
    // STEP 2: Initialize session layer
    // ============================================
    // Moka eviction is a backstop well behind the idle timeout
    let session_repository = Arc::new(MokaSessionRepository::new(
        None,
        Some(Duration::from_secs(config.session_timeout_secs * 2)),
    ));
    let session_manager = Arc::new(SessionManager::new(
        session_repository,
        SessionPolicy::from_secs(config.session_timeout_secs, config.session_rotation_secs),
    ));

    // ============================================
    // STEP 3: Assemble the auth facade
    // ============================================
    let auth = Arc::new(Auth::new(
        user_repository.clone(),
        session_manager,
        RememberMeService::new(user_repository.clone(), config.remember_ttl_days as i64),
        PermissionTable::default(),
        Arc::new(TracingAuditSink),
    ));

    // ============================================
    // STEP 4: Start the HTTP server
    // ============================================
    if let Some((cert_path, key_path)) = config.http.tls_paths() {
        // TLS termination is left to a fronting proxy; the cert paths only
        // flag that cookies must be marked Secure.
        warn!(
            cert_path,
            key_path, "TLS cert paths set; serving plain HTTP behind a TLS-terminating proxy"
        );
    }
    let app_state = server_http::AppState::new(auth, config.http.is_tls());
    let router = server_http::build_router(app_state, &config.allowed_origins);

    let bind_address = format!("{}:{}", config.host, config.http.port());
    let listener = TcpListener::bind(&bind_address).await?;

    info!(
        "Libris listening on {}://{}",
        config.http.scheme(),
        bind_address
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Libris server shutting down");
    Ok(())
}

// Graceful shutdown handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }

    info!("Shutting down gracefully...");
}
