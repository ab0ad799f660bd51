use tracing::warn;

pub enum Protocol {
    Http(u16),                  // port
    Https(u16, String, String), // port, cert_path, key_path
}

pub struct Config {
    pub host: String,
    pub http: Protocol,
    pub data_dir: String,
    pub admin_username: String,
    pub admin_email: String,
    pub admin_password: String,
    pub allowed_origins: Vec<String>,
    pub session_timeout_secs: u64,
    pub session_rotation_secs: u64,
    pub remember_ttl_days: u64,
}

impl Config {
    const DEFAULT_ADMIN_USERNAME: &str = "admin";
    const DEFAULT_ADMIN_EMAIL: &str = "admin@libris.local";
    const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
    const DEFAULT_DATA_DIR: &str = "./data";
    const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 3600;
    const DEFAULT_SESSION_ROTATION_SECS: u64 = 300;
    const DEFAULT_REMEMBER_TTL_DAYS: u64 = 30;

    pub fn from_env() -> Self {
        let host = std::env::var("LIBRIS_HOST").unwrap_or_else(|_| "localhost".to_string());
        let http_port = std::env::var("LIBRIS_HTTP_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .unwrap_or(8080);
        let https_port = std::env::var("LIBRIS_HTTPS_PORT")
            .unwrap_or_else(|_| "8443".to_string())
            .parse::<u16>()
            .unwrap_or(8443);
        let tls_cert_path = std::env::var("LIBRIS_TLS_CERT_PATH").ok();
        let tls_key_path = std::env::var("LIBRIS_TLS_KEY_PATH").ok();
        Self {
            host,
            data_dir: std::env::var("LIBRIS_DATA_DIR")
                .unwrap_or_else(|_| Self::DEFAULT_DATA_DIR.to_string()),
            admin_username: std::env::var("LIBRIS_ADMIN_USERNAME")
                .unwrap_or_else(|_| Self::DEFAULT_ADMIN_USERNAME.to_string()),
            admin_email: std::env::var("LIBRIS_ADMIN_EMAIL")
                .unwrap_or_else(|_| Self::DEFAULT_ADMIN_EMAIL.to_string()),
            admin_password: std::env::var("LIBRIS_ADMIN_PASSWORD").unwrap_or_else(|_| {
                warn!("LIBRIS_ADMIN_PASSWORD not set, using default password 'admin123'");
                warn!("⚠️  WARNING: Please change the default admin password immediately!");
                Self::DEFAULT_ADMIN_PASSWORD.to_string()
            }),
            http: match (&tls_cert_path, &tls_key_path) {
                (Some(cert), Some(key)) => Protocol::Https(https_port, cert.clone(), key.clone()),
                _ => Protocol::Http(http_port),
            },
            allowed_origins: std::env::var("LIBRIS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "*".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            session_timeout_secs: env_u64(
                "LIBRIS_SESSION_TIMEOUT_SECS",
                Self::DEFAULT_SESSION_TIMEOUT_SECS,
            ),
            session_rotation_secs: env_u64(
                "LIBRIS_SESSION_ROTATION_SECS",
                Self::DEFAULT_SESSION_ROTATION_SECS,
            ),
            remember_ttl_days: env_u64(
                "LIBRIS_REMEMBER_TTL_DAYS",
                Self::DEFAULT_REMEMBER_TTL_DAYS,
            ),
        }
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

impl Protocol {
    pub fn port(&self) -> u16 {
        match self {
            Protocol::Http(port) => *port,
            Protocol::Https(port, _, _) => *port,
        }
    }

    pub fn is_tls(&self) -> bool {
        matches!(self, Protocol::Https(..))
    }

    pub fn tls_paths(&self) -> Option<(&str, &str)> {
        match self {
            Protocol::Https(_, cert, key) => Some((cert, key)),
            _ => None,
        }
    }

    pub fn scheme(&self) -> &str {
        match self {
            Protocol::Http(..) => "http",
            Protocol::Https(..) => "https",
        }
    }
}
