use std::net::SocketAddr;
use std::path::PathBuf;

/// Application configuration, passed explicitly into the orchestrator and
/// both binaries at construction. No component reads the process environment
/// on its own.
#[derive(Clone)]
pub struct AppConfig {
    /// Postgres connection string. `None` means CSV-only publishing.
    pub database_url: Option<String>,
    pub bind_addr: SocketAddr,
    pub log_level: String,

    pub youtube_api_key: Option<String>,
    pub youtube_channel_id: Option<String>,
    pub vimeo_access_token: Option<String>,
    pub vimeo_user_id: Option<String>,

    /// Default path for the intermediate/companion CSV sink.
    pub default_csv_path: PathBuf,

    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,

    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
}

impl AppConfig {
    /// The database URL, for callers that cannot run without Postgres.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] when `DATABASE_URL` was not set.
    pub fn require_database_url(&self) -> Result<&str, crate::ConfigError> {
        self.database_url
            .as_deref()
            .ok_or_else(|| crate::ConfigError::MissingEnvVar("DATABASE_URL".to_string()))
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &self.database_url.as_ref().map(|_| "[redacted]"))
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field(
                "youtube_api_key",
                &self.youtube_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("youtube_channel_id", &self.youtube_channel_id)
            .field(
                "vimeo_access_token",
                &self.vimeo_access_token.as_ref().map(|_| "[redacted]"),
            )
            .field("vimeo_user_id", &self.vimeo_user_id)
            .field("default_csv_path", &self.default_csv_path)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .finish()
    }
}
