//! Service configuration.

use config::{Config as ConfigLoader, Environment, File};
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server host (default: 0.0.0.0)
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port (default: 8080)
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub clerk: ClerkConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub routes: RoutesConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite URL, `sqlite:` prefix optional. `:memory:` keeps the mirror in RAM.
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

/// Identity provider settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ClerkConfig {
    /// Backend API base URL.
    #[serde(default = "default_clerk_api_url")]
    pub api_url: String,
    /// Backend API secret key.
    pub secret_key: String,
    /// Issuer of session tokens (the Frontend API URL).
    pub issuer: String,
    /// Accepted `azp` values of session tokens. Empty disables the check.
    #[serde(default)]
    pub authorized_parties: Vec<String>,
    /// Webhook signing secret (`whsec_...`). The webhook endpoint answers 500
    /// until this is set.
    #[serde(default)]
    pub webhook_secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// Maximum clock skew accepted on `svix-timestamp`.
    #[serde(default = "default_tolerance_secs")]
    pub tolerance_secs: u64,
    /// How long processed delivery ids are remembered.
    #[serde(default = "default_dedup_retention_hours")]
    pub dedup_retention_hours: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            tolerance_secs: default_tolerance_secs(),
            dedup_retention_hours: default_dedup_retention_hours(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoutesConfig {
    /// Where blocked users are redirected.
    #[serde(default = "default_blocked_path")]
    pub blocked_path: String,
    /// Path patterns (regular expressions, anchored) that require a session.
    #[serde(default = "default_protected")]
    pub protected: Vec<String>,
    /// Path prefixes served as static assets, skipped by the sync middleware.
    #[serde(default = "default_static_prefixes")]
    pub static_prefixes: Vec<String>,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            blocked_path: default_blocked_path(),
            protected: default_protected(),
            static_prefixes: default_static_prefixes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Let requests through when the mirror cannot be read or written.
    #[serde(default = "default_true")]
    pub fail_open: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            fail_open: default_true(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReconcileConfig {
    #[serde(default = "default_reconcile_interval")]
    pub interval_secs: u64,
    /// Outbox entries applied per pass.
    #[serde(default = "default_reconcile_batch")]
    pub batch_size: u32,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_reconcile_interval(),
            batch_size: default_reconcile_batch(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated allowed origins, `*` for any.
    #[serde(default = "default_cors_origins")]
    pub origins: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origins: default_cors_origins(),
        }
    }
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_database_url() -> String {
    "sqlite:./data/mirror.db".to_string()
}
fn default_max_connections() -> u32 {
    8
}
fn default_clerk_api_url() -> String {
    "https://api.clerk.com".to_string()
}
fn default_tolerance_secs() -> u64 {
    300
}
fn default_dedup_retention_hours() -> u64 {
    72
}
fn default_blocked_path() -> String {
    "/blocked".to_string()
}
fn default_protected() -> Vec<String> {
    vec!["/admin(.*)".to_string(), "/api/admin(.*)".to_string()]
}
fn default_static_prefixes() -> Vec<String> {
    vec!["/_next".to_string(), "/static".to_string()]
}
fn default_true() -> bool {
    true
}
fn default_reconcile_interval() -> u64 {
    30
}
fn default_reconcile_batch() -> u32 {
    50
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_cors_origins() -> String {
    "*".to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid protected route pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error("Invalid value for {0}")]
    Invalid(&'static str),
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. Environment variables (MIRRORGATE__SECTION__KEY format)
    /// 2. config.toml file (if present)
    /// 3. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        let loaded = ConfigLoader::builder()
            .add_source(File::with_name("config").required(false))
            .add_source(
                Environment::with_prefix("MIRRORGATE")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("routes.protected")
                    .with_list_parse_key("routes.static_prefixes")
                    .with_list_parse_key("clerk.authorized_parties")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = loaded.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that deserialize fine but cannot work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.clerk.secret_key.trim().is_empty() {
            return Err(ConfigError::Invalid("clerk.secret_key"));
        }
        if self.clerk.issuer.trim().is_empty() {
            return Err(ConfigError::Invalid("clerk.issuer"));
        }
        if !self.routes.blocked_path.starts_with('/') {
            return Err(ConfigError::Invalid("routes.blocked_path"));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid("database.max_connections"));
        }
        if self.reconcile.interval_secs == 0 {
            return Err(ConfigError::Invalid("reconcile.interval_secs"));
        }
        Ok(())
    }
}
