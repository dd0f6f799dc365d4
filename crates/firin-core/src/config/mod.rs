//! Application configuration with layered loading.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. **Compiled defaults**: hardcoded in the struct `Default` implementations
//! 2. **Config file**: TOML file named by the `FIRIN_CONFIG` env var
//! 3. **Environment variables**: `FIRIN_*` vars override specific fields
//!
//! # Validation
//!
//! Configuration is validated at load time. A missing token secret, a zero
//! port, or an empty rate-limit window is a startup error, never a silent
//! per-request failure.
//!
//! # Example
//!
//! ```toml
//! [server]
//! bind_address = "0.0.0.0"
//! bind_port = 3080
//!
//! [security]
//! token_secret = "change-me"
//! token_lifetime_seconds = 3600
//!
//! [rate_limit.actions.login]
//! max_hits = 5
//! window_seconds = 60
//! block_seconds = 300
//!
//! [cors]
//! allowed_origins = ["https://firin.example", "https://*.firin.example"]
//! ```

use crate::middleware::CorsConfig;
use crate::ratelimit::RateLimitPolicy;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// IP address to bind. Defaults to `127.0.0.1`.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port to listen on. Must be greater than 0. Defaults to `3080`.
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,

    /// Maximum concurrent requests. Defaults to `100`.
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    /// Request body cap in bytes. Defaults to 1 MB.
    #[serde(default = "default_body_limit_bytes")]
    pub body_limit_bytes: usize,

    /// Prefix stripped from inbound URIs (deployments under a sub-path).
    /// Defaults to empty.
    #[serde(default)]
    pub base_path: String,

    /// Path prefix treated as the JSON API for error rendering.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_bind_port() -> u16 {
    3080
}

fn default_max_concurrent_requests() -> usize {
    100
}

fn default_body_limit_bytes() -> usize {
    1024 * 1024
}

fn default_api_prefix() -> String {
    "/api".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            bind_port: default_bind_port(),
            max_concurrent_requests: default_max_concurrent_requests(),
            body_limit_bytes: default_body_limit_bytes(),
            base_path: String::new(),
            api_prefix: default_api_prefix(),
        }
    }
}

/// Token signing and debug settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Symmetric signing secret for bearer tokens. Must be non-empty;
    /// validated at load time.
    #[serde(default)]
    pub token_secret: String,

    /// Token lifetime in seconds. Defaults to `3600`.
    #[serde(default = "default_token_lifetime")]
    pub token_lifetime_seconds: i64,

    /// Admin session lifetime in seconds. Defaults to 8 hours.
    #[serde(default = "default_session_lifetime")]
    pub session_lifetime_seconds: i64,

    /// Surface real error messages in responses. Never enable in production.
    #[serde(default)]
    pub debug: bool,
}

fn default_token_lifetime() -> i64 {
    3600
}

fn default_session_lifetime() -> i64 {
    8 * 3600
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            token_secret: String::new(),
            token_lifetime_seconds: default_token_lifetime(),
            session_lifetime_seconds: default_session_lifetime(),
            debug: false,
        }
    }
}

/// Per-action rate-limit policies plus the fallback for unnamed actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_rate_limit_actions")]
    pub actions: HashMap<String, RateLimitPolicy>,

    #[serde(default = "default_rate_limit_fallback")]
    pub default: RateLimitPolicy,
}

fn default_rate_limit_actions() -> HashMap<String, RateLimitPolicy> {
    let mut actions = HashMap::new();
    actions.insert("login".to_string(), RateLimitPolicy::new(5, 60, 300));
    actions.insert("contact".to_string(), RateLimitPolicy::new(3, 60, 300));
    actions.insert("api".to_string(), RateLimitPolicy::new(100, 60, 300));
    actions
}

fn default_rate_limit_fallback() -> RateLimitPolicy {
    RateLimitPolicy::new(100, 60, 300)
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { actions: default_rate_limit_actions(), default: default_rate_limit_fallback() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL. Defaults to an in-memory database, which is
    /// only suitable for tests and local experiments.
    #[serde(default = "default_database_url")]
    pub url: String,
}

fn default_database_url() -> String {
    "sqlite::memory:".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { url: default_database_url() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter when `RUST_LOG` is unset. Defaults to `info`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `pretty` or `json`. Defaults to `pretty`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), format: default_log_format() }
    }
}

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub security: SecurityConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub cors: CorsConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Loads configuration from defaults, the `FIRIN_CONFIG` file, and
    /// `FIRIN_*` environment overrides, then validates it.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] for unreadable files, malformed values, or
    /// failed validation.
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Ok(path) = std::env::var("FIRIN_CONFIG") {
            if Path::new(&path).exists() {
                builder = builder.add_source(File::with_name(&path));
            } else {
                return Err(ConfigError::Message(format!("config file not found: {path}")));
            }
        }

        let config: Self = builder
            .add_source(Environment::with_prefix("FIRIN").separator("__"))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// Rejects configurations that cannot produce a working process: an
    /// empty token secret, a zero port, or degenerate limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.token_secret.trim().is_empty() {
            return Err(ConfigError::Message(
                "security.token_secret must be set".to_string(),
            ));
        }
        if self.security.token_lifetime_seconds <= 0 {
            return Err(ConfigError::Message(
                "security.token_lifetime_seconds must be positive".to_string(),
            ));
        }
        if self.server.bind_port == 0 {
            return Err(ConfigError::Message("server.bind_port must be non-zero".to_string()));
        }
        if self.server.max_concurrent_requests == 0 {
            return Err(ConfigError::Message(
                "server.max_concurrent_requests must be non-zero".to_string(),
            ));
        }

        let mut policies: Vec<(&str, &RateLimitPolicy)> =
            self.rate_limit.actions.iter().map(|(name, policy)| (name.as_str(), policy)).collect();
        policies.push(("default", &self.rate_limit.default));

        for (action, policy) in policies {
            if policy.window_seconds <= 0 {
                return Err(ConfigError::Message(format!(
                    "rate_limit policy '{action}' must have a positive window"
                )));
            }
            if policy.block_seconds < 0 {
                return Err(ConfigError::Message(format!(
                    "rate_limit policy '{action}' must have a non-negative block"
                )));
            }
        }

        Ok(())
    }
}
