use crate::error::{GateError, Result};
use std::env;
use url::Url;

/// Version prefix prepended to every proxied backend path
pub const BACKEND_API_PREFIX: &str = "/api/v1";

const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiServerConfig,
    /// Trading backend configuration
    pub backend: BackendConfig,
    /// Session configuration
    pub session: SessionConfig,
    /// Inbound webhook configuration
    pub webhook: WebhookConfig,
    /// Credential vault configuration
    pub vault: VaultConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Logging configuration
    pub log: LogConfig,
}

#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Port for the API server (default: 3001)
    pub port: u16,
    /// Host to bind to (default: 0.0.0.0)
    pub host: String,
    /// Allowed CORS origins (comma-separated, empty = localhost only)
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Backend origin, without trailing slash (default: http://localhost:8000)
    pub base_url: String,
}

impl BackendConfig {
    /// Full URL for a backend path, e.g. `/bots` -> `http://host/api/v1/bots`
    pub fn endpoint(&self, backend_path: &str) -> String {
        format!("{}{}{}", self.base_url, BACKEND_API_PREFIX, backend_path)
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Secret for signing session tokens (empty = random per process)
    pub jwt_secret: String,
    /// Name of the session cookie
    pub cookie_name: String,
    /// Session lifetime in hours
    pub ttl_hours: i64,
}

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Maximum signals per webhook per window
    pub rate_limit_max: u32,
    /// Rate limit window in milliseconds
    pub rate_limit_window_ms: u64,
    /// Reject signals that carry no signature at all
    pub require_signature: bool,
    /// How often expired rate limit windows are swept, in seconds
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Master key used to derive per-record encryption keys
    pub encryption_key: String,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database host
    pub host: String,
    /// Database port
    pub port: u16,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Database name
    pub name: String,
    /// SSL mode (disable, require, prefer)
    pub ssl_mode: String,
    /// Maximum connections in pool
    pub max_connections: u32,
    /// Minimum connections in pool
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level (debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            api: ApiServerConfig {
                port: get_env_or("API_PORT", "3001").parse().map_err(|_| {
                    GateError::InvalidConfig("API_PORT must be a valid port number".into())
                })?,
                host: get_env_or("API_HOST", "0.0.0.0"),
                cors_origins: get_env_or("CORS_ORIGINS", "")
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            backend: BackendConfig {
                base_url: parse_backend_url(&get_env_or("BACKEND_URL", "http://localhost:8000"))?,
            },
            session: SessionConfig {
                jwt_secret: get_env_or("JWT_SECRET", ""),
                cookie_name: get_env_or("SESSION_COOKIE", "tg_session"),
                ttl_hours: parse_session_ttl(&get_env_or("SESSION_TTL_HOURS", "24"))?,
            },
            webhook: WebhookConfig {
                rate_limit_max: get_env_or("WEBHOOK_RATE_LIMIT_MAX", "60")
                    .parse()
                    .map_err(|_| {
                        GateError::InvalidConfig("WEBHOOK_RATE_LIMIT_MAX must be a number".into())
                    })?,
                rate_limit_window_ms: get_env_or("WEBHOOK_RATE_LIMIT_WINDOW_MS", "60000")
                    .parse()
                    .map_err(|_| {
                        GateError::InvalidConfig(
                            "WEBHOOK_RATE_LIMIT_WINDOW_MS must be a number".into(),
                        )
                    })?,
                require_signature: get_env_or("WEBHOOK_REQUIRE_SIGNATURE", "false")
                    .parse()
                    .unwrap_or(false),
                sweep_interval_secs: get_env_or("RATE_LIMIT_SWEEP_SECS", "300")
                    .parse()
                    .unwrap_or(300),
            },
            vault: VaultConfig {
                encryption_key: get_env_or("ENCRYPTION_KEY", ""),
            },
            database: DatabaseConfig {
                host: get_env_or("DB_HOST", "localhost"),
                port: get_env_or("DB_PORT", "5432").parse().map_err(|_| {
                    GateError::InvalidConfig("DB_PORT must be a valid port number".into())
                })?,
                user: get_env_or("DB_USER", "tradegate"),
                password: get_env_or("DB_PASSWORD", "tradegate_password"),
                name: get_env_or("DB_NAME", "tradegate"),
                ssl_mode: get_env_or("DB_SSLMODE", "disable"),
                max_connections: get_env_or("DB_MAX_CONNECTIONS", "20")
                    .parse()
                    .map_err(|_| {
                        GateError::InvalidConfig("DB_MAX_CONNECTIONS must be a valid number".into())
                    })?,
                min_connections: get_env_or("DB_MIN_CONNECTIONS", "2").parse().map_err(|_| {
                    GateError::InvalidConfig("DB_MIN_CONNECTIONS must be a valid number".into())
                })?,
            },
            log: LogConfig {
                level: get_env_or("LOG_LEVEL", "info"),
                format: get_env_or("LOG_FORMAT", "json"),
            },
        })
    }

    /// Get the API server address
    pub fn api_addr(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

/// Session lifetime in hours, at most one year
fn parse_session_ttl(raw: &str) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|hours| (1..=MAX_SESSION_TTL_HOURS).contains(hours))
        .ok_or_else(|| {
            GateError::InvalidConfig(format!(
                "SESSION_TTL_HOURS must be between 1 and {}",
                MAX_SESSION_TTL_HOURS
            ))
        })
}

/// Validate the backend origin and normalize it to `scheme://host[:port][/base]`
fn parse_backend_url(raw: &str) -> Result<String> {
    let raw = raw.trim();
    let url = Url::parse(raw).map_err(|e| {
        GateError::InvalidConfig(format!("BACKEND_URL must be a valid URL: {}", e))
    })?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(GateError::InvalidConfig(format!(
                "BACKEND_URL has unsupported scheme: {}",
                other
            )))
        }
    }

    if url.host_str().is_none() {
        return Err(GateError::InvalidConfig(
            "BACKEND_URL must include a host".into(),
        ));
    }

    if url.query().is_some() || url.fragment().is_some() {
        return Err(GateError::InvalidConfig(
            "BACKEND_URL must not include query/fragment".into(),
        ));
    }

    Ok(raw.trim_end_matches('/').to_string())
}

/// Get environment variable with a default value
fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
