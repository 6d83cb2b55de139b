//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::time::Duration;

/// Default Belvo sandbox API root
pub const BELVO_SANDBOX_URL: &str = "https://sandbox.belvo.com/api/";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL. `None` runs on the in-memory store.
    pub database_url: Option<String>,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// JWT signing settings
    pub jwt: JwtConfig,

    /// Belvo API location and credentials
    pub belvo: BelvoConfig,
}

/// JWT signing secret and token lifetimes
#[derive(Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

/// Secret id/password pair issued by Belvo for this deployment
#[derive(Clone)]
pub struct BelvoCredentials {
    pub secret_id: String,
    pub secret_password: String,
}

impl BelvoCredentials {
    pub fn new(secret_id: impl Into<String>, secret_password: impl Into<String>) -> Self {
        Self {
            secret_id: secret_id.into(),
            secret_password: secret_password.into(),
        }
    }
}

impl std::fmt::Debug for BelvoCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BelvoCredentials")
            .field("secret_id", &self.secret_id)
            .field("secret_password", &"[REDACTED]")
            .finish()
    }
}

/// Belvo API settings
#[derive(Debug, Clone)]
pub struct BelvoConfig {
    pub api_url: String,
    pub credentials: BelvoCredentials,
    pub timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let database_max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?;

        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());

        let port = parse_or(&lookup, "PORT", 8000)?;

        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string());

        let jwt_secret = required(&lookup, "JWT_SECRET")?;
        let access_ttl_minutes: u64 = parse_or(&lookup, "ACCESS_TOKEN_TTL_MINUTES", 5)?;
        let refresh_ttl_minutes: u64 = parse_or(&lookup, "REFRESH_TOKEN_TTL_MINUTES", 24 * 60)?;

        if access_ttl_minutes == 0 {
            return Err(ConfigError::InvalidValue("ACCESS_TOKEN_TTL_MINUTES"));
        }
        if refresh_ttl_minutes == 0 {
            return Err(ConfigError::InvalidValue("REFRESH_TOKEN_TTL_MINUTES"));
        }

        let mut api_url = lookup("BELVO_API_URL").unwrap_or_else(|| BELVO_SANDBOX_URL.to_string());
        if !api_url.ends_with('/') {
            api_url.push('/');
        }

        let secret_id = required(&lookup, "BELVO_SECRET_ID")?;
        let secret_password = required(&lookup, "BELVO_SECRET_PASSWORD")?;
        let timeout_secs: u64 = parse_or(&lookup, "BELVO_TIMEOUT_SECS", 30)?;

        Ok(Self {
            database_url,
            database_max_connections,
            host,
            port,
            environment,
            jwt: JwtConfig {
                secret: jwt_secret,
                access_ttl: Duration::from_secs(access_ttl_minutes * 60),
                refresh_ttl: Duration::from_secs(refresh_ttl_minutes * 60),
            },
            belvo: BelvoConfig {
                api_url,
                credentials: BelvoCredentials::new(secret_id, secret_password),
                timeout: Duration::from_secs(timeout_secs),
            },
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn required<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::MissingEnv(key))
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue(key)),
        None => Ok(default),
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
