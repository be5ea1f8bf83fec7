//! Sync service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SYNC_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `WOOCOMMERCE_URL` - Base URL of the WooCommerce site (e.g., `https://shop.example.com.au`)
//! - `WOOCOMMERCE_CONSUMER_KEY` - REST API consumer key
//! - `WOOCOMMERCE_CONSUMER_SECRET` - REST API consumer secret (high entropy)
//! - `WOOCOMMERCE_WEBHOOK_SECRET` - Shared webhook signing secret (high entropy)
//!
//! ## Optional
//! - `SYNC_HOST` - Bind address (default: 127.0.0.1)
//! - `SYNC_PORT` - Listen port (default: 3100)
//! - `WOOCOMMERCE_API_VERSION` - REST API version (default: wc/v3)
//! - `BACKFILL_DEFAULT_CUTOVER` - RFC 3339 cutover used when a request omits one
//!   (default: 2024-01-01T00:00:00Z)
//! - `BACKFILL_RATE_LIMIT_MAX` - Backfill requests allowed per email per window (default: 3)
//! - `BACKFILL_RATE_LIMIT_WINDOW_SECS` - Sliding window length (default: 900)
//! - `BACKFILL_PAGE_SIZE` - Orders per platform page, 1-100 (default: 50)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// WooCommerce caps `per_page` at 100.
const MAX_PAGE_SIZE: u32 = 100;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Sync service configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// WooCommerce REST API and webhook configuration
    pub woocommerce: WooCommerceConfig,
    /// Historical backfill tuning
    pub backfill: BackfillConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name (e.g., production)
    pub sentry_environment: Option<String>,
}

/// WooCommerce API configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct WooCommerceConfig {
    /// Site base URL; the REST API lives under `/wp-json/`
    pub base_url: Url,
    /// REST API namespace and version (e.g., `wc/v3`)
    pub api_version: String,
    /// REST API consumer key (basic auth username)
    pub consumer_key: String,
    /// REST API consumer secret (basic auth password)
    pub consumer_secret: SecretString,
    /// Secret used to sign webhook deliveries
    pub webhook_secret: SecretString,
}

impl std::fmt::Debug for WooCommerceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WooCommerceConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_version", &self.api_version)
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .finish()
    }
}

/// Historical backfill configuration.
#[derive(Debug, Clone)]
pub struct BackfillConfig {
    /// Cutover used when the client does not send one
    pub default_cutover: DateTime<Utc>,
    /// Requests allowed per email within `rate_limit_window`
    pub rate_limit_max: u32,
    /// Sliding window length for the per-email limit
    pub rate_limit_window: Duration,
    /// Orders requested per platform page
    pub page_size: u32,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            default_cutover: default_cutover(),
            rate_limit_max: 3,
            rate_limit_window: Duration::from_secs(15 * 60),
            page_size: 50,
        }
    }
}

/// `2024-01-01T00:00:00Z`, the date webhooks were switched on.
fn default_cutover() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

impl SyncConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("SYNC_DATABASE_URL")?;
        let host = get_parsed_env_or_default("SYNC_HOST", "127.0.0.1")?;
        let port = get_parsed_env_or_default("SYNC_PORT", "3100")?;

        let woocommerce = WooCommerceConfig::from_env()?;
        let backfill = BackfillConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            woocommerce,
            backfill,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl WooCommerceConfig {
    /// Load the WooCommerce settings on their own.
    ///
    /// Used by the CLI, which talks to the platform without serving HTTP.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw_url = get_required_env("WOOCOMMERCE_URL")?;
        let base_url = Url::parse(&raw_url)
            .map_err(|e| ConfigError::InvalidEnvVar("WOOCOMMERCE_URL".to_string(), e.to_string()))?;

        Ok(Self {
            base_url,
            api_version: get_env_or_default("WOOCOMMERCE_API_VERSION", "wc/v3"),
            consumer_key: get_required_env("WOOCOMMERCE_CONSUMER_KEY")?,
            consumer_secret: get_validated_secret("WOOCOMMERCE_CONSUMER_SECRET")?,
            webhook_secret: get_validated_secret("WOOCOMMERCE_WEBHOOK_SECRET")?,
        })
    }
}

impl BackfillConfig {
    /// Load backfill tuning, falling back to [`BackfillConfig::default`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if a value does not parse or is
    /// out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let default_cutover = match get_optional_env("BACKFILL_DEFAULT_CUTOVER") {
            Some(raw) => DateTime::parse_from_rfc3339(&raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| {
                    ConfigError::InvalidEnvVar("BACKFILL_DEFAULT_CUTOVER".to_string(), e.to_string())
                })?,
            None => defaults.default_cutover,
        };

        let rate_limit_max: u32 = get_parsed_env_or_default("BACKFILL_RATE_LIMIT_MAX", "3")?;
        if rate_limit_max == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "BACKFILL_RATE_LIMIT_MAX".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let window_secs: u64 = get_parsed_env_or_default("BACKFILL_RATE_LIMIT_WINDOW_SECS", "900")?;
        let page_size: u32 = get_parsed_env_or_default("BACKFILL_PAGE_SIZE", "50")?;
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::InvalidEnvVar(
                "BACKFILL_PAGE_SIZE".to_string(),
                format!("must be between 1 and {MAX_PAGE_SIZE}"),
            ));
        }

        Ok(Self {
            default_cutover,
            rate_limit_max,
            rate_limit_window: Duration::from_secs(window_secs),
            page_size,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if neither variable is set.
pub fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get an environment variable parsed as `T`, with a default value.
fn get_parsed_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
