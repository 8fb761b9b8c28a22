//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `FIREBASE_PROJECT_ID` - Firebase project hosting the catalog
//! - `FIREBASE_API_KEY` - Web API key (high entropy, placeholders rejected)
//!
//! ## Optional
//! - `FIRESTORE_DATABASE` - Database id (default: `(default)`)
//! - `FIRESTORE_BASE_URL` - REST endpoint (default: `https://firestore.googleapis.com/v1/`)
//! - `IDENTITY_TOOLKIT_BASE_URL` - Auth endpoint (default: `https://identitytoolkit.googleapis.com/v1/`)
//! - `ZONAGAMER_STORAGE_PATH` - Local storage file (default: `.zonagamer/storage.json`)
//! - `ZONAGAMER_GAMES_CACHE_TTL_SECS` - Games cache lifetime (default: 600)
//! - `ZONAGAMER_COMBOS_CACHE_TTL_SECS` - Combos cache lifetime (default: 1800)
//! - `ZONAGAMER_REPORTS_LIMIT` - Default report query limit (default: 100)
//! - `ZONAGAMER_WRITE_LEGACY_FIELDS` - Keep writing `costo`/`isOffert` (default: true)

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use zona_gamer_core::ItemKind;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

const DEFAULT_FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1/";
const DEFAULT_IDENTITY_TOOLKIT_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1/";

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

/// Storefront data layer configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Firebase project access
    pub firebase: FirebaseConfig,
    /// File backing the local key/value storage
    pub storage_path: PathBuf,
    /// Non-secret tuning knobs
    pub settings: StoreSettings,
}

/// Firebase project access.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct FirebaseConfig {
    pub project_id: String,
    pub api_key: SecretString,
    /// Firestore database id, usually `(default)`
    pub database: String,
    pub firestore_base_url: Url,
    pub identity_toolkit_base_url: Url,
}

impl std::fmt::Debug for FirebaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseConfig")
            .field("project_id", &self.project_id)
            .field("api_key", &"[REDACTED]")
            .field("database", &self.database)
            .field("firestore_base_url", &self.firestore_base_url.as_str())
            .field(
                "identity_toolkit_base_url",
                &self.identity_toolkit_base_url.as_str(),
            )
            .finish()
    }
}

/// Settings that need no secrets, so tests can build them directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    pub games_cache_ttl: Duration,
    pub combos_cache_ttl: Duration,
    /// Limit applied to report queries when the caller gives none.
    pub reports_limit: usize,
    /// Also write `costo` and `isOffert` for clients that predate the price
    /// quad and promotion type.
    pub write_legacy_fields: bool,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            games_cache_ttl: Duration::from_secs(10 * 60),
            combos_cache_ttl: Duration::from_secs(30 * 60),
            reports_limit: 100,
            write_legacy_fields: true,
        }
    }
}

impl StoreSettings {
    /// Cache lifetime for one catalog.
    #[must_use]
    pub const fn cache_ttl(&self, kind: ItemKind) -> Duration {
        match kind {
            ItemKind::Game => self.games_cache_ttl,
            ItemKind::Combo => self.combos_cache_ttl,
        }
    }

    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            games_cache_ttl: get_parsed_or(
                "ZONAGAMER_GAMES_CACHE_TTL_SECS",
                defaults.games_cache_ttl.as_secs(),
            )
            .map(Duration::from_secs)?,
            combos_cache_ttl: get_parsed_or(
                "ZONAGAMER_COMBOS_CACHE_TTL_SECS",
                defaults.combos_cache_ttl.as_secs(),
            )
            .map(Duration::from_secs)?,
            reports_limit: get_parsed_or("ZONAGAMER_REPORTS_LIMIT", defaults.reports_limit)?,
            write_legacy_fields: get_parsed_or(
                "ZONAGAMER_WRITE_LEGACY_FIELDS",
                defaults.write_legacy_fields,
            )?,
        })
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the API key fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let firebase = FirebaseConfig::from_env()?;
        let storage_path = PathBuf::from(get_env_or_default(
            "ZONAGAMER_STORAGE_PATH",
            ".zonagamer/storage.json",
        ));
        let settings = StoreSettings::from_env()?;

        Ok(Self {
            firebase,
            storage_path,
            settings,
        })
    }
}

impl FirebaseConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            project_id: get_required_env("FIREBASE_PROJECT_ID")?,
            api_key: get_validated_secret("FIREBASE_API_KEY")?,
            database: get_env_or_default("FIRESTORE_DATABASE", "(default)"),
            firestore_base_url: get_url_or_default(
                "FIRESTORE_BASE_URL",
                DEFAULT_FIRESTORE_BASE_URL,
            )?,
            identity_toolkit_base_url: get_url_or_default(
                "IDENTITY_TOOLKIT_BASE_URL",
                DEFAULT_IDENTITY_TOOLKIT_BASE_URL,
            )?,
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

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an optional environment variable, falling back to `default`.
fn get_parsed_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Parse a base URL, making sure it ends with `/` so joins append.
fn get_url_or_default(key: &str, default: &str) -> Result<Url, ConfigError> {
    let mut raw = get_env_or_default(key, default);
    if !raw.ends_with('/') {
        raw.push('/');
    }
    Url::parse(&raw).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
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
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
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
