//! Synchronizer configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `COMMERCE_API_BASE_URL` - Remote store base URL (default: `http://127.0.0.1:8000/api/`)
//! - `COMMERCE_REMOTE_TIMEOUT_MS` - Upper bound for each remote call (default: 8000)
//! - `COMMERCE_CATALOG_TTL_SECS` - Read-through cache TTL (default: 30)
//! - `COMMERCE_CATALOG_CACHE_CAPACITY` - Max cached catalog reads (default: 1000)
//! - `COMMERCE_STORE_NAMESPACE` - Prefix for local cache keys (default: `np`)
//! - `COMMERCE_DATA_DIR` - Directory for the file-backed local store (default: `.np-commerce`)
//! - `COMMERCE_USER_ID` / `COMMERCE_ACCESS_TOKEN` - Signed-in shopper; both or neither
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::time::Duration;

use np_commerce_core::{Identity, UserId};
use thiserror::Error;
use url::Url;

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api/";
const DEFAULT_REMOTE_TIMEOUT_MS: u64 = 8000;
const DEFAULT_CATALOG_TTL_SECS: u64 = 30;
const DEFAULT_CATALOG_CAPACITY: u64 = 1000;
const DEFAULT_NAMESPACE: &str = "np";
const DEFAULT_DATA_DIR: &str = ".np-commerce";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Tunables the synchronizer itself needs. Independent of where they came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Bound on every remote call; expiry counts as unreachable
    pub remote_timeout: Duration,
    /// How long a catalog read stays fresh
    pub catalog_ttl: Duration,
    /// Max entries in the catalog cache
    pub catalog_capacity: u64,
    /// Local cache key prefix
    pub namespace: String,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            remote_timeout: Duration::from_millis(DEFAULT_REMOTE_TIMEOUT_MS),
            catalog_ttl: Duration::from_secs(DEFAULT_CATALOG_TTL_SECS),
            catalog_capacity: DEFAULT_CATALOG_CAPACITY,
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

/// Full process configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Remote store base URL, always ending in `/`
    pub api_base_url: Url,
    pub options: SyncOptions,
    /// Directory holding the file-backed local store
    pub data_dir: PathBuf,
    /// Shopper the process acts as
    pub identity: Identity,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl SyncConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid, or if only
    /// one of `COMMERCE_USER_ID` / `COMMERCE_ACCESS_TOKEN` is set.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`SyncConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let api_base_url = parse_base_url(
            "COMMERCE_API_BASE_URL",
            &get_or("COMMERCE_API_BASE_URL", DEFAULT_API_BASE_URL),
        )?;

        let timeout_ms = parse_positive(
            "COMMERCE_REMOTE_TIMEOUT_MS",
            &get_or("COMMERCE_REMOTE_TIMEOUT_MS", &DEFAULT_REMOTE_TIMEOUT_MS.to_string()),
        )?;
        let ttl_secs = parse_positive(
            "COMMERCE_CATALOG_TTL_SECS",
            &get_or("COMMERCE_CATALOG_TTL_SECS", &DEFAULT_CATALOG_TTL_SECS.to_string()),
        )?;
        let catalog_capacity = parse_u64(
            "COMMERCE_CATALOG_CACHE_CAPACITY",
            &get_or("COMMERCE_CATALOG_CACHE_CAPACITY", &DEFAULT_CATALOG_CAPACITY.to_string()),
        )?;

        let namespace = get_or("COMMERCE_STORE_NAMESPACE", DEFAULT_NAMESPACE);
        if namespace.trim().is_empty() {
            return Err(ConfigError::InvalidEnvVar(
                "COMMERCE_STORE_NAMESPACE".to_string(),
                "must not be empty".to_string(),
            ));
        }

        let identity = parse_identity(
            lookup("COMMERCE_USER_ID"),
            lookup("COMMERCE_ACCESS_TOKEN"),
        )?;

        Ok(Self {
            api_base_url,
            options: SyncOptions {
                remote_timeout: Duration::from_millis(timeout_ms),
                catalog_ttl: Duration::from_secs(ttl_secs),
                catalog_capacity,
                namespace,
            },
            data_dir: PathBuf::from(get_or("COMMERCE_DATA_DIR", DEFAULT_DATA_DIR)),
            identity,
            sentry_dsn: lookup("SENTRY_DSN").filter(|dsn| !dsn.is_empty()),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse the base URL, adding the trailing slash `Url::join` needs.
fn parse_base_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let mut url =
        Url::parse(raw).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "not a base URL".to_string(),
        ));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn parse_u64(key: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn parse_positive(key: &str, raw: &str) -> Result<u64, ConfigError> {
    match parse_u64(key, raw)? {
        0 => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        )),
        n => Ok(n),
    }
}

fn parse_identity(user_id: Option<String>, token: Option<String>) -> Result<Identity, ConfigError> {
    match (user_id, token) {
        (None, None) => Ok(Identity::Anonymous),
        (Some(user_id), Some(token)) => {
            let user_id = user_id.trim().parse::<UserId>().map_err(|e| {
                ConfigError::InvalidEnvVar("COMMERCE_USER_ID".to_string(), e.to_string())
            })?;
            Ok(Identity::authenticated(user_id, token))
        }
        (Some(_), None) => Err(ConfigError::MissingEnvVar(
            "COMMERCE_ACCESS_TOKEN".to_string(),
        )),
        (None, Some(_)) => Err(ConfigError::MissingEnvVar("COMMERCE_USER_ID".to_string())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<SyncConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        SyncConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.api_base_url.as_str(), "http://127.0.0.1:8000/api/");
        assert_eq!(config.options, SyncOptions::default());
        assert_eq!(config.options.catalog_ttl, Duration::from_secs(30));
        assert_eq!(config.data_dir, PathBuf::from(".np-commerce"));
        assert!(!config.identity.is_authenticated());
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let config = load(&[("COMMERCE_API_BASE_URL", "https://shop.example/api/v2")]).unwrap();
        assert_eq!(config.api_base_url.as_str(), "https://shop.example/api/v2/");
    }

    #[test]
    fn test_invalid_base_url() {
        let err = load(&[("COMMERCE_API_BASE_URL", "not a url")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnvVar(ref k, _) if k == "COMMERCE_API_BASE_URL"
        ));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = load(&[("COMMERCE_REMOTE_TIMEOUT_MS", "0")]).unwrap_err();
        assert!(err.to_string().contains("must be greater than zero"));
    }

    #[test]
    fn test_non_numeric_ttl_rejected() {
        let err = load(&[("COMMERCE_CATALOG_TTL_SECS", "soon")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnvVar(ref k, _) if k == "COMMERCE_CATALOG_TTL_SECS"
        ));
    }

    #[test]
    fn test_identity_requires_both_vars() {
        let err = load(&[("COMMERCE_USER_ID", "7")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "COMMERCE_ACCESS_TOKEN"));

        let config = load(&[
            ("COMMERCE_USER_ID", "7"),
            ("COMMERCE_ACCESS_TOKEN", "tok_live_abcdef"),
        ])
        .unwrap();
        assert_eq!(config.identity.user_id(), Some(UserId::new(7)));
    }

    #[test]
    fn test_debug_redacts_access_token() {
        let config = load(&[
            ("COMMERCE_USER_ID", "7"),
            ("COMMERCE_ACCESS_TOKEN", "tok_live_abcdef"),
        ])
        .unwrap();

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("REDACTED"));
        assert!(!debug_output.contains("tok_live_abcdef"));
    }
}
