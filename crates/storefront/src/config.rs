//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `FURNISH_STORAGE_BACKEND` - `file` (default), `postgres`, or `memory`
//! - `FURNISH_STATE_DIR` - Directory for the file backend (default: `.furnish-flow`)
//! - `FURNISH_DATABASE_URL` - `PostgreSQL` connection string, falls back to
//!   `DATABASE_URL`. Required for the `postgres` backend and for migrations.
//! - `FURNISH_CATALOG_URL` - Base URL of the product API. The bundled catalog
//!   is used when unset.
//! - `FURNISH_VISUALIZER_URL` - Room visualizer endpoint
//! - `FURNISH_VISUALIZER_API_KEY` - Room visualizer API key (high entropy).
//!   Must be set together with `FURNISH_VISUALIZER_URL`.
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_STATE_DIR: &str = ".furnish-flow";
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

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

/// Where shopper collections are stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorageBackend {
    /// One JSON file per key under the state directory.
    #[default]
    File,
    /// The `storefront.client_state` table.
    Postgres,
    /// Process memory; nothing survives a restart.
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(format!(
                "unknown backend {other:?} (expected file, postgres, or memory)"
            )),
        }
    }
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Storage backend for carts and wishlists
    pub storage: StorageBackend,
    /// State directory for the file backend
    pub state_dir: PathBuf,
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: Option<SecretString>,
    /// Product API base URL; `None` uses the bundled catalog
    pub catalog_url: Option<Url>,
    /// Room visualizer service
    pub visualizer: Option<VisualizerConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Room visualizer service configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct VisualizerConfig {
    pub endpoint: Url,
    pub api_key: SecretString,
}

impl fmt::Debug for VisualizerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisualizerConfig")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is invalid, the `postgres` backend
    /// has no database URL, or the visualizer key fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup` instead of the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Same as [`Self::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let storage = env
            .optional("FURNISH_STORAGE_BACKEND")
            .map(|value| {
                value.parse::<StorageBackend>().map_err(|e| {
                    ConfigError::InvalidEnvVar("FURNISH_STORAGE_BACKEND".to_string(), e)
                })
            })
            .transpose()?
            .unwrap_or_default();
        let state_dir = PathBuf::from(env.or_default("FURNISH_STATE_DIR", DEFAULT_STATE_DIR));
        let database_url = env.database_url("FURNISH_DATABASE_URL");
        if storage == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingEnvVar("FURNISH_DATABASE_URL".to_string()));
        }

        let catalog_url = env
            .optional("FURNISH_CATALOG_URL")
            .map(|value| parse_url("FURNISH_CATALOG_URL", &value))
            .transpose()?;
        let visualizer = VisualizerConfig::from_env(&env)?;

        Ok(Self {
            storage,
            state_dir,
            database_url,
            catalog_url,
            visualizer,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }
}

impl VisualizerConfig {
    fn from_env<F>(env: &Env<F>) -> Result<Option<Self>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = env.optional("FURNISH_VISUALIZER_URL");
        let api_key = env.optional("FURNISH_VISUALIZER_API_KEY");

        match (endpoint, api_key) {
            (None, None) => Ok(None),
            (Some(_), None) => Err(ConfigError::MissingEnvVar(
                "FURNISH_VISUALIZER_API_KEY".to_string(),
            )),
            (None, Some(_)) => Err(ConfigError::MissingEnvVar(
                "FURNISH_VISUALIZER_URL".to_string(),
            )),
            (Some(endpoint), Some(api_key)) => {
                validate_secret_strength(&api_key, "FURNISH_VISUALIZER_API_KEY")?;
                Ok(Some(Self {
                    endpoint: parse_url("FURNISH_VISUALIZER_URL", &endpoint)?,
                    api_key: SecretString::from(api_key),
                }))
            }
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Get an optional variable. Blank values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Get database URL with fallback to generic `DATABASE_URL`.
    fn database_url(&self, primary_key: &str) -> Option<SecretString> {
        self.optional(primary_key)
            .or_else(|| self.optional("DATABASE_URL"))
            .map(SecretString::from)
    }
}

fn parse_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected an http(s) URL, got scheme {:?}", url.scheme()),
        ));
    }
    Ok(url)
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

    // API keys are random; low entropy means a hand-typed value
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the key issued by the service."
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    const GOOD_KEY: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6";

    fn load(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.storage, StorageBackend::File);
        assert_eq!(config.state_dir, PathBuf::from(".furnish-flow"));
        assert!(config.database_url.is_none());
        assert!(config.catalog_url.is_none());
        assert!(config.visualizer.is_none());
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_backend_parsing() {
        assert_eq!("Postgres".parse::<StorageBackend>(), Ok(StorageBackend::Postgres));
        assert_eq!(" memory ".parse::<StorageBackend>(), Ok(StorageBackend::Memory));
        assert!("redis".parse::<StorageBackend>().is_err());

        let err = load(&[("FURNISH_STORAGE_BACKEND", "redis")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_postgres_requires_database_url() {
        let err = load(&[("FURNISH_STORAGE_BACKEND", "postgres")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == "FURNISH_DATABASE_URL"));
    }

    #[test]
    fn test_database_url_fallback() {
        let config = load(&[
            ("FURNISH_STORAGE_BACKEND", "postgres"),
            ("DATABASE_URL", "postgres://localhost/furnish"),
        ])
        .unwrap();
        assert_eq!(
            config.database_url.unwrap().expose_secret(),
            "postgres://localhost/furnish"
        );

        let config = load(&[
            ("FURNISH_DATABASE_URL", "postgres://primary/db"),
            ("DATABASE_URL", "postgres://fallback/db"),
        ])
        .unwrap();
        assert_eq!(config.database_url.unwrap().expose_secret(), "postgres://primary/db");
    }

    #[test]
    fn test_catalog_url_must_be_http() {
        let config = load(&[("FURNISH_CATALOG_URL", "https://shop.furnish.test")]).unwrap();
        assert_eq!(config.catalog_url.unwrap().host_str(), Some("shop.furnish.test"));

        assert!(load(&[("FURNISH_CATALOG_URL", "ftp://shop.furnish.test")]).is_err());
        assert!(load(&[("FURNISH_CATALOG_URL", "not a url")]).is_err());
    }

    #[test]
    fn test_visualizer_requires_both_variables() {
        let err = load(&[("FURNISH_VISUALIZER_URL", "https://viz.furnish.test")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)));

        let err = load(&[("FURNISH_VISUALIZER_API_KEY", GOOD_KEY)]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)));

        let config = load(&[
            ("FURNISH_VISUALIZER_URL", "https://viz.furnish.test/compose"),
            ("FURNISH_VISUALIZER_API_KEY", GOOD_KEY),
        ])
        .unwrap();
        assert!(config.visualizer.is_some());
    }

    #[test]
    fn test_visualizer_rejects_placeholder_key() {
        let err = load(&[
            ("FURNISH_VISUALIZER_URL", "https://viz.furnish.test/compose"),
            ("FURNISH_VISUALIZER_API_KEY", "your-api-key-here"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = load(&[("SENTRY_DSN", "  "), ("FURNISH_STATE_DIR", "")]).unwrap();
        assert!(config.sentry_dsn.is_none());
        assert_eq!(config.state_dir, PathBuf::from(".furnish-flow"));
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_single_char() {
        // All same character = 0 entropy
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        assert!(validate_secret_strength(GOOD_KEY, "TEST_VAR").is_ok());
    }

    #[test]
    fn test_visualizer_config_debug_redacts_key() {
        let config = VisualizerConfig {
            endpoint: Url::parse("https://viz.furnish.test/compose").unwrap(),
            api_key: SecretString::from("super_secret_api_key"),
        };
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("viz.furnish.test"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_api_key"));
    }
}
