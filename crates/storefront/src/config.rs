//! Storefront client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BOIGHOR_API_URL` - Base URL of the bookstore backend
//!
//! ## Optional
//! - `BOIGHOR_LANGUAGE` - Catalogue language, `en` or `bn` (default: en)
//! - `BOIGHOR_OTP_RESEND_SECS` - Seconds before an OTP may be resent (default: 60)
//! - `BOIGHOR_SEARCH_DEBOUNCE_MS` - Search box debounce (default: 400)
//! - `BOIGHOR_AUTOCOMPLETE_DEBOUNCE_MS` - Autocomplete debounce (default: 300)
//! - `BOIGHOR_ORDER_POLL_SECS` - Admin order poll interval (default: 30)
//! - `BOIGHOR_HTTP_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `BOIGHOR_STATE_DIR` - Directory holding the saved session
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use boighor_core::Language;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Backend base URL
    pub api_url: Url,
    /// Language the catalogue is requested in
    pub language: Language,
    /// Timing of debounces, countdowns and polling
    pub timing: TimingConfig,
    /// Per-request HTTP timeout
    pub http_timeout: Duration,
    /// Where the saved session lives (`None` keeps it in memory)
    pub state_dir: Option<PathBuf>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Timer settings shared by the controllers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConfig {
    /// How long the resend button stays disabled after an OTP is sent
    pub otp_resend: Duration,
    /// Quiet period before typed search text is applied
    pub search_debounce: Duration,
    /// Quiet period before an autocomplete request is made
    pub autocomplete_debounce: Duration,
    /// Interval of the admin "last update" poll
    pub order_poll: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            otp_resend: Duration::from_secs(60),
            search_debounce: Duration::from_millis(400),
            autocomplete_debounce: Duration::from_millis(300),
            order_poll: Duration::from_secs(30),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(lookup);

        let api_url = env.required("BOIGHOR_API_URL")?;
        let api_url = Url::parse(&api_url)
            .map_err(|e| ConfigError::InvalidEnvVar("BOIGHOR_API_URL".to_string(), e.to_string()))?;

        let language = env.parsed_or("BOIGHOR_LANGUAGE", Language::En)?;

        let otp_resend_secs: u64 = env.parsed_or("BOIGHOR_OTP_RESEND_SECS", 60)?;
        if otp_resend_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "BOIGHOR_OTP_RESEND_SECS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let timing = TimingConfig {
            otp_resend: Duration::from_secs(otp_resend_secs),
            search_debounce: Duration::from_millis(
                env.parsed_or("BOIGHOR_SEARCH_DEBOUNCE_MS", 400)?,
            ),
            autocomplete_debounce: Duration::from_millis(
                env.parsed_or("BOIGHOR_AUTOCOMPLETE_DEBOUNCE_MS", 300)?,
            ),
            order_poll: Duration::from_secs(env.parsed_or("BOIGHOR_ORDER_POLL_SECS", 30)?),
        };

        Ok(Self {
            api_url,
            language,
            timing,
            http_timeout: Duration::from_secs(env.parsed_or("BOIGHOR_HTTP_TIMEOUT_SECS", 30)?),
            state_dir: env.optional("BOIGHOR_STATE_DIR").map(PathBuf::from),
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// Configuration pointing at `api_url` with every default applied.
    #[must_use]
    pub fn for_api(api_url: Url) -> Self {
        Self {
            api_url,
            language: Language::En,
            timing: TimingConfig::default(),
            http_timeout: Duration::from_secs(30),
            state_dir: None,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// Get an optional variable; blank values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Parse a variable, using `default` when it is unset.
    fn parsed_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key).map_or(Ok(default), |raw| {
            raw.trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_missing_api_url() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "BOIGHOR_API_URL"));
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("BOIGHOR_API_URL", "https://api.boighor.test")]).unwrap();

        assert_eq!(config.language, Language::En);
        assert_eq!(config.timing, TimingConfig::default());
        assert_eq!(config.timing.otp_resend, Duration::from_secs(60));
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert!(config.state_dir.is_none());
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("BOIGHOR_API_URL", "https://api.boighor.test"),
            ("BOIGHOR_LANGUAGE", "bn"),
            ("BOIGHOR_OTP_RESEND_SECS", "10"),
            ("BOIGHOR_SEARCH_DEBOUNCE_MS", "250"),
            ("BOIGHOR_STATE_DIR", "/tmp/boighor"),
        ])
        .unwrap();

        assert_eq!(config.language, Language::Bn);
        assert_eq!(config.timing.otp_resend, Duration::from_secs(10));
        assert_eq!(config.timing.search_debounce, Duration::from_millis(250));
        assert_eq!(config.state_dir, Some(PathBuf::from("/tmp/boighor")));
    }

    #[test]
    fn test_invalid_values() {
        let err = load(&[
            ("BOIGHOR_API_URL", "https://api.boighor.test"),
            ("BOIGHOR_ORDER_POLL_SECS", "soon"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref k, _) if k == "BOIGHOR_ORDER_POLL_SECS"));

        let err = load(&[("BOIGHOR_API_URL", "not a url")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_zero_resend_window_rejected() {
        let err = load(&[
            ("BOIGHOR_API_URL", "https://api.boighor.test"),
            ("BOIGHOR_OTP_RESEND_SECS", "0"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }
}
