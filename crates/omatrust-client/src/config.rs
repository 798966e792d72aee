//! Client configuration.
//!
//! Defaults are suitable for production lookups against the public DNS and
//! HTTPS. Override via environment variables or explicit construction for
//! staging and testing.

use std::str::FromStr;
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Default DNS label that prefixes the domain for TXT evidence.
pub const DEFAULT_DNS_PREFIX: &str = "_omatrust";

/// Default byte budget for fetched metadata documents (1 MiB).
pub const DEFAULT_MAX_METADATA_BYTES: usize = 1024 * 1024;

/// Configuration for the network-bound verifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustClientConfig {
    /// Label prepended to the domain for TXT evidence (`_omatrust`).
    pub dns_prefix: String,
    /// Upper bound on one TXT lookup, in seconds.
    pub dns_timeout_secs: u64,
    /// Upper bound on one did.json fetch, in seconds.
    pub http_timeout_secs: u64,
    /// Scheme used to build did.json URLs. Always `https` outside tests.
    pub did_document_scheme: String,
    /// Byte budget for a metadata document.
    pub max_metadata_bytes: usize,
    /// Upper bound on one metadata fetch, in milliseconds.
    pub metadata_timeout_ms: u64,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
    /// Retries after a refused connection. Zero disables retrying.
    pub retry_max: u32,
    /// Delay before the first retry, in milliseconds; doubled per retry.
    pub retry_base_delay_ms: u64,
}

impl Default for TrustClientConfig {
    fn default() -> Self {
        Self {
            dns_prefix: DEFAULT_DNS_PREFIX.to_string(),
            dns_timeout_secs: 5,
            http_timeout_secs: 10,
            did_document_scheme: "https".to_string(),
            max_metadata_bytes: DEFAULT_MAX_METADATA_BYTES,
            metadata_timeout_ms: 10_000,
            user_agent: default_user_agent(),
            retry_max: 2,
            retry_base_delay_ms: 100,
        }
    }
}

impl TrustClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `OMATRUST_DNS_PREFIX` (default: `_omatrust`)
    /// - `OMATRUST_DNS_TIMEOUT_SECS` (default: 5)
    /// - `OMATRUST_HTTP_TIMEOUT_SECS` (default: 10)
    /// - `OMATRUST_DID_DOCUMENT_SCHEME` (default: `https`; `http` or `https`)
    /// - `OMATRUST_MAX_METADATA_BYTES` (default: 1048576)
    /// - `OMATRUST_METADATA_TIMEOUT_MS` (default: 10000)
    /// - `OMATRUST_USER_AGENT` (default: `omatrust/<version>`)
    /// - `OMATRUST_RETRY_MAX` (default: 2)
    /// - `OMATRUST_RETRY_BASE_DELAY_MS` (default: 100)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let did_document_scheme =
            env_string("OMATRUST_DID_DOCUMENT_SCHEME", &defaults.did_document_scheme).to_ascii_lowercase();
        if did_document_scheme != "https" && did_document_scheme != "http" {
            return Err(ConfigError::InvalidScheme(did_document_scheme));
        }

        let config = Self {
            dns_prefix: env_string("OMATRUST_DNS_PREFIX", &defaults.dns_prefix),
            dns_timeout_secs: env_parse("OMATRUST_DNS_TIMEOUT_SECS", defaults.dns_timeout_secs)?,
            http_timeout_secs: env_parse("OMATRUST_HTTP_TIMEOUT_SECS", defaults.http_timeout_secs)?,
            did_document_scheme,
            max_metadata_bytes: env_parse("OMATRUST_MAX_METADATA_BYTES", defaults.max_metadata_bytes)?,
            metadata_timeout_ms: env_parse("OMATRUST_METADATA_TIMEOUT_MS", defaults.metadata_timeout_ms)?,
            user_agent: env_string("OMATRUST_USER_AGENT", &defaults.user_agent),
            retry_max: env_parse("OMATRUST_RETRY_MAX", defaults.retry_max)?,
            retry_base_delay_ms: env_parse("OMATRUST_RETRY_BASE_DELAY_MS", defaults.retry_base_delay_ms)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Configuration for tests against a local mock server: plain HTTP and
    /// short timeouts and retry delays.
    pub fn local_mock() -> Self {
        Self {
            dns_timeout_secs: 1,
            http_timeout_secs: 2,
            did_document_scheme: "http".to_string(),
            metadata_timeout_ms: 2_000,
            retry_base_delay_ms: 10,
            ..Self::default()
        }
    }

    /// Reject zero timeouts, a zero byte budget, and an empty DNS prefix.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dns_prefix.trim().is_empty() {
            return Err(ConfigError::Empty("OMATRUST_DNS_PREFIX"));
        }
        if self.dns_timeout_secs == 0 {
            return Err(ConfigError::Zero("OMATRUST_DNS_TIMEOUT_SECS"));
        }
        if self.http_timeout_secs == 0 {
            return Err(ConfigError::Zero("OMATRUST_HTTP_TIMEOUT_SECS"));
        }
        if self.max_metadata_bytes == 0 {
            return Err(ConfigError::Zero("OMATRUST_MAX_METADATA_BYTES"));
        }
        if self.metadata_timeout_ms == 0 {
            return Err(ConfigError::Zero("OMATRUST_METADATA_TIMEOUT_MS"));
        }
        Ok(())
    }

    pub fn dns_timeout(&self) -> Duration {
        Duration::from_secs(self.dns_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_millis(self.metadata_timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry_max,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
        }
    }
}

fn default_user_agent() -> String {
    format!("omatrust/{}", env!("CARGO_PKG_VERSION"))
}

fn env_string(var: &str, default: &str) -> String {
    std::env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_parse<T: FromStr>(var: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber(var.to_string(), raw)),
        _ => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid number for {0}: '{1}'")]
    InvalidNumber(String, String),
    #[error("unsupported did.json scheme '{0}' (expected http or https)")]
    InvalidScheme(String),
    #[error("{0} must not be zero")]
    Zero(&'static str),
    #[error("{0} must not be empty")]
    Empty(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = TrustClientConfig::default();
        assert_eq!(cfg.dns_prefix, "_omatrust");
        assert_eq!(cfg.http_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.max_metadata_bytes, 1_048_576);
        assert_eq!(cfg.did_document_scheme, "https");
        assert!(cfg.user_agent.starts_with("omatrust/"));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn local_mock_uses_plain_http() {
        let cfg = TrustClientConfig::local_mock();
        assert_eq!(cfg.did_document_scheme, "http");
        assert_eq!(cfg.retry_policy().base_delay, Duration::from_millis(10));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn retry_policy_follows_config() {
        assert_eq!(TrustClientConfig::default().retry_policy(), RetryPolicy::default());
        let cfg = TrustClientConfig {
            retry_max: 0,
            ..TrustClientConfig::default()
        };
        assert_eq!(cfg.retry_policy().max_retries, 0);
    }

    #[test]
    fn env_parse_uses_default_when_var_absent() {
        let v: u64 = env_parse("OMATRUST_NONEXISTENT_VAR_12345", 7).unwrap();
        assert_eq!(v, 7);
    }

    #[test]
    fn env_parse_rejects_garbage() {
        std::env::set_var("OMATRUST_TEST_BAD_NUMBER", "ten");
        let result: Result<u64, _> = env_parse("OMATRUST_TEST_BAD_NUMBER", 10);
        std::env::remove_var("OMATRUST_TEST_BAD_NUMBER");
        assert!(matches!(result, Err(ConfigError::InvalidNumber(_, _))));
    }

    #[test]
    fn zero_budget_is_rejected() {
        let cfg = TrustClientConfig {
            max_metadata_bytes: 0,
            ..TrustClientConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Zero(_))));
    }
}
