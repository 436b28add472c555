//! Provider configuration and operation timeouts.
//!
//! The provider block accepts:
//!
//! ```json
//! {
//!   "endpoint": "https://management.azure.com",
//!   "access_token": "...",
//!   "api_version": "2023-08-01-preview",
//!   "timeouts": { "create": "30m", "read": "2m" }
//! }
//! ```
//!
//! Every key is optional. `access_token` falls back to the `ARM_ACCESS_TOKEN`
//! environment variable.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::error::ProviderError;
use crate::secret::Secret;

/// Default Azure Resource Manager endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com";

/// API version of the job credentials REST API.
pub const DEFAULT_API_VERSION: &str = "2023-08-01-preview";

/// Environment variable consulted when no access token is configured.
pub const ACCESS_TOKEN_ENV: &str = "ARM_ACCESS_TOKEN";

/// Deadlines for each resource operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceTimeouts {
    /// Deadline for create.
    pub create: Duration,
    /// Deadline for read.
    pub read: Duration,
    /// Deadline for update.
    pub update: Duration,
    /// Deadline for delete.
    pub delete: Duration,
}

impl Default for ResourceTimeouts {
    fn default() -> Self {
        Self {
            create: Duration::from_secs(60 * 60),
            read: Duration::from_secs(5 * 60),
            update: Duration::from_secs(60 * 60),
            delete: Duration::from_secs(60 * 60),
        }
    }
}

impl ResourceTimeouts {
    /// Apply overrides on top of these timeouts.
    pub fn with_overrides(mut self, overrides: &TimeoutOverrides) -> Result<Self, ProviderError> {
        if let Some(s) = &overrides.create {
            self.create = parse_duration(s)?;
        }
        if let Some(s) = &overrides.read {
            self.read = parse_duration(s)?;
        }
        if let Some(s) = &overrides.update {
            self.update = parse_duration(s)?;
        }
        if let Some(s) = &overrides.delete {
            self.delete = parse_duration(s)?;
        }
        Ok(self)
    }
}

/// The `timeouts` block as written by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeoutOverrides {
    /// Create deadline, e.g. `"30m"`.
    pub create: Option<String>,
    /// Read deadline.
    pub read: Option<String>,
    /// Update deadline.
    pub update: Option<String>,
    /// Delete deadline.
    pub delete: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    endpoint: Option<String>,
    access_token: Option<String>,
    api_version: Option<String>,
    #[serde(default)]
    timeouts: TimeoutOverrides,
}

/// Resolved provider configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Resource Manager endpoint, without a trailing slash.
    pub endpoint: String,
    /// Bearer token for Resource Manager.
    pub access_token: Option<Secret>,
    /// REST API version.
    pub api_version: String,
    /// Operation deadlines.
    pub timeouts: ResourceTimeouts,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            access_token: None,
            api_version: DEFAULT_API_VERSION.to_string(),
            timeouts: ResourceTimeouts::default(),
        }
    }
}

impl ProviderConfig {
    /// Resolve configuration from the provider block, reading the environment
    /// for missing values.
    pub fn from_value(value: &Value) -> Result<Self, ProviderError> {
        Self::from_value_with_env(value, |key| std::env::var(key).ok())
    }

    /// Like [`ProviderConfig::from_value`] with an explicit environment lookup.
    pub fn from_value_with_env<F>(value: &Value, env: F) -> Result<Self, ProviderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw: RawConfig = match value {
            Value::Null => RawConfig::default(),
            other => serde_json::from_value(other.clone())
                .map_err(|e| ProviderError::Configuration(e.to_string()))?,
        };

        let endpoint = raw
            .endpoint
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ProviderError::Configuration(format!(
                "endpoint {:?} must be an http(s) URL",
                endpoint
            )));
        }

        let access_token = raw
            .access_token
            .or_else(|| env(ACCESS_TOKEN_ENV))
            .filter(|t| !t.is_empty())
            .map(Secret::new);

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            access_token,
            api_version: raw
                .api_version
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            timeouts: ResourceTimeouts::default().with_overrides(&raw.timeouts)?,
        })
    }
}

/// Parse a duration such as `"90s"`, `"30m"`, `"1h30m"` or `"500ms"`.
pub fn parse_duration(input: &str) -> Result<Duration, ProviderError> {
    humantime::parse_duration(input.trim())
        .map_err(|e| ProviderError::Configuration(format!("invalid duration {:?}: {}", input, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults() {
        let config = ProviderConfig::from_value_with_env(&Value::Null, no_env).unwrap();
        assert_eq!(config, ProviderConfig::default());
        assert_eq!(config.timeouts.create, Duration::from_secs(3600));
        assert_eq!(config.timeouts.read, Duration::from_secs(300));
    }

    #[test]
    fn test_explicit_values() {
        let config = ProviderConfig::from_value_with_env(
            &json!({
                "endpoint": "http://localhost:8080/",
                "access_token": "tok",
                "api_version": "2021-11-01",
                "timeouts": {"create": "30m", "read": "1m30s"}
            }),
            no_env,
        )
        .unwrap();

        assert_eq!(config.endpoint, "http://localhost:8080");
        assert_eq!(config.access_token.as_ref().map(Secret::expose), Some("tok"));
        assert_eq!(config.api_version, "2021-11-01");
        assert_eq!(config.timeouts.create, Duration::from_secs(1800));
        assert_eq!(config.timeouts.read, Duration::from_secs(90));
        assert_eq!(config.timeouts.delete, Duration::from_secs(3600));
    }

    #[test]
    fn test_token_from_env() {
        let config = ProviderConfig::from_value_with_env(&json!({}), |key| {
            (key == ACCESS_TOKEN_ENV).then(|| "from-env".to_string())
        })
        .unwrap();
        assert_eq!(config.access_token.unwrap().expose(), "from-env");
    }

    #[test]
    fn test_rejects_unknown_keys_and_bad_endpoint() {
        let err = ProviderConfig::from_value_with_env(&json!({"region": "x"}), no_env).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));

        let err =
            ProviderConfig::from_value_with_env(&json!({"endpoint": "ftp://x"}), no_env).unwrap_err();
        assert!(err.message().contains("http(s)"));
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("45s").unwrap(), Duration::from_secs(45));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("1h 30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("2d").unwrap(), Duration::from_secs(2 * 86400));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("m").is_err());
    }

    #[test]
    fn test_invalid_timeout_is_configuration_error() {
        let err = ProviderConfig::from_value_with_env(&json!({"timeouts": {"delete": "soon"}}), no_env)
            .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
        assert!(err.message().contains("\"soon\""));
    }
}
