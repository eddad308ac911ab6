//! Process-wide manager configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable holding the inference server base URL.
pub const ENV_SERVER_URL: &str = "INFERENCE_SERVER_URL";
/// Environment variable holding the request timeout in seconds.
pub const ENV_TIMEOUT_SECS: &str = "INFERENCE_TIMEOUT_SECS";

const DEFAULT_SERVER_URL: &str = "http://localhost:8001";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

/// Manager configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Base URL of the inference server, shared by every compute.
    pub inference_server_url: String,
    /// Per-request timeout applied by the client.
    #[serde(with = "secs")]
    pub request_timeout: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            inference_server_url: DEFAULT_SERVER_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ManagerConfig {
    /// Build a config from the environment, falling back to defaults.
    ///
    /// # Errors
    /// Returns error if the timeout variable is not a whole number of seconds.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_SERVER_URL).filter(|u| !u.trim().is_empty()) {
            config.inference_server_url = url.trim().to_string();
        }

        if let Some(value) = lookup(ENV_TIMEOUT_SECS) {
            let secs = value
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue {
                    var: ENV_TIMEOUT_SECS,
                    value: value.clone(),
                })?;
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ManagerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ManagerConfig::default());
        assert_eq!(config.inference_server_url, "http://localhost:8001");
    }

    #[test]
    fn test_env_overrides() {
        let config = ManagerConfig::from_lookup(lookup(&[
            (ENV_SERVER_URL, " http://gpu-box:9000 "),
            (ENV_TIMEOUT_SECS, "5"),
        ]))
        .unwrap();
        assert_eq!(config.inference_server_url, "http://gpu-box:9000");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_bad_timeout_is_rejected() {
        let err = ManagerConfig::from_lookup(lookup(&[(ENV_TIMEOUT_SECS, "soon")])).unwrap_err();
        assert!(err.to_string().contains(ENV_TIMEOUT_SECS));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: ManagerConfig =
            serde_json::from_str(r#"{"request_timeout": 2}"#).unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(2));
        assert_eq!(config.inference_server_url, "http://localhost:8001");
    }
}
