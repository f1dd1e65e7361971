//! Server configuration and defaults

use camlink_capture::StreamConfig;
use serde::Serialize;
use std::env;
use std::time::Duration;
use tracing::warn;

/// Server configuration
#[derive(Debug, Clone, Serialize)]
pub struct ServerConfig {
    /// Highest device index probed by `list_cameras` (exclusive)
    pub max_probe_devices: u32,
    /// Pacing between stream read attempts, in milliseconds
    pub poll_interval_ms: u64,
    /// Consecutive read failures before a stream stops itself
    pub failure_threshold: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_probe_devices: 5,
            poll_interval_ms: 33,
            failure_threshold: 10,
        }
    }
}

impl ServerConfig {
    /// Build the configuration from `CAMLINK_*` environment variables,
    /// falling back to defaults for anything unset or unparsable
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_probe_devices: env_value("CAMLINK_MAX_PROBE", defaults.max_probe_devices),
            poll_interval_ms: env_value("CAMLINK_POLL_INTERVAL_MS", defaults.poll_interval_ms),
            failure_threshold: env_value("CAMLINK_FAILURE_THRESHOLD", defaults.failure_threshold),
        }
    }

    /// Polling behavior handed to new capture streams
    pub fn stream_config(&self) -> StreamConfig {
        StreamConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            failure_threshold: self.failure_threshold,
        }
    }
}

fn env_value<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(name, raw = %raw, "ignoring unparsable environment override");
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_probe_range() {
        let config = ServerConfig::default();
        assert_eq!(config.max_probe_devices, 5);
        assert_eq!(config.stream_config().failure_threshold, 10);
        assert_eq!(
            config.stream_config().poll_interval,
            Duration::from_millis(33)
        );
    }

    #[test]
    fn test_env_override_and_fallback() {
        env::set_var("CAMLINK_TEST_VALUE_OK", "9");
        assert_eq!(env_value("CAMLINK_TEST_VALUE_OK", 5u32), 9);

        env::set_var("CAMLINK_TEST_VALUE_BAD", "not-a-number");
        assert_eq!(env_value("CAMLINK_TEST_VALUE_BAD", 5u32), 5);

        assert_eq!(env_value("CAMLINK_TEST_VALUE_UNSET", 7u32), 7);
    }
}
