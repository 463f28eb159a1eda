//! EMT client configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the EMT Madrid MobilityLabs client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmtConfig {
    /// Base URL for the MobilityLabs API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Smallest accepted search radius in meters
    #[serde(default = "default_min_radius")]
    pub min_radius_meters: u32,

    /// Largest accepted search radius in meters
    #[serde(default = "default_max_radius")]
    pub max_radius_meters: u32,

    /// Radius used by nearby queries that don't specify one
    #[serde(default = "default_radius")]
    pub default_radius_meters: u32,

    /// Number of arrivals returned by nearby queries that don't specify one
    #[serde(default = "default_max_results")]
    pub max_results: u8,

    /// Language of the texts returned by the arrivals endpoint ("ES" or "EN")
    #[serde(default = "default_culture_info")]
    pub culture_info: String,

    /// Retry behavior for rate-limited responses
    #[serde(default)]
    pub backoff: BackoffConfig,
}

fn default_base_url() -> String {
    "https://openapi.emtmadrid.es".to_string()
}

const fn default_timeout_secs() -> u64 {
    10
}

const fn default_min_radius() -> u32 {
    50
}

const fn default_max_radius() -> u32 {
    1000
}

const fn default_radius() -> u32 {
    300
}

const fn default_max_results() -> u8 {
    5
}

fn default_culture_info() -> String {
    "ES".to_string()
}

impl Default for EmtConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            min_radius_meters: default_min_radius(),
            max_radius_meters: default_max_radius(),
            default_radius_meters: default_radius(),
            max_results: default_max_results(),
            culture_info: default_culture_info(),
            backoff: BackoffConfig::default(),
        }
    }
}

impl EmtConfig {
    /// Create a configuration suitable for testing
    ///
    /// Backoff delays are shrunk to a few milliseconds so rate-limit tests
    /// don't sleep for seconds.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            timeout_secs: 5,
            backoff: BackoffConfig {
                initial_delay_ms: 1,
                max_delay_ms: 5,
                ..BackoffConfig::default()
            },
            ..Default::default()
        }
    }

    /// Whether `radius` lies inside the accepted search range
    #[must_use]
    pub const fn radius_in_range(&self, radius: u32) -> bool {
        radius >= self.min_radius_meters && radius <= self.max_radius_meters
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("base_url must not be empty".to_string());
        }

        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }

        if self.min_radius_meters > self.max_radius_meters {
            return Err("min_radius_meters must not exceed max_radius_meters".to_string());
        }

        if !self.radius_in_range(self.default_radius_meters) {
            return Err(format!(
                "default_radius_meters must be between {} and {}",
                self.min_radius_meters, self.max_radius_meters
            ));
        }

        if self.max_results == 0 || self.max_results > 20 {
            return Err("max_results must be between 1 and 20".to_string());
        }

        self.backoff.validate()
    }
}

/// Exponential backoff applied when the API reports rate limiting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Delay before the first retry (in milliseconds)
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Upper bound for any single delay (in milliseconds)
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Multiplier applied per attempt
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Retries allowed before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

const fn default_initial_delay() -> u64 {
    500
}

const fn default_max_delay() -> u64 {
    8_000
}

const fn default_multiplier() -> f64 {
    2.0
}

const fn default_max_retries() -> u32 {
    3
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            multiplier: default_multiplier(),
            max_retries: default_max_retries(),
        }
    }
}

impl BackoffConfig {
    /// Delay before retry number `attempt` (0-based)
    #[allow(clippy::cast_precision_loss)] // Acceptable for delay calculations
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.min(30)).unwrap_or(30);
        let delay = (self.initial_delay_ms as f64 * self.multiplier.powi(exponent))
            .min(self.max_delay_ms as f64)
            .max(0.0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let millis = delay as u64;
        Duration::from_millis(millis)
    }

    /// Check if another retry is allowed after `attempts` retries
    pub const fn should_retry(&self, attempts: u32) -> bool {
        attempts < self.max_retries
    }

    fn validate(&self) -> Result<(), String> {
        if self.multiplier < 1.0 {
            return Err("backoff.multiplier must be at least 1.0".to_string());
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err("backoff.initial_delay_ms must not exceed backoff.max_delay_ms".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EmtConfig::default();
        assert_eq!(config.base_url, "https://openapi.emtmadrid.es");
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.min_radius_meters, 50);
        assert_eq!(config.max_radius_meters, 1000);
        assert_eq!(config.default_radius_meters, 300);
        assert_eq!(config.max_results, 5);
        assert_eq!(config.backoff.max_retries, 3);
    }

    #[test]
    fn test_testing_config() {
        let config = EmtConfig::for_testing();
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.backoff.initial_delay_ms, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_radius_range() {
        let config = EmtConfig::default();
        assert!(config.radius_in_range(50));
        assert!(config.radius_in_range(1000));
        assert!(!config.radius_in_range(49));
        assert!(!config.radius_in_range(1001));
    }

    #[test]
    fn test_validation_success() {
        assert!(EmtConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validation_empty_base_url() {
        let config = EmtConfig {
            base_url: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_zero_timeout() {
        let config = EmtConfig {
            timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_default_radius_out_of_range() {
        let config = EmtConfig {
            default_radius_meters: 20,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_too_many_results() {
        let config = EmtConfig {
            max_results: 21,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let backoff = BackoffConfig::default();
        assert_eq!(backoff.delay_for(0), Duration::from_millis(500));
        assert_eq!(backoff.delay_for(1), Duration::from_millis(1000));
        assert_eq!(backoff.delay_for(2), Duration::from_millis(2000));
        assert_eq!(backoff.delay_for(10), Duration::from_millis(8000));
    }

    #[test]
    fn test_backoff_should_retry() {
        let backoff = BackoffConfig::default();
        assert!(backoff.should_retry(0));
        assert!(backoff.should_retry(2));
        assert!(!backoff.should_retry(3));
    }

    #[test]
    fn test_backoff_validation() {
        let config = EmtConfig {
            backoff: BackoffConfig {
                multiplier: 0.5,
                ..BackoffConfig::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: EmtConfig = serde_json::from_str(r#"{ "timeout_secs": 3 }"#).unwrap();
        assert_eq!(config.timeout_secs, 3);
        assert_eq!(config.base_url, "https://openapi.emtmadrid.es");
        assert_eq!(config.backoff.max_retries, 3);
    }
}
