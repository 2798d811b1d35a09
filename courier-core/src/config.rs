//! Broker configuration
//!
//! Defaults are suitable for a single process coordinating tens of agents.
//! Every field can be overridden from the environment via
//! [`BrokerConfig::from_env`].

use crate::{ConfigError, CourierResult, MessagePriority};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry budget applied when a send does not specify one.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Upper bound accepted for `default_max_retries`.
pub const MAX_RETRIES_LIMIT: u32 = 100;

/// Default period of the optional expiry sweeper.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 30;

// ============================================================================
// BROKER CONFIGURATION
// ============================================================================

/// Broker configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Retry budget for messages sent without an explicit `max_retries`.
    pub default_max_retries: u32,

    /// Priority for messages sent without an explicit priority.
    pub default_priority: MessagePriority,

    /// Emit a warning when a direct message targets an unregistered agent.
    pub warn_on_unknown_recipient: bool,

    /// Whether the background expiry sweeper should run.
    /// Expiry is still observed lazily when this is off.
    pub sweep_enabled: bool,

    /// How often the expiry sweeper runs.
    pub sweep_interval: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            default_max_retries: DEFAULT_MAX_RETRIES,
            default_priority: MessagePriority::Normal,
            warn_on_unknown_recipient: true,
            sweep_enabled: false,
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }
}

impl BrokerConfig {
    /// Create BrokerConfig from environment variables.
    ///
    /// Environment variables:
    /// - `COURIER_DEFAULT_MAX_RETRIES`: Retry budget (default: 3)
    /// - `COURIER_DEFAULT_PRIORITY`: Name or 1..=5 (default: normal)
    /// - `COURIER_WARN_UNKNOWN_RECIPIENT`: "true" or "false" (default: true)
    /// - `COURIER_SWEEP_ENABLED`: "true" or "false" (default: false)
    /// - `COURIER_SWEEP_INTERVAL_SECS`: Sweeper period (default: 30)
    ///
    /// Unparseable values fall back to the default; call [`validate`](Self::validate)
    /// to reject out-of-range ones.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let default_max_retries = std::env::var("COURIER_DEFAULT_MAX_RETRIES")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.default_max_retries);

        let default_priority = std::env::var("COURIER_DEFAULT_PRIORITY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.default_priority);

        let warn_on_unknown_recipient = std::env::var("COURIER_WARN_UNKNOWN_RECIPIENT")
            .ok()
            .map(|s| s.trim().to_lowercase() != "false")
            .unwrap_or(defaults.warn_on_unknown_recipient);

        let sweep_enabled = std::env::var("COURIER_SWEEP_ENABLED")
            .ok()
            .map(|s| s.trim().to_lowercase() == "true")
            .unwrap_or(defaults.sweep_enabled);

        let sweep_interval = std::env::var("COURIER_SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.sweep_interval);

        Self {
            default_max_retries,
            default_priority,
            warn_on_unknown_recipient,
            sweep_enabled,
            sweep_interval,
        }
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - default_max_retries <= MAX_RETRIES_LIMIT
    /// - sweep_interval is positive when the sweeper is enabled
    pub fn validate(&self) -> CourierResult<()> {
        if self.default_max_retries > MAX_RETRIES_LIMIT {
            return Err(ConfigError::InvalidValue {
                field: "default_max_retries".to_string(),
                value: self.default_max_retries.to_string(),
                reason: format!("default_max_retries must be at most {}", MAX_RETRIES_LIMIT),
            }
            .into());
        }

        if self.sweep_enabled && self.sweep_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "sweep_interval".to_string(),
                value: format!("{:?}", self.sweep_interval),
                reason: "sweep_interval must be positive when the sweeper is enabled".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CourierError;
    use std::sync::Mutex;

    const ENV_KEYS: [&str; 5] = [
        "COURIER_DEFAULT_MAX_RETRIES",
        "COURIER_DEFAULT_PRIORITY",
        "COURIER_WARN_UNKNOWN_RECIPIENT",
        "COURIER_SWEEP_ENABLED",
        "COURIER_SWEEP_INTERVAL_SECS",
    ];

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    struct EnvVarGuard {
        key: &'static str,
        original: Option<String>,
    }

    impl EnvVarGuard {
        fn set(key: &'static str, value: Option<&str>) -> Self {
            let original = std::env::var(key).ok();
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
            Self { key, original }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            match self.original.as_deref() {
                Some(v) => std::env::set_var(self.key, v),
                None => std::env::remove_var(self.key),
            }
        }
    }

    fn with_env(values: [Option<&str>; 5]) -> BrokerConfig {
        let _guards: Vec<EnvVarGuard> = ENV_KEYS
            .into_iter()
            .zip(values)
            .map(|(key, value)| EnvVarGuard::set(key, value))
            .collect();
        BrokerConfig::from_env()
    }

    #[test]
    fn test_config_from_env_defaults() {
        let _env_lock = ENV_MUTEX.lock().expect("env mutex should not be poisoned");
        let config = with_env([None; 5]);
        assert_eq!(config, BrokerConfig::default());
    }

    #[test]
    fn test_config_from_env_reads_each_variable() {
        let _env_lock = ENV_MUTEX.lock().expect("env mutex should not be poisoned");
        let config = with_env([
            Some("7"),
            Some("critical"),
            Some("false"),
            Some("TRUE"),
            Some("15"),
        ]);
        assert_eq!(config.default_max_retries, 7);
        assert_eq!(config.default_priority, MessagePriority::Critical);
        assert!(!config.warn_on_unknown_recipient);
        assert!(config.sweep_enabled);
        assert_eq!(config.sweep_interval, Duration::from_secs(15));
    }

    #[test]
    fn test_config_from_env_numeric_priority() {
        let _env_lock = ENV_MUTEX.lock().expect("env mutex should not be poisoned");
        let config = with_env([None, Some("4"), None, None, None]);
        assert_eq!(config.default_priority, MessagePriority::Urgent);
    }

    #[test]
    fn test_config_from_env_unparseable_values_fall_back() {
        let _env_lock = ENV_MUTEX.lock().expect("env mutex should not be poisoned");
        let config = with_env([
            Some("lots"),
            Some("9"),
            Some("maybe"),
            Some("yes"),
            Some("-1"),
        ]);
        let defaults = BrokerConfig::default();
        assert_eq!(config.default_max_retries, defaults.default_max_retries);
        assert_eq!(config.default_priority, defaults.default_priority);
        assert!(config.warn_on_unknown_recipient);
        assert!(!config.sweep_enabled);
        assert_eq!(config.sweep_interval, defaults.sweep_interval);
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = BrokerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_max_retries, 3);
        assert_eq!(config.default_priority, MessagePriority::Normal);
        assert!(!config.sweep_enabled);
    }

    #[test]
    fn test_config_rejects_excessive_retries() {
        let config = BrokerConfig {
            default_max_retries: MAX_RETRIES_LIMIT + 1,
            ..BrokerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CourierError::Config(ConfigError::InvalidValue { field, .. })) if field == "default_max_retries"
        ));
    }

    #[test]
    fn test_config_rejects_zero_sweep_interval_when_enabled() {
        let config = BrokerConfig {
            sweep_enabled: true,
            sweep_interval: Duration::ZERO,
            ..BrokerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CourierError::Config(ConfigError::InvalidValue { field, .. })) if field == "sweep_interval"
        ));

        let disabled = BrokerConfig {
            sweep_enabled: false,
            sweep_interval: Duration::ZERO,
            ..BrokerConfig::default()
        };
        assert!(disabled.validate().is_ok());
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Any retry budget within the limit validates; anything above it is rejected.
        #[test]
        fn prop_config_retry_budget_bound(retries in 0u32..1000) {
            let config = BrokerConfig {
                default_max_retries: retries,
                ..BrokerConfig::default()
            };
            prop_assert_eq!(config.validate().is_ok(), retries <= MAX_RETRIES_LIMIT);
        }
    }
}
