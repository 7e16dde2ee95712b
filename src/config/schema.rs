//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files and
//! default every field so minimal configs are accepted.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the `expiry-demo` binary.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DemoConfig {
    /// Expiry settings applied to the demo service.
    pub expiry: ExpiryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Synthetic traffic driven through the service.
    pub workload: WorkloadConfig,
}

/// Expiry settings for one decorated capability.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExpiryConfig {
    /// Service label used in logs and metrics.
    pub name: String,

    /// Close after this long without outstanding requests (0 = disabled).
    pub idle_timeout_ms: u64,

    /// Close this long after construction regardless of activity (0 = disabled).
    pub max_lifetime_ms: u64,
}

impl ExpiryConfig {
    /// Both timers disabled.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sub-millisecond timeouts round up to 1ms; only `Duration::ZERO` disables.
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout_ms = whole_millis(timeout);
        self
    }

    /// Rounds like [`ExpiryConfig::with_idle_timeout`].
    pub fn with_max_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_lifetime_ms = whole_millis(lifetime);
        self
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn max_lifetime(&self) -> Duration {
        Duration::from_millis(self.max_lifetime_ms)
    }
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            name: "service".to_string(),
            idle_timeout_ms: 0,
            max_lifetime_ms: 0,
        }
    }
}

/// Millisecond count for a duration, saturating at `u64::MAX` and never
/// turning a nonzero duration into 0.
fn whole_millis(duration: Duration) -> u64 {
    if duration.is_zero() {
        return 0;
    }
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX).max(1)
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Synthetic workload for the demo binary.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkloadConfig {
    /// Number of requests to send.
    pub requests: u32,

    /// Pause after each request completes, in milliseconds.
    pub interval_ms: u64,

    /// Simulated processing time per request in milliseconds.
    pub latency_ms: u64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            requests: 5,
            interval_ms: 100,
            latency_ms: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_millisecond_timeout_stays_enabled() {
        let config = ExpiryConfig::new("svc")
            .with_idle_timeout(Duration::from_micros(500))
            .with_max_lifetime(Duration::from_nanos(1));

        assert_eq!(config.idle_timeout_ms, 1);
        assert_eq!(config.max_lifetime_ms, 1);
        assert_eq!(config.idle_timeout(), Duration::from_millis(1));
    }

    #[test]
    fn test_zero_timeout_disables() {
        let config = ExpiryConfig::new("svc")
            .with_idle_timeout(Duration::ZERO)
            .with_max_lifetime(Duration::ZERO);

        assert!(config.idle_timeout().is_zero());
        assert!(config.max_lifetime().is_zero());
    }

    #[test]
    fn test_huge_timeout_saturates() {
        let config = ExpiryConfig::new("svc").with_max_lifetime(Duration::MAX);
        assert_eq!(config.max_lifetime_ms, u64::MAX);
    }

    #[test]
    fn test_whole_milliseconds_kept() {
        let config = ExpiryConfig::new("svc").with_idle_timeout(Duration::from_millis(250));
        assert_eq!(config.idle_timeout_ms, 250);
    }
}
