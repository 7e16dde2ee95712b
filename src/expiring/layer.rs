//! Factory for stacking expiry onto capabilities.

use std::sync::Arc;

use super::Expiring;
use crate::config::ExpiryConfig;
use crate::error::ExpiryError;
use crate::service::Closeable;
use crate::timer::{default_timekeeper, Timekeeper};

/// Builds [`Expiring`] decorators from one configuration.
///
/// Unlike `tower::Layer`, wrapping is fallible: arming the initial timers can
/// fail when no runtime is available.
#[derive(Clone)]
pub struct ExpiringLayer {
    config: ExpiryConfig,
    timekeeper: Option<Arc<dyn Timekeeper>>,
}

impl ExpiringLayer {
    pub fn new(config: ExpiryConfig) -> Self {
        Self {
            config,
            timekeeper: None,
        }
    }

    /// Schedule timers on `timekeeper` instead of the process-wide default.
    pub fn timekeeper(mut self, timekeeper: Arc<dyn Timekeeper>) -> Self {
        self.timekeeper = Some(timekeeper);
        self
    }

    pub fn config(&self) -> &ExpiryConfig {
        &self.config
    }

    pub fn layer<S: Closeable>(&self, inner: S) -> Result<Expiring<S>, ExpiryError> {
        // Resolved per decorator so a default installed later is honoured.
        let timekeeper = self.timekeeper.clone().unwrap_or_else(default_timekeeper);
        Expiring::with_timekeeper(inner, self.config.clone(), timekeeper)
    }
}

impl std::fmt::Debug for ExpiringLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiringLayer")
            .field("config", &self.config)
            .field("custom_timekeeper", &self.timekeeper.is_some())
            .finish()
    }
}
