//! Configuration for property factories.
//!
//! [`PropertyConfig`] is an explicit value handed to a
//! [`PropertyFactory`](crate::PropertyFactory); there is no process-wide
//! state, so independent configurations can coexist (one per test, say).
//! [`PropertySettings`] is the plain, serde-loadable part of it.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;

use crate::errors::PropertyError;
use crate::scheduler::{ImmediateScheduler, Scheduler, SchedulerRole, TokioScheduler};

const ENV_SERIALIZATION_ENABLED: &str = "REFLUX_SERIALIZATION_ENABLED";
const ENV_DEFAULT_THROTTLE_MS: &str = "REFLUX_DEFAULT_THROTTLE_MS";

/// Longest accepted default throttle.
pub const MAX_THROTTLE: Duration = Duration::from_secs(60 * 60);

/// Runtime configuration shared by the properties one factory creates.
#[derive(Clone)]
pub struct PropertyConfig {
    interactive: Arc<dyn Scheduler>,
    long_running: Arc<dyn Scheduler>,
    default_throttle: Duration,
    serialization_enabled: bool,
}

impl PropertyConfig {
    /// Immediate schedulers, no throttle, serialization disabled.
    pub fn new() -> Self {
        Self {
            interactive: Arc::new(ImmediateScheduler),
            long_running: Arc::new(ImmediateScheduler),
            default_throttle: Duration::ZERO,
            serialization_enabled: false,
        }
    }

    /// Tasks for interactive work, the blocking pool for long-running work.
    pub fn tokio(handle: Handle) -> Self {
        Self::new()
            .with_interactive(Arc::new(TokioScheduler::new(handle.clone())))
            .with_long_running(Arc::new(TokioScheduler::long_running(handle)))
    }

    pub fn with_interactive(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.interactive = scheduler;
        self
    }

    pub fn with_long_running(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.long_running = scheduler;
        self
    }

    /// Use one scheduler for both roles.
    pub fn with_scheduler(self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.with_interactive(Arc::clone(&scheduler))
            .with_long_running(scheduler)
    }

    pub fn with_default_throttle(mut self, throttle: Duration) -> Self {
        self.default_throttle = throttle;
        self
    }

    pub fn with_serialization(mut self, enabled: bool) -> Self {
        self.serialization_enabled = enabled;
        self
    }

    pub fn scheduler(&self, role: SchedulerRole) -> Arc<dyn Scheduler> {
        match role {
            SchedulerRole::Interactive => Arc::clone(&self.interactive),
            SchedulerRole::LongRunning => Arc::clone(&self.long_running),
        }
    }

    pub fn default_throttle(&self) -> Duration {
        self.default_throttle
    }

    pub fn serialization_enabled(&self) -> bool {
        self.serialization_enabled
    }
}

impl Default for PropertyConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PropertyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyConfig")
            .field("interactive", &self.interactive.name())
            .field("long_running", &self.long_running.name())
            .field("default_throttle", &self.default_throttle)
            .field("serialization_enabled", &self.serialization_enabled)
            .finish()
    }
}

/// Serializable settings, loadable from JSON and the environment.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PropertySettings {
    /// Allow calculated properties to produce descriptors
    pub serialization_enabled: bool,
    /// Throttle used by factory methods that do not take one
    pub default_throttle_ms: u64,
}

/// A partial settings layer. Unset fields leave the base untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsOverride {
    /// Replaces `serialization_enabled` when set
    pub serialization_enabled: Option<bool>,
    /// Replaces `default_throttle_ms` when set
    pub default_throttle_ms: Option<u64>,
}

impl PropertySettings {
    pub fn load_from_file(path: &Path) -> Result<Self, PropertyError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PropertyError::config(format!("Failed to read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| PropertyError::config(format!("Invalid JSON in {}: {e}", path.display())))
    }

    /// Override fields from `REFLUX_*` environment variables.
    pub fn merge_with_env(&mut self) -> Result<(), PropertyError> {
        if let Ok(value) = std::env::var(ENV_SERIALIZATION_ENABLED) {
            self.set_from_string("serialization_enabled", &value)?;
        }
        if let Ok(value) = std::env::var(ENV_DEFAULT_THROTTLE_MS) {
            self.set_from_string("default_throttle_ms", &value)?;
        }
        Ok(())
    }

    /// Apply every field `layer` sets, including ones set back to defaults.
    pub fn merge_with(&mut self, layer: &SettingsOverride) {
        if let Some(enabled) = layer.serialization_enabled {
            self.serialization_enabled = enabled;
        }
        if let Some(throttle_ms) = layer.default_throttle_ms {
            self.default_throttle_ms = throttle_ms;
        }
    }

    /// Set one field from its string form.
    pub fn set_from_string(&mut self, key: &str, value: &str) -> Result<(), PropertyError> {
        match key {
            "serialization_enabled" => {
                self.serialization_enabled = match value.trim().to_ascii_lowercase().as_str() {
                    "1" | "true" | "yes" | "on" => true,
                    "0" | "false" | "no" | "off" => false,
                    other => {
                        return Err(PropertyError::config(format!(
                            "serialization_enabled: expected a boolean, got {other:?}"
                        )))
                    }
                };
            }
            "default_throttle_ms" => {
                self.default_throttle_ms = value.trim().parse().map_err(|e| {
                    PropertyError::config(format!("default_throttle_ms: {e}"))
                })?;
            }
            other => {
                return Err(PropertyError::config(format!("unknown setting {other:?}")));
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), PropertyError> {
        if self.default_throttle() > MAX_THROTTLE {
            return Err(PropertyError::config(format!(
                "default_throttle_ms {} exceeds the maximum of {} ms",
                self.default_throttle_ms,
                MAX_THROTTLE.as_millis()
            )));
        }
        Ok(())
    }

    pub fn default_throttle(&self) -> Duration {
        Duration::from_millis(self.default_throttle_ms)
    }

    /// Validate, then combine with schedulers into a runtime configuration.
    pub fn into_config(
        self,
        interactive: Arc<dyn Scheduler>,
        long_running: Arc<dyn Scheduler>,
    ) -> Result<PropertyConfig, PropertyError> {
        self.validate()?;
        Ok(PropertyConfig::new()
            .with_interactive(interactive)
            .with_long_running(long_running)
            .with_default_throttle(self.default_throttle())
            .with_serialization(self.serialization_enabled))
    }
}
