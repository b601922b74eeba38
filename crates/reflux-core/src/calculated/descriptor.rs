//! Structured description of a calculated property's reconstructable state.
//!
//! A descriptor records what is needed to rebuild the wiring elsewhere: the
//! property's identity, its upstream identities in order, the recomputation
//! strategy and, for context-bound calculations, the serialized context.
//! Live subscriptions and closures are never serialized.

use serde::{Deserialize, Serialize};

use crate::errors::PropertyError;
use crate::property::PropertyId;
use crate::scheduler::SchedulerRole;

/// How a calculated property recomputes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyDescriptor {
    Synchronous,
    Throttled { throttle_ms: u64, role: SchedulerRole },
    Cancelable { throttle_ms: u64, role: SchedulerRole },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationDescriptor {
    pub property: PropertyId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub upstream: Vec<PropertyId>,
    pub strategy: StrategyDescriptor,
    /// Serialized calculation context, for properties built with
    /// `with_context`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

impl CalculationDescriptor {
    pub fn to_json(&self) -> Result<String, PropertyError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, PropertyError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Deserialize the context into its concrete type.
    pub fn context_as<C: serde::de::DeserializeOwned>(&self) -> Result<Option<C>, PropertyError> {
        self.context
            .clone()
            .map(serde_json::from_value)
            .transpose()
            .map_err(PropertyError::from)
    }
}
