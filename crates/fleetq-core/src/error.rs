//! Error types for fleetq

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::capacity::GpuType;

/// Main error type for fleetq
#[derive(Error, Debug)]
pub enum FleetError {
    /// GPU type tag outside the enumerated set
    #[error("Unknown GPU type: {0}")]
    UnknownGpuType(String),

    /// Requested GPUs exceed the node class ceiling
    #[error("Capacity exceeded: requested {requested} GPUs, ceiling is {ceiling}")]
    CapacityExceeded { requested: u32, ceiling: u32 },

    /// Queue entry not present in the addressed queue
    #[error("Queue entry not found: {0}")]
    EntryNotFound(Uuid),

    /// Submission missing a mandatory field
    #[error("Missing required field: {0}")]
    MissingRequiredField(&'static str),

    /// Resource configuration outside the fixed catalog
    #[error("Unknown resource configuration: {gpu} GPU / {cpu}% CPU / {memory}% memory")]
    UnknownResourceConfig { gpu: u32, cpu: u32, memory: u32 },

    /// No online node of the requested class
    #[error("No schedulable {0} node")]
    NoSchedulableNode(GpuType),

    /// Node not registered in the fleet
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Store(String),

    /// Telemetry error
    #[error("Telemetry error: {0}")]
    Telemetry(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for fleetq operations
pub type FleetResult<T> = Result<T, FleetError>;

impl From<serde_json::Error> for FleetError {
    fn from(err: serde_json::Error) -> Self {
        FleetError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for FleetError {
    fn from(err: toml::de::Error) -> Self {
        FleetError::Config(err.to_string())
    }
}

/// Wire form of a recoverable rejection
///
/// Rejections must reach the caller with the violated constraint intact so
/// the caller can re-present the offending input rather than a generic
/// failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rejection {
    /// Stable machine-readable code
    pub code: String,
    /// Human-readable description
    pub message: String,
    /// Offending field, for missing-field rejections
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Total GPUs requested, for capacity rejections
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested: Option<u32>,
    /// Node class ceiling, for capacity rejections
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ceiling: Option<u32>,
}

impl FleetError {
    /// Stable code for the wire form
    pub fn code(&self) -> &'static str {
        match self {
            FleetError::UnknownGpuType(_) => "unknown_gpu_type",
            FleetError::CapacityExceeded { .. } => "capacity_exceeded",
            FleetError::EntryNotFound(_) => "entry_not_found",
            FleetError::MissingRequiredField(_) => "missing_required_field",
            FleetError::UnknownResourceConfig { .. } => "unknown_resource_config",
            FleetError::NoSchedulableNode(_) => "no_schedulable_node",
            FleetError::NodeNotFound(_) => "node_not_found",
            FleetError::Config(_) => "config",
            FleetError::Store(_) => "store",
            FleetError::Telemetry(_) => "telemetry",
            FleetError::Io(_) => "io",
            FleetError::Serialization(_) => "serialization",
        }
    }

    /// Whether this error is a rejection of caller input
    ///
    /// Rejections are decisions, surfaced to the caller as values; the
    /// remaining kinds are service-side failures.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            FleetError::UnknownGpuType(_)
                | FleetError::CapacityExceeded { .. }
                | FleetError::EntryNotFound(_)
                | FleetError::MissingRequiredField(_)
                | FleetError::UnknownResourceConfig { .. }
                | FleetError::NoSchedulableNode(_)
                | FleetError::NodeNotFound(_)
        )
    }

    /// Convert into the structured rejection payload
    pub fn to_rejection(&self) -> Rejection {
        let mut rejection = Rejection {
            code: self.code().to_string(),
            message: self.to_string(),
            field: None,
            requested: None,
            ceiling: None,
        };

        match self {
            FleetError::MissingRequiredField(field) => {
                rejection.field = Some((*field).to_string());
            }
            FleetError::CapacityExceeded { requested, ceiling } => {
                rejection.requested = Some(*requested);
                rejection.ceiling = Some(*ceiling);
            }
            _ => {}
        }

        rejection
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FleetError::CapacityExceeded {
            requested: 16,
            ceiling: 8,
        };
        assert_eq!(
            err.to_string(),
            "Capacity exceeded: requested 16 GPUs, ceiling is 8"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: FleetError = io_err.into();
        assert!(matches!(err, FleetError::Io(_)));
    }

    #[test]
    fn test_rejection_carries_constraint() {
        let rejection = FleetError::CapacityExceeded {
            requested: 16,
            ceiling: 8,
        }
        .to_rejection();
        assert_eq!(rejection.code, "capacity_exceeded");
        assert_eq!(rejection.requested, Some(16));
        assert_eq!(rejection.ceiling, Some(8));

        let rejection = FleetError::MissingRequiredField("image").to_rejection();
        assert_eq!(rejection.code, "missing_required_field");
        assert_eq!(rejection.field.as_deref(), Some("image"));
    }
}
