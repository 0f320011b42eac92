//! fleetq-sched: Admission, queueing, and fleet state for fleetq
//!
//! This crate holds the scheduling core:
//! - Admission constraints against class GPU ceilings
//! - Wait-time estimation with pluggable models
//! - Queue reorder protocol
//! - Read-side roll-ups for dashboards
//! - The keyed fleet registry with per-node locking

pub mod aggregator;
pub mod estimator;
pub mod queue;
pub mod registry;
pub mod validator;

pub use aggregator::{FleetStatus, NodeDetail, NodeSummary, QueueStats, UsageClass};
pub use estimator::{wait_model_from_config, JitterWaitModel, ThroughputWaitModel, WaitBand, WaitModel};
pub use registry::{FleetRegistry, QueueView, SubmissionReceipt, SubmitRequest};
