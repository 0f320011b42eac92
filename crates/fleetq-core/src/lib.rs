//! fleetq-core: Core types for the fleetq GPU fleet service
//!
//! This crate provides the fundamental types used throughout the fleetq system:
//! - Node, GPU unit, allocation, and queue entry definitions
//! - GPU class capacities and the resource configuration catalog
//! - Configuration types
//! - Error handling

pub mod capacity;
pub mod config;
pub mod error;
pub mod node;

pub use capacity::*;
pub use config::*;
pub use error::*;
pub use node::*;
