//! fleetq-api: REST API server for fleetq
//!
//! This crate provides the REST API for interacting with the fleet:
//! - Node overview and per-GPU detail
//! - Job submission
//! - Queue inspection and reordering
//! - Service status

pub mod rest;

pub use rest::create_router;
