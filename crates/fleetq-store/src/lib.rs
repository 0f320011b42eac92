//! fleetq-store: Durable node state for fleetq

pub mod store;

pub use store::*;
