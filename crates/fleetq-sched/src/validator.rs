//! Admission constraints for resource requests

use fleetq_core::{FleetError, FleetResult, GpuType, ResourceConfig};

/// Check a resource request against the class GPU ceiling
///
/// The request is `config.gpu` GPUs on each of `replicas` nodes; the total
/// must fit within the class capacity. Pure and stateless, so callers
/// re-evaluate whenever either input changes.
pub fn validate_request(
    config: &ResourceConfig,
    replicas: u32,
    class: GpuType,
) -> FleetResult<()> {
    let ceiling = class.capacity().total_gpus;
    // Saturate on overflow so an oversized product still rejects
    let requested = config.gpu.checked_mul(replicas).unwrap_or(u32::MAX);
    if requested > ceiling {
        return Err(FleetError::CapacityExceeded { requested, ceiling });
    }
    Ok(())
}

/// Maximum replica count the class ceiling permits for a configuration
pub fn max_replicas(config: &ResourceConfig, class: GpuType) -> u32 {
    if config.gpu == 0 {
        return 0;
    }
    class.capacity().total_gpus / config.gpu
}

/// Clamp a chosen replica count into the permitted range
///
/// A count above the maximum is clamped down, never silently accepted;
/// the result never drops below 1.
pub fn clamp_replicas(config: &ResourceConfig, replicas: u32, class: GpuType) -> u32 {
    replicas.min(max_replicas(config, class)).max(1)
}
