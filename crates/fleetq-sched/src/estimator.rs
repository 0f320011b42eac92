//! Queue wait-time estimation

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use fleetq_core::{NodeCapacity, QueueEntry, SchedulingConfig, WaitModelKind};

/// Arithmetic mean of accumulated waits, rounded to nearest minute
///
/// Returns 0 for an empty queue.
pub fn average_wait_minutes(queue: &[QueueEntry]) -> u64 {
    if queue.is_empty() {
        return 0;
    }
    let total: u64 = queue.iter().map(|e| e.wait_minutes).sum();
    let count = queue.len() as u64;
    (total + count / 2) / count
}

/// Strategy for estimating the wait of a new submission
pub trait WaitModel: Send + Sync {
    /// Estimated minutes until a request submitted now would be admitted
    fn estimate(&self, queue: &[QueueEntry], capacity: &NodeCapacity) -> u64;

    /// Model name for logs
    fn name(&self) -> &'static str;
}

/// Queue mean plus a bounded random jitter
///
/// The jitter stands in for admission overhead. Non-deterministic: this is
/// a display heuristic, not an SLA.
pub struct JitterWaitModel {
    /// Minimum added minutes
    pub floor_minutes: u64,
    /// Size of the random band above the floor
    pub spread_minutes: u64,
}

impl Default for JitterWaitModel {
    fn default() -> Self {
        Self {
            floor_minutes: 10,
            spread_minutes: 30,
        }
    }
}

impl WaitModel for JitterWaitModel {
    fn estimate(&self, queue: &[QueueEntry], _capacity: &NodeCapacity) -> u64 {
        let jitter = if self.spread_minutes == 0 {
            self.floor_minutes
        } else {
            rand::thread_rng()
                .gen_range(self.floor_minutes..self.floor_minutes + self.spread_minutes)
        };
        average_wait_minutes(queue) + jitter
    }

    fn name(&self) -> &'static str {
        "jitter"
    }
}

/// Deterministic estimate from queued GPU demand
///
/// Treats the queue as GPU-minutes of work ahead of the new request,
/// cleared at a fixed per-GPU service rate across the node's devices.
pub struct ThroughputWaitModel {
    /// Minutes to clear one queued GPU
    pub service_minutes_per_gpu: f64,
}

impl WaitModel for ThroughputWaitModel {
    fn estimate(&self, queue: &[QueueEntry], capacity: &NodeCapacity) -> u64 {
        if capacity.total_gpus == 0 {
            return 0;
        }
        let demand: u32 = queue.iter().map(|e| e.gpu_count).sum();
        let minutes =
            demand as f64 * self.service_minutes_per_gpu / capacity.total_gpus as f64;
        minutes.ceil() as u64
    }

    fn name(&self) -> &'static str {
        "throughput"
    }
}

/// Build the configured wait model
pub fn wait_model_from_config(config: &SchedulingConfig) -> Arc<dyn WaitModel> {
    match config.wait_model {
        WaitModelKind::Jitter => Arc::new(JitterWaitModel {
            floor_minutes: config.jitter_floor_minutes,
            spread_minutes: config.jitter_spread_minutes,
        }),
        WaitModelKind::Throughput => Arc::new(ThroughputWaitModel {
            service_minutes_per_gpu: config.service_minutes_per_gpu,
        }),
    }
}

/// Coarse wait bands used by display layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitBand {
    Short,
    Medium,
    Long,
    Critical,
}

impl WaitBand {
    /// Band for an estimated wait: <30 short, <60 medium, <120 long
    pub fn from_minutes(minutes: u64) -> Self {
        match minutes {
            m if m < 30 => WaitBand::Short,
            m if m < 60 => WaitBand::Medium,
            m if m < 120 => WaitBand::Long,
            _ => WaitBand::Critical,
        }
    }
}

impl std::fmt::Display for WaitBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WaitBand::Short => write!(f, "short"),
            WaitBand::Medium => write!(f, "medium"),
            WaitBand::Long => write!(f, "long"),
            WaitBand::Critical => write!(f, "critical"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetq_core::{GpuType, Priority};

    fn entry_waiting(minutes: u64, gpu_count: u32) -> QueueEntry {
        let mut entry = QueueEntry::new(
            "team".to_string(),
            "user".to_string(),
            gpu_count,
            Priority::Normal,
        );
        entry.wait_minutes = minutes;
        entry
    }

    #[test]
    fn test_empty_queue_mean_is_zero() {
        assert_eq!(average_wait_minutes(&[]), 0);
    }

    #[test]
    fn test_mean_of_two_entries() {
        let queue = vec![entry_waiting(10, 1), entry_waiting(20, 1)];
        assert_eq!(average_wait_minutes(&queue), 15);
    }

    #[test]
    fn test_mean_rounds_to_nearest() {
        let queue = vec![entry_waiting(10, 1), entry_waiting(11, 1)];
        assert_eq!(average_wait_minutes(&queue), 11);
    }

    #[test]
    fn test_jitter_estimate_stays_in_band() {
        let queue = vec![entry_waiting(10, 1), entry_waiting(20, 1)];
        let capacity = GpuType::A100.capacity();
        let model = JitterWaitModel::default();
        for _ in 0..64 {
            let estimate = model.estimate(&queue, &capacity);
            assert!((25..55).contains(&estimate), "estimate {estimate}");
        }
    }

    #[test]
    fn test_throughput_estimate_is_deterministic() {
        let queue = vec![entry_waiting(10, 2), entry_waiting(20, 2)];
        let capacity = GpuType::A100.capacity();
        let model = ThroughputWaitModel {
            service_minutes_per_gpu: 7.5,
        };
        // 4 queued GPUs * 7.5 min / 8 devices = 3.75, rounded up
        assert_eq!(model.estimate(&queue, &capacity), 4);
        assert_eq!(model.estimate(&queue, &capacity), 4);
    }

    #[test]
    fn test_throughput_empty_queue() {
        let capacity = GpuType::H200.capacity();
        let model = ThroughputWaitModel {
            service_minutes_per_gpu: 7.5,
        };
        assert_eq!(model.estimate(&[], &capacity), 0);
    }

    #[test]
    fn test_wait_bands() {
        assert_eq!(WaitBand::from_minutes(0), WaitBand::Short);
        assert_eq!(WaitBand::from_minutes(29), WaitBand::Short);
        assert_eq!(WaitBand::from_minutes(30), WaitBand::Medium);
        assert_eq!(WaitBand::from_minutes(59), WaitBand::Medium);
        assert_eq!(WaitBand::from_minutes(60), WaitBand::Long);
        assert_eq!(WaitBand::from_minutes(119), WaitBand::Long);
        assert_eq!(WaitBand::from_minutes(120), WaitBand::Critical);
    }
}
