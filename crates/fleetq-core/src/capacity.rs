//! Node class capacities and the resource-request catalog

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::FleetError;

/// GPU classes offered by the fleet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GpuType {
    A100,
    H100,
    A30,
    H200,
}

impl GpuType {
    /// All classes, in catalog order
    pub const ALL: [GpuType; 4] = [GpuType::A100, GpuType::H100, GpuType::A30, GpuType::H200];

    /// Fixed capacity of a node of this class
    pub const fn capacity(self) -> NodeCapacity {
        match self {
            GpuType::A100 => NodeCapacity {
                total_gpus: 8,
                cpu_cores: 128,
                memory_gb: 512,
            },
            GpuType::H100 => NodeCapacity {
                total_gpus: 4,
                cpu_cores: 64,
                memory_gb: 256,
            },
            GpuType::A30 => NodeCapacity {
                total_gpus: 6,
                cpu_cores: 48,
                memory_gb: 192,
            },
            GpuType::H200 => NodeCapacity {
                total_gpus: 2,
                cpu_cores: 32,
                memory_gb: 128,
            },
        }
    }
}

impl std::fmt::Display for GpuType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GpuType::A100 => write!(f, "A100"),
            GpuType::H100 => write!(f, "H100"),
            GpuType::A30 => write!(f, "A30"),
            GpuType::H200 => write!(f, "H200"),
        }
    }
}

impl FromStr for GpuType {
    type Err = FleetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A100" => Ok(GpuType::A100),
            "H100" => Ok(GpuType::H100),
            "A30" => Ok(GpuType::A30),
            "H200" => Ok(GpuType::H200),
            _ => Err(FleetError::UnknownGpuType(s.to_string())),
        }
    }
}

/// Fixed capacity of a node class
///
/// Read-only: capacities never change at runtime. The total GPU count is the
/// hard ceiling the constraint validator checks requests against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeCapacity {
    /// Number of physical GPU slots
    pub total_gpus: u32,
    /// CPU core count
    pub cpu_cores: u32,
    /// Memory size in GB
    pub memory_gb: u32,
}

/// A resource-request template
///
/// Requests are drawn from the fixed catalog below, never free-form. `cpu`
/// and `memory` are percentage shares of a node's cores and memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// GPUs per replica
    pub gpu: u32,
    /// CPU share in percent
    pub cpu: u32,
    /// Memory share in percent
    pub memory: u32,
}

/// The fixed request catalog
const CATALOG: [ResourceConfig; 7] = [
    ResourceConfig { gpu: 1, cpu: 25, memory: 25 },
    ResourceConfig { gpu: 1, cpu: 50, memory: 50 },
    ResourceConfig { gpu: 1, cpu: 100, memory: 100 },
    ResourceConfig { gpu: 2, cpu: 50, memory: 50 },
    ResourceConfig { gpu: 2, cpu: 100, memory: 100 },
    ResourceConfig { gpu: 4, cpu: 100, memory: 100 },
    ResourceConfig { gpu: 8, cpu: 100, memory: 100 },
];

impl ResourceConfig {
    /// The enumerated catalog offered to requesters
    pub fn catalog() -> &'static [ResourceConfig] {
        &CATALOG
    }

    /// Whether this exact triple is in the catalog
    pub fn is_cataloged(&self) -> bool {
        CATALOG.contains(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gpu_type_parse() {
        assert_eq!("A100".parse::<GpuType>().unwrap(), GpuType::A100);
        assert_eq!("h200".parse::<GpuType>().unwrap(), GpuType::H200);

        let err = "B200".parse::<GpuType>().unwrap_err();
        assert!(matches!(err, FleetError::UnknownGpuType(tag) if tag == "B200"));
    }

    #[test]
    fn test_gpu_type_display_round_trip() {
        for gpu_type in GpuType::ALL {
            let parsed: GpuType = gpu_type.to_string().parse().unwrap();
            assert_eq!(parsed, gpu_type);
        }
    }

    #[test]
    fn test_capacity_values() {
        assert_eq!(GpuType::A100.capacity().total_gpus, 8);
        assert_eq!(GpuType::H100.capacity().total_gpus, 4);
        assert_eq!(GpuType::A30.capacity().total_gpus, 6);
        assert_eq!(GpuType::H200.capacity().total_gpus, 2);
        assert_eq!(GpuType::A100.capacity().cpu_cores, 128);
        assert_eq!(GpuType::A100.capacity().memory_gb, 512);
    }

    #[test]
    fn test_catalog_membership() {
        let cataloged = ResourceConfig {
            gpu: 2,
            cpu: 50,
            memory: 50,
        };
        assert!(cataloged.is_cataloged());

        let free_form = ResourceConfig {
            gpu: 3,
            cpu: 50,
            memory: 50,
        };
        assert!(!free_form.is_cataloged());
    }

    #[test]
    fn test_catalog_gpu_counts_are_powers_of_two() {
        for config in ResourceConfig::catalog() {
            assert!(matches!(config.gpu, 1 | 2 | 4 | 8));
        }
    }
}
