pub mod probe;
pub mod sampler;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Latest host utilisation reading. No history is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub cpu_percent: f64,
    pub memory_used_bytes: u64,
    pub memory_total_bytes: u64,
    pub memory_percent: f64,
    pub disk_percent: f64,
    pub sampled_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("cpu usage reading unavailable")]
    CpuUnavailable,
    #[error("memory totals unavailable")]
    MemoryUnavailable,
    #[error("no disk mounted at {}", .0.display())]
    DiskNotFound(PathBuf),
    #[error("disk at {} reports zero capacity", .0.display())]
    DiskUnavailable(PathBuf),
    #[error("resource probe failed: {0}")]
    Probe(String),
}

pub fn percent_of(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64 * 100.0).clamp(0.0, 100.0)
    }
}
