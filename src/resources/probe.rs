use std::path::{Path, PathBuf};

use chrono::Utc;
use sysinfo::{Disks, System};

use crate::resources::{percent_of, ResourceSnapshot, SamplingError};

/// Source of host readings. Implementations keep whatever state they need
/// between samples (CPU usage is a delta between two refreshes).
pub trait ResourceProbe: Send {
    fn sample(&mut self) -> Result<ResourceSnapshot, SamplingError>;
}

pub struct SystemProbe {
    system: System,
    disks: Disks,
    disk_mount: PathBuf,
}

impl SystemProbe {
    pub fn new(disk_mount: impl Into<PathBuf>) -> Self {
        let mut system = System::new();
        // Prime the CPU counters so the first tick reports a real delta.
        system.refresh_cpu_usage();
        Self {
            system,
            disks: Disks::new_with_refreshed_list(),
            disk_mount: disk_mount.into(),
        }
    }

    fn disk_percent(&mut self) -> Result<f64, SamplingError> {
        self.disks.refresh_list();
        let disk = self
            .disks
            .list()
            .iter()
            .filter(|disk| self.disk_mount.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().as_os_str().len())
            .ok_or_else(|| SamplingError::DiskNotFound(self.disk_mount.clone()))?;
        let total = disk.total_space();
        if total == 0 {
            return Err(SamplingError::DiskUnavailable(self.disk_mount.clone()));
        }
        let used = total.saturating_sub(disk.available_space());
        Ok(percent_of(used, total))
    }

    pub fn disk_mount(&self) -> &Path {
        &self.disk_mount
    }
}

impl ResourceProbe for SystemProbe {
    fn sample(&mut self) -> Result<ResourceSnapshot, SamplingError> {
        self.system.refresh_cpu_usage();
        let cpu_percent = f64::from(self.system.global_cpu_usage());
        if !cpu_percent.is_finite() {
            return Err(SamplingError::CpuUnavailable);
        }

        self.system.refresh_memory();
        let memory_total_bytes = self.system.total_memory();
        if memory_total_bytes == 0 {
            return Err(SamplingError::MemoryUnavailable);
        }
        let memory_used_bytes = self.system.used_memory();

        let disk_percent = self.disk_percent()?;

        Ok(ResourceSnapshot {
            cpu_percent: cpu_percent.clamp(0.0, 100.0),
            memory_used_bytes,
            memory_total_bytes,
            memory_percent: percent_of(memory_used_bytes, memory_total_bytes),
            disk_percent,
            sampled_at: Utc::now(),
        })
    }
}
