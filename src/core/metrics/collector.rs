use std::path::Path;

use sysinfo::{CpuRefreshKind, Disks, MemoryRefreshKind, Networks, RefreshKind, System};

use super::types::{NetworkTotals, PartitionInfo};
use crate::error::{RboostError, Result};

/// Synchronous, fallible reads of the host's counters.
pub trait MetricsSource {
    /// Global processor load in percent.
    fn cpu_percent(&mut self) -> Result<f32>;

    /// Physical memory in use, in percent.
    fn ram_percent(&mut self) -> Result<f32>;

    /// Cumulative bytes sent and received over all interfaces.
    fn network_totals(&mut self) -> Result<NetworkTotals>;

    /// Used space of the volume mounted at `mount`, in percent.
    fn disk_usage(&mut self, mount: &str) -> Result<f32>;

    /// Every mounted partition.
    fn partitions(&mut self) -> Result<Vec<PartitionInfo>>;
}

/// [`MetricsSource`] backed by `sysinfo`.
pub struct SysinfoSource {
    system: System,
    networks: Networks,
    disks: Disks,
}

impl SysinfoSource {
    pub fn new() -> Self {
        let refresh_kind = RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::nothing().with_cpu_usage())
            .with_memory(MemoryRefreshKind::nothing().with_ram());

        Self {
            system: System::new_with_specifics(refresh_kind),
            networks: Networks::new_with_refreshed_list(),
            disks: Disks::new_with_refreshed_list(),
        }
    }
}

impl Default for SysinfoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSource for SysinfoSource {
    fn cpu_percent(&mut self) -> Result<f32> {
        self.system.refresh_cpu_usage();
        if self.system.cpus().is_empty() {
            return Err(RboostError::metric_collection("no processors reported"));
        }
        Ok(self.system.global_cpu_usage())
    }

    fn ram_percent(&mut self) -> Result<f32> {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        if total == 0 {
            return Err(RboostError::metric_collection("total memory reported as 0"));
        }
        Ok((self.system.used_memory() as f64 / total as f64 * 100.0) as f32)
    }

    fn network_totals(&mut self) -> Result<NetworkTotals> {
        self.networks.refresh(true);
        let totals = self
            .networks
            .values()
            .fold(NetworkTotals::default(), |acc, data| NetworkTotals {
                bytes_sent: acc.bytes_sent.saturating_add(data.total_transmitted()),
                bytes_recv: acc.bytes_recv.saturating_add(data.total_received()),
            });
        Ok(totals)
    }

    fn disk_usage(&mut self, mount: &str) -> Result<f32> {
        self.disks.refresh(true);
        let wanted = Path::new(mount);
        let disk = self
            .disks
            .iter()
            .find(|disk| disk.mount_point() == wanted)
            .ok_or_else(|| RboostError::metric_collection(format!("volume {} not found", mount)))?;

        let total = disk.total_space();
        if total == 0 {
            return Err(RboostError::metric_collection(format!(
                "volume {} reports no capacity",
                mount
            )));
        }
        let used = total.saturating_sub(disk.available_space());
        Ok((used as f64 / total as f64 * 100.0) as f32)
    }

    fn partitions(&mut self) -> Result<Vec<PartitionInfo>> {
        self.disks.refresh(true);
        Ok(self
            .disks
            .iter()
            .map(|disk| PartitionInfo {
                device: disk.name().to_string_lossy().to_string(),
                mount_point: disk.mount_point().to_string_lossy().to_string(),
                fs_type: disk.file_system().to_string_lossy().to_string(),
                total_bytes: disk.total_space(),
                available_bytes: disk.available_space(),
            })
            .collect())
    }
}
