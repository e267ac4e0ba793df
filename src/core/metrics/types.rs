use serde::{Deserialize, Serialize};

/// One tick of the sampler.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// Seconds since the sampler's first successful tick.
    pub timestamp: f64,
    pub cpu_percent: f32,
    pub ram_percent: f32,
    pub net_kb_per_sec: f64,
}

/// Usage of a single volume. Only the latest value is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskSnapshot {
    pub mount_label: String,
    pub percent_used: f32,
}

impl DiskSnapshot {
    pub fn new<S: Into<String>>(mount_label: S, percent_used: f32) -> Self {
        Self {
            mount_label: mount_label.into(),
            percent_used,
        }
    }

    /// Text shown next to the disk gauge.
    pub fn label(&self) -> String {
        format!("Disk Usage: {} ({:.1}%)", self.mount_label, self.percent_used)
    }
}

/// Cumulative byte counters summed over every interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkTotals {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
}

impl NetworkTotals {
    pub fn new(bytes_sent: u64, bytes_recv: u64) -> Self {
        Self {
            bytes_sent,
            bytes_recv,
        }
    }

    /// Bytes moved in both directions since `earlier`. A counter that went
    /// backwards (interface reset) contributes 0.
    pub fn delta_since(&self, earlier: &NetworkTotals) -> u64 {
        self.bytes_sent
            .saturating_sub(earlier.bytes_sent)
            .saturating_add(self.bytes_recv.saturating_sub(earlier.bytes_recv))
    }
}

/// A mounted partition as reported by the operating system.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartitionInfo {
    pub device: String,
    pub mount_point: String,
    pub fs_type: String,
    pub total_bytes: u64,
    pub available_bytes: u64,
}

impl PartitionInfo {
    pub fn used_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.available_bytes)
    }

    pub fn percent_used(&self) -> f32 {
        if self.total_bytes > 0 {
            (self.used_bytes() as f64 / self.total_bytes as f64 * 100.0) as f32
        } else {
            0.0
        }
    }
}
