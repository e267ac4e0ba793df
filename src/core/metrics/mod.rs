//! Live system metrics.
//!
//! A [`MetricsSampler`] polls a [`MetricsSource`] on a repeating timer owned
//! by the interactive loop and keeps the most recent samples in a bounded
//! [`RollingWindow`].

mod collector;
mod history;
mod sampler;
mod types;

pub use collector::{MetricsSource, SysinfoSource};
pub use history::{RollingWindow, DEFAULT_HISTORY_SIZE};
pub use sampler::{partition_breakdown, MetricsSampler, MetricsSurface};
pub use types::{DiskSnapshot, MetricSample, NetworkTotals, PartitionInfo};
