use std::time::{Duration, Instant};

use super::collector::MetricsSource;
use super::history::RollingWindow;
use super::types::{DiskSnapshot, MetricSample, NetworkTotals};
use crate::core::dispatch::{Dispatcher, TimerHandle};
use crate::error::Result;

/// UI state that can display live metrics.
pub trait MetricsSurface: 'static {
    /// Called after every successful tick with the whole window.
    fn show_metrics(&mut self, window: &RollingWindow<MetricSample>, disk: Option<&DiskSnapshot>);

    /// Full partition breakdown, on demand.
    fn show_partitions(&mut self, partitions: &[DiskSnapshot]);
}

/// Network counters and when they were read.
#[derive(Debug, Clone, Copy)]
struct Baseline {
    totals: NetworkTotals,
    at: Instant,
}

pub struct MetricsSampler<M> {
    source: M,
    window: RollingWindow<MetricSample>,
    primary_volume: String,
    disk: Option<DiskSnapshot>,
    baseline: Option<Baseline>,
    started: Option<Instant>,
}

impl<M: MetricsSource> MetricsSampler<M> {
    pub fn new<V: Into<String>>(source: M, capacity: usize, primary_volume: V) -> Self {
        Self {
            source,
            window: RollingWindow::new(capacity),
            primary_volume: primary_volume.into(),
            disk: None,
            baseline: None,
            started: None,
        }
    }

    pub fn window(&self) -> &RollingWindow<MetricSample> {
        &self.window
    }

    pub fn latest_disk(&self) -> Option<&DiskSnapshot> {
        self.disk.as_ref()
    }

    /// Take one sample as of `now`.
    ///
    /// If cpu, memory or network cannot be read the whole tick is skipped:
    /// neither the window nor the network baseline changes. The disk gauge is
    /// best effort and keeps its previous value on failure.
    pub fn tick(&mut self, now: Instant) -> Result<MetricSample> {
        let cpu_percent = self.source.cpu_percent()?;
        let ram_percent = self.source.ram_percent()?;
        let totals = self.source.network_totals()?;

        let net_kb_per_sec = match self.baseline {
            None => 0.0,
            Some(previous) => {
                let elapsed = now.saturating_duration_since(previous.at).as_secs_f64();
                if elapsed > 0.0 {
                    (totals.delta_since(&previous.totals) as f64 / 1024.0) / elapsed
                } else {
                    0.0
                }
            }
        };
        self.baseline = Some(Baseline { totals, at: now });

        let started = *self.started.get_or_insert(now);
        let sample = MetricSample {
            timestamp: now.saturating_duration_since(started).as_secs_f64(),
            cpu_percent,
            ram_percent,
            net_kb_per_sec,
        };
        self.window.push(sample);

        match self.source.disk_usage(&self.primary_volume) {
            Ok(percent_used) => {
                self.disk = Some(DiskSnapshot::new(self.primary_volume.clone(), percent_used))
            }
            Err(e) => log::warn!("Disk usage for {} unavailable: {}", self.primary_volume, e),
        }

        Ok(sample)
    }
}

impl<M: MetricsSource + 'static> MetricsSampler<M> {
    /// Hand the sampler to the interactive loop. It ticks immediately, then
    /// every `period` until the returned handle is cancelled or the
    /// dispatcher shuts down. Failed ticks are logged and never stop the
    /// schedule.
    pub fn install<S: MetricsSurface>(mut self, dispatcher: &mut Dispatcher<S>, period: Duration) -> TimerHandle {
        log::info!(
            "Metrics sampler started: every {} ms, window of {}",
            period.as_millis(),
            self.window.capacity()
        );
        dispatcher.every_after(Duration::ZERO, period, move |surface: &mut S, now| {
            match self.tick(now) {
                Ok(_) => surface.show_metrics(&self.window, self.disk.as_ref()),
                Err(e) => log::error!("Error updating metrics: {}", e),
            }
        })
    }
}

/// Usage of every mounted partition that carries a filesystem.
pub fn partition_breakdown<M: MetricsSource + ?Sized>(source: &mut M) -> Result<Vec<DiskSnapshot>> {
    Ok(source
        .partitions()?
        .into_iter()
        .filter(|p| !p.fs_type.trim().is_empty())
        .map(|p| {
            let label = if p.device.is_empty() || p.device == p.mount_point {
                p.mount_point.clone()
            } else {
                format!("{} ({})", p.device, p.mount_point)
            };
            DiskSnapshot::new(label, p.percent_used())
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metrics::PartitionInfo;
    use crate::error::RboostError;
    use std::collections::VecDeque;

    /// Replays scripted readings; `None` makes the read fail.
    #[derive(Default)]
    struct ScriptedSource {
        cpu: VecDeque<Option<f32>>,
        net: VecDeque<Option<NetworkTotals>>,
        disk: VecDeque<Option<f32>>,
        partitions: Vec<PartitionInfo>,
    }

    impl MetricsSource for ScriptedSource {
        fn cpu_percent(&mut self) -> Result<f32> {
            self.cpu
                .pop_front()
                .flatten()
                .ok_or_else(|| RboostError::metric_collection("cpu"))
        }

        fn ram_percent(&mut self) -> Result<f32> {
            Ok(40.0)
        }

        fn network_totals(&mut self) -> Result<NetworkTotals> {
            self.net
                .pop_front()
                .flatten()
                .ok_or_else(|| RboostError::metric_collection("net"))
        }

        fn disk_usage(&mut self, _mount: &str) -> Result<f32> {
            self.disk
                .pop_front()
                .flatten()
                .ok_or_else(|| RboostError::metric_collection("disk"))
        }

        fn partitions(&mut self) -> Result<Vec<PartitionInfo>> {
            Ok(self.partitions.clone())
        }
    }

    #[test]
    fn test_first_tick_reports_zero_rate() {
        let source = ScriptedSource {
            cpu: VecDeque::from([Some(12.0)]),
            net: VecDeque::from([Some(NetworkTotals::new(9_999_999, 8_888_888))]),
            disk: VecDeque::from([Some(55.0)]),
            ..Default::default()
        };
        let mut sampler = MetricsSampler::new(source, 60, "/");

        let sample = sampler.tick(Instant::now()).unwrap();
        assert_eq!(sample.net_kb_per_sec, 0.0);
        assert_eq!(sample.timestamp, 0.0);
        assert_eq!(sampler.window().len(), 1);
        assert_eq!(sampler.latest_disk(), Some(&DiskSnapshot::new("/", 55.0)));
    }

    #[test]
    fn test_rate_from_counter_deltas() {
        let source = ScriptedSource {
            cpu: VecDeque::from([Some(10.0), Some(20.0)]),
            net: VecDeque::from([
                Some(NetworkTotals::new(1000, 2000)),
                Some(NetworkTotals::new(1500, 2200)),
            ]),
            ..Default::default()
        };
        let mut sampler = MetricsSampler::new(source, 60, "/");
        let t0 = Instant::now();

        sampler.tick(t0).unwrap();
        let sample = sampler.tick(t0 + Duration::from_secs(1)).unwrap();

        assert!((sample.net_kb_per_sec - 700.0 / 1024.0).abs() < 1e-9);
        assert!((sample.net_kb_per_sec - 0.684).abs() < 0.001);
        assert_eq!(sample.timestamp, 1.0);
        assert_eq!(sampler.window().cpu_series(), vec![10.0, 20.0]);
    }

    #[test]
    fn test_failed_read_skips_tick() {
        let source = ScriptedSource {
            cpu: VecDeque::from([Some(10.0), Some(11.0), Some(12.0)]),
            net: VecDeque::from([
                Some(NetworkTotals::new(0, 0)),
                None,
                Some(NetworkTotals::new(2048, 0)),
            ]),
            ..Default::default()
        };
        let mut sampler = MetricsSampler::new(source, 60, "/");
        let t0 = Instant::now();

        sampler.tick(t0).unwrap();
        let err = sampler.tick(t0 + Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, RboostError::MetricCollection(_)));
        assert_eq!(sampler.window().len(), 1);

        // The baseline is still the first tick, two seconds back.
        let sample = sampler.tick(t0 + Duration::from_secs(2)).unwrap();
        assert!((sample.net_kb_per_sec - 1.0).abs() < 1e-9);
        assert_eq!(sampler.window().len(), 2);
    }

    #[test]
    fn test_disk_failure_keeps_previous_snapshot() {
        let source = ScriptedSource {
            cpu: VecDeque::from([Some(1.0), Some(2.0)]),
            net: VecDeque::from([Some(NetworkTotals::default()), Some(NetworkTotals::default())]),
            disk: VecDeque::from([Some(70.5), None]),
            ..Default::default()
        };
        let mut sampler = MetricsSampler::new(source, 60, "C:\\");
        let t0 = Instant::now();

        sampler.tick(t0).unwrap();
        sampler.tick(t0 + Duration::from_secs(1)).unwrap();
        assert_eq!(sampler.window().len(), 2);
        assert_eq!(sampler.latest_disk(), Some(&DiskSnapshot::new("C:\\", 70.5)));
    }

    #[test]
    fn test_window_is_bounded() {
        let source = ScriptedSource {
            cpu: (0..61).map(|i| Some(i as f32)).collect(),
            net: (0..61).map(|_| Some(NetworkTotals::default())).collect(),
            ..Default::default()
        };
        let mut sampler = MetricsSampler::new(source, 60, "/");
        let t0 = Instant::now();
        for i in 0..61 {
            sampler.tick(t0 + Duration::from_secs(i)).unwrap();
        }

        let cpu = sampler.window().cpu_series();
        assert_eq!(cpu.len(), 60);
        assert_eq!(cpu.first(), Some(&1.0));
        assert_eq!(cpu.last(), Some(&60.0));
    }

    #[test]
    fn test_partition_breakdown_skips_unformatted() {
        let mut source = ScriptedSource {
            partitions: vec![
                PartitionInfo {
                    device: "/dev/sda1".to_string(),
                    mount_point: "/".to_string(),
                    fs_type: "ext4".to_string(),
                    total_bytes: 400,
                    available_bytes: 100,
                },
                PartitionInfo {
                    device: "/dev/sr0".to_string(),
                    mount_point: "/media/cdrom".to_string(),
                    fs_type: String::new(),
                    total_bytes: 0,
                    available_bytes: 0,
                },
            ],
            ..Default::default()
        };

        let breakdown = partition_breakdown(&mut source).unwrap();
        assert_eq!(breakdown, vec![DiskSnapshot::new("/dev/sda1 (/)", 75.0)]);
    }

    struct Screen {
        ticks: Vec<usize>,
    }

    impl MetricsSurface for Screen {
        fn show_metrics(&mut self, window: &RollingWindow<MetricSample>, _disk: Option<&DiskSnapshot>) {
            self.ticks.push(window.len());
        }

        fn show_partitions(&mut self, _partitions: &[DiskSnapshot]) {}
    }

    #[test]
    fn test_installed_sampler_survives_failures() {
        let source = ScriptedSource {
            cpu: VecDeque::from([Some(1.0), None, Some(3.0)]),
            net: VecDeque::from([Some(NetworkTotals::default()), Some(NetworkTotals::default())]),
            ..Default::default()
        };
        let mut dispatcher: Dispatcher<Screen> = Dispatcher::new();
        let handle = MetricsSampler::new(source, 60, "/").install(&mut dispatcher, Duration::from_secs(1));
        let mut screen = Screen { ticks: Vec::new() };
        let start = Instant::now();

        for i in 0..3 {
            dispatcher.pump_at(&mut screen, start + Duration::from_millis(100 + 1000 * i));
        }
        assert_eq!(screen.ticks, vec![1, 2]);
        assert_eq!(dispatcher.pending_timers(), 1);

        handle.cancel();
        dispatcher.pump_at(&mut screen, start + Duration::from_secs(10));
        assert_eq!(dispatcher.pending_timers(), 0);
    }
}
