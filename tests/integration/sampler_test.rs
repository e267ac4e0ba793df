// Integration tests for the metrics sampler driven by the interactive loop

use rboost::core::dispatch::Dispatcher;
use rboost::core::metrics::{MetricSample, MetricsSampler, MetricsSource, NetworkTotals, PartitionInfo};
use rboost::error::{RboostError, Result};
use rboost::ui::{Dashboard, RenderMode};
use std::time::{Duration, Instant};

/// Counters that grow by a fixed amount per read.
struct SteadySource {
    reads: u64,
    bytes_per_read: u64,
    disk_fails: bool,
}

impl MetricsSource for SteadySource {
    fn cpu_percent(&mut self) -> Result<f32> {
        Ok(25.0)
    }

    fn ram_percent(&mut self) -> Result<f32> {
        Ok(50.0)
    }

    fn network_totals(&mut self) -> Result<NetworkTotals> {
        self.reads += 1;
        let total = self.reads * self.bytes_per_read;
        Ok(NetworkTotals::new(total / 2, total / 2))
    }

    fn disk_usage(&mut self, _mount: &str) -> Result<f32> {
        if self.disk_fails {
            Err(RboostError::metric_collection("disk offline"))
        } else {
            Ok(33.3)
        }
    }

    fn partitions(&mut self) -> Result<Vec<PartitionInfo>> {
        Ok(Vec::new())
    }
}

#[test]
fn test_window_holds_last_sixty_samples() {
    let source = SteadySource {
        reads: 0,
        bytes_per_read: 2048,
        disk_fails: false,
    };
    let mut sampler = MetricsSampler::new(source, 60, "/");
    let start = Instant::now();

    for i in 0..61 {
        sampler.tick(start + Duration::from_secs(i)).unwrap();
    }

    let samples: Vec<MetricSample> = sampler.window().to_vec();
    assert_eq!(samples.len(), 60);
    // The first (baseline) sample was evicted; every remaining one saw 2 KB in 1 s.
    assert_eq!(samples[0].timestamp, 1.0);
    assert!(samples.iter().all(|s| (s.net_kb_per_sec - 2.0).abs() < 1e-9));
    assert_eq!(samples.last().map(|s| s.timestamp), Some(60.0));
}

#[test]
fn test_dashboard_receives_ticks_through_dispatcher() {
    let source = SteadySource {
        reads: 0,
        bytes_per_read: 1024,
        disk_fails: false,
    };
    let mut dispatcher: Dispatcher<Dashboard> = Dispatcher::new();
    let timer = MetricsSampler::new(source, 3, "/").install(&mut dispatcher, Duration::from_secs(1));

    let mut dashboard = Dashboard::new(RenderMode::Quiet, true);
    let start = Instant::now();
    for i in 0..5 {
        dispatcher.pump_at(&mut dashboard, start + Duration::from_millis(10 + 1000 * i));
    }

    assert_eq!(dashboard.metrics_updates(), 5);
    assert_eq!(dashboard.history().len(), 3);
    // Ticks run at the pump instants, one second apart, 1 KB each.
    assert!(dashboard.history().iter().all(|s| (s.net_kb_per_sec - 1.0).abs() < 1e-9));
    assert_eq!(dashboard.disk_label(), Some("Disk Usage: / (33.3%)".to_string()));

    timer.cancel();
    dispatcher.pump_at(&mut dashboard, start + Duration::from_secs(30));
    assert_eq!(dashboard.metrics_updates(), 5);
}

#[test]
fn test_disk_failure_does_not_stop_sampling() {
    let source = SteadySource {
        reads: 0,
        bytes_per_read: 0,
        disk_fails: true,
    };
    let mut dispatcher: Dispatcher<Dashboard> = Dispatcher::new();
    MetricsSampler::new(source, 60, "/").install(&mut dispatcher, Duration::from_secs(1));

    let mut dashboard = Dashboard::new(RenderMode::Quiet, true);
    let start = Instant::now();
    for i in 0..3 {
        dispatcher.pump_at(&mut dashboard, start + Duration::from_millis(10 + 1000 * i));
    }

    assert_eq!(dashboard.metrics_updates(), 3);
    assert_eq!(dashboard.disk_label(), None);
}

#[test]
fn test_shutdown_stops_sampler() {
    let source = SteadySource {
        reads: 0,
        bytes_per_read: 0,
        disk_fails: false,
    };
    let mut dispatcher: Dispatcher<Dashboard> = Dispatcher::new();
    let timer = MetricsSampler::new(source, 60, "/").install(&mut dispatcher, Duration::from_secs(1));
    let mut dashboard = Dashboard::new(RenderMode::Quiet, true);

    dispatcher.pump(&mut dashboard);
    assert_eq!(dashboard.metrics_updates(), 1);

    dispatcher.shutdown();
    assert!(timer.is_cancelled());
    dispatcher.pump_at(&mut dashboard, Instant::now() + Duration::from_secs(10));
    assert_eq!(dashboard.metrics_updates(), 1);
}
