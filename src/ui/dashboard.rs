//! Console dashboard: the UI state every update is applied to.

use chrono::{DateTime, Local};
use colored::{Color, Colorize};
use serde::Serialize;

use super::formatters::{format_clock, format_percent, format_rate};
use super::progress::{clear_line, show_progress_bar};
use crate::core::config::Theme;
use crate::core::metrics::{DiskSnapshot, MetricSample, MetricsSurface, RollingWindow};
use crate::core::task_runner::{Task, TaskState, TaskSurface};

const STATUS_LOG_CAPACITY: usize = 200;
const FINISHED_TASK_CAPACITY: usize = 50;

/// How the dashboard echoes updates to the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// Keep state only.
    #[default]
    Quiet,
    Text,
    /// One JSON object per metrics tick.
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub at: DateTime<Local>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FinishedTask {
    pub label: String,
    pub state: TaskState,
}

#[derive(Serialize)]
struct MetricsLine<'a> {
    #[serde(flatten)]
    sample: &'a MetricSample,
    disk: Option<&'a DiskSnapshot>,
}

/// Colors of the cpu, ram and network columns.
fn metric_colors(theme: Theme) -> [Color; 3] {
    match theme {
        Theme::Dark => [Color::BrightCyan, Color::BrightMagenta, Color::BrightYellow],
        Theme::Light => [Color::Blue, Color::Magenta, Color::Red],
        Theme::System => [Color::Cyan, Color::Magenta, Color::Yellow],
    }
}

pub struct Dashboard {
    mode: RenderMode,
    theme: Theme,
    auto_reboot_prompt: bool,
    progress: f32,
    status: RollingWindow<StatusLine>,
    history: Vec<MetricSample>,
    disk: Option<DiskSnapshot>,
    partitions: Vec<DiskSnapshot>,
    finished: RollingWindow<FinishedTask>,
    finished_count: u64,
    reboot_requested: bool,
    metrics_updates: u64,
    bar_visible: bool,
}

impl Dashboard {
    pub fn new(mode: RenderMode, auto_reboot_prompt: bool) -> Self {
        Self {
            mode,
            theme: Theme::default(),
            auto_reboot_prompt,
            progress: 0.0,
            status: RollingWindow::new(STATUS_LOG_CAPACITY),
            history: Vec::new(),
            disk: None,
            partitions: Vec::new(),
            finished: RollingWindow::new(FINISHED_TASK_CAPACITY),
            finished_count: 0,
            reboot_requested: false,
            metrics_updates: 0,
            bar_visible: false,
        }
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn status_log(&self) -> impl Iterator<Item = &StatusLine> {
        self.status.iter()
    }

    pub fn last_status(&self) -> Option<&str> {
        self.status.latest().map(|line| line.message.as_str())
    }

    /// Snapshot of the metrics window as of the last tick.
    pub fn history(&self) -> &[MetricSample] {
        &self.history
    }

    pub fn latest_sample(&self) -> Option<&MetricSample> {
        self.history.last()
    }

    /// Number of metrics ticks shown so far.
    pub fn metrics_updates(&self) -> u64 {
        self.metrics_updates
    }

    pub fn disk_label(&self) -> Option<String> {
        self.disk.as_ref().map(DiskSnapshot::label)
    }

    pub fn partitions(&self) -> &[DiskSnapshot] {
        &self.partitions
    }

    /// The most recent finished tasks, oldest first.
    pub fn finished_tasks(&self) -> impl Iterator<Item = &FinishedTask> {
        self.finished.iter()
    }

    pub fn last_finished(&self) -> Option<&FinishedTask> {
        self.finished.latest()
    }

    /// Number of tasks finished since the dashboard was created.
    pub fn finished_count(&self) -> u64 {
        self.finished_count
    }

    pub fn reboot_requested(&self) -> bool {
        self.reboot_requested
    }

    /// Consume a pending reboot request.
    pub fn take_reboot_request(&mut self) -> bool {
        std::mem::take(&mut self.reboot_requested)
    }

    fn end_bar(&mut self) {
        if self.bar_visible {
            clear_line();
            self.bar_visible = false;
        }
    }
}

impl TaskSurface for Dashboard {
    fn set_progress(&mut self, fraction: f32, message: Option<&str>) {
        self.progress = fraction;
        if let Some(message) = message {
            self.log_status(message);
        }
        if self.mode == RenderMode::Text {
            show_progress_bar(fraction, message.unwrap_or(""));
            self.bar_visible = true;
        }
    }

    fn log_status(&mut self, message: &str) {
        let line = StatusLine {
            at: Local::now(),
            message: message.to_string(),
        };
        if self.mode == RenderMode::Text {
            self.end_bar();
            println!("{} {}", format_clock(&line.at).dimmed(), line.message);
        }
        self.status.push(line);
    }

    fn prompt_reboot(&mut self) {
        if self.auto_reboot_prompt {
            self.reboot_requested = true;
            self.log_status("Some changes require a system reboot to take effect.");
        } else {
            log::info!("Reboot prompt suppressed by settings");
        }
    }

    fn task_finished(&mut self, task: &Task) {
        if self.mode == RenderMode::Text {
            self.end_bar();
            match task.state() {
                TaskState::Succeeded => println!("{}", format!("{} done", task.label()).green()),
                TaskState::Failed(reason) => {
                    eprintln!("{}", format!("{} failed: {}", task.label(), reason).red())
                }
                _ => {}
            }
        }
        self.finished.push(FinishedTask {
            label: task.label().to_string(),
            state: task.state().clone(),
        });
        self.finished_count += 1;
    }
}

impl MetricsSurface for Dashboard {
    fn show_metrics(&mut self, window: &RollingWindow<MetricSample>, disk: Option<&DiskSnapshot>) {
        self.history = window.to_vec();
        self.metrics_updates += 1;
        if let Some(disk) = disk {
            self.disk = Some(disk.clone());
        }
        let Some(sample) = self.history.last() else {
            return;
        };

        match self.mode {
            RenderMode::Quiet => {}
            RenderMode::Text => {
                let [cpu, ram, net] = metric_colors(self.theme);
                let disk = self.disk_label().unwrap_or_else(|| "Disk Usage: n/a".to_string());
                println!(
                    "{} CPU {} | RAM {} | NET {:>12} | {}",
                    format!("[{:>7.1}s]", sample.timestamp).dimmed(),
                    format_percent(sample.cpu_percent).color(cpu),
                    format_percent(sample.ram_percent).color(ram),
                    format_rate(sample.net_kb_per_sec).color(net),
                    disk
                );
            }
            RenderMode::Json => {
                let line = MetricsLine {
                    sample,
                    disk: self.disk.as_ref(),
                };
                match serde_json::to_string(&line) {
                    Ok(json) => println!("{}", json),
                    Err(e) => log::error!("Failed to serialize metrics: {}", e),
                }
            }
        }
    }

    fn show_partitions(&mut self, partitions: &[DiskSnapshot]) {
        self.partitions = partitions.to_vec();
        if self.mode == RenderMode::Text {
            self.end_bar();
            for partition in partitions {
                println!(
                    "  {:<30} {}",
                    partition.mount_label,
                    format_percent(partition.percent_used)
                );
            }
        }
    }
}
