//! Wires the interactive loop: dispatcher, runner, sampler and timers.

use anyhow::{Context, Result};
use tokio::sync::broadcast;

use crate::core::config::Config;
use crate::core::dispatch::{Dispatcher, RunExit, TimerHandle};
use crate::core::metrics::{MetricsSampler, SysinfoSource};
use crate::core::task_runner::TaskRunner;
use crate::core::toolbox::{install_silent_cleanup, ActionContext, ToolboxAction};
use crate::ui::{Dashboard, RenderMode};

pub struct App {
    config: Config,
    dashboard: Dashboard,
    dispatcher: Dispatcher<Dashboard>,
    runner: TaskRunner<Dashboard>,
    shutdown_tx: broadcast::Sender<()>,
    shutdown_rx: broadcast::Receiver<()>,
    timers: Vec<TimerHandle>,
}

impl App {
    pub fn new(config: Config, mode: RenderMode) -> Self {
        let dispatcher = Dispatcher::new();
        let runner = TaskRunner::with_config(dispatcher.sender(), config.runner.runner_config());
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        Self {
            dashboard: Dashboard::new(mode, config.auto_reboot_prompt).with_theme(config.theme),
            config,
            dispatcher,
            runner,
            shutdown_tx,
            shutdown_rx,
            timers: Vec::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn dashboard_mut(&mut self) -> &mut Dashboard {
        &mut self.dashboard
    }

    pub fn runner(&self) -> &TaskRunner<Dashboard> {
        &self.runner
    }

    /// Sender that stops the interactive loop, e.g. from a Ctrl-C handler.
    pub fn shutdown_signal(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Start the metrics sampler on the system counters.
    pub fn start_monitoring(&mut self) {
        let monitor = &self.config.monitor;
        let sampler = MetricsSampler::new(
            SysinfoSource::new(),
            monitor.history_capacity,
            monitor.primary_volume.clone(),
        );
        let handle = sampler.install(&mut self.dispatcher, monitor.interval());
        self.timers.push(handle);
    }

    /// Install the periodic background cleanup if the settings enable it.
    pub fn start_silent_cleanup(&mut self) {
        if !self.config.silent_cleanup_enabled {
            return;
        }
        let handle = install_silent_cleanup(
            &mut self.dispatcher,
            self.runner.clone(),
            ActionContext::new(self.config.clone()),
            self.config.silent_cleanup_interval(),
        );
        self.timers.push(handle);
    }

    pub fn submit(&self, action: &ToolboxAction, dry_run: bool) -> bool {
        let ctx = ActionContext::new(self.config.clone()).dry_run(dry_run);
        action.submit(&self.runner, &ctx)
    }

    /// Run the interactive loop until `done` holds for the dashboard or a
    /// shutdown is signalled.
    pub fn run_until<D>(&mut self, done: D) -> Result<RunExit>
    where
        D: Fn(&Dashboard) -> bool,
    {
        let runtime = build_runtime()?;
        let Self {
            dispatcher,
            dashboard,
            shutdown_rx,
            ..
        } = self;
        Ok(runtime.block_on(dispatcher.run_until(dashboard, shutdown_rx, done)))
    }

    /// Run until the submitted task has finished and its delayed follow-ups
    /// (progress reset, reboot prompt) have been applied.
    pub fn run_task_to_completion(&mut self, finished_before: u64) -> Result<RunExit> {
        let exit = self.run_until(|dashboard| dashboard.finished_count() > finished_before)?;
        if exit == RunExit::Shutdown {
            return Ok(exit);
        }

        let runtime = build_runtime()?;
        let Self {
            dispatcher,
            dashboard,
            shutdown_rx,
            ..
        } = self;
        Ok(runtime.block_on(dispatcher.run_until_idle(dashboard, shutdown_rx)))
    }

    /// Cancel every timer. An in-flight task is left to finish on its own.
    pub fn shutdown(&mut self) {
        for timer in self.timers.drain(..) {
            timer.cancel();
        }
        if let Some((id, label)) = self.runner.current() {
            log::info!("Task {} ({}) still running at shutdown", id, label);
        }
        self.dispatcher.shutdown();
    }
}

fn build_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("Failed to start the interactive loop")
}
