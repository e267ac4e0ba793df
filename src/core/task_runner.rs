//! Single-flight background task runner.
//!
//! Exactly one user-triggered operation runs at a time. Admission is a
//! compare-and-swap on a single in-flight flag, so rapid repeated submissions
//! can never start two tasks. The operation runs on its own worker thread and
//! every observable effect (progress, status lines, the reboot prompt) goes
//! through the [`UiSender`], never through shared UI state.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use super::dispatch::UiSender;
use crate::error::{RboostError, Result};

/// Progress value reported when a task starts.
pub const START_FRACTION: f32 = 0.1;

pub const SUCCESS_MESSAGE: &str = "Task completed successfully!";
pub const READY_MESSAGE: &str = "Ready.";

/// UI state that can display task progress.
pub trait TaskSurface: 'static {
    /// Move the progress indicator, optionally appending a status line.
    fn set_progress(&mut self, fraction: f32, message: Option<&str>);

    /// Append a line to the status log.
    fn log_status(&mut self, message: &str);

    /// Ask the user whether to reboot now.
    fn prompt_reboot(&mut self);

    /// Receives the finished task once, right before it is discarded.
    fn task_finished(&mut self, _task: &Task) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Running,
    Succeeded,
    Failed(String),
}

impl TaskState {
    pub fn is_finished(&self) -> bool {
        matches!(self, TaskState::Succeeded | TaskState::Failed(_))
    }
}

/// What the caller declares when submitting work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub label: String,
    /// Schedule a reboot prompt after a successful run.
    pub requires_reboot: bool,
}

impl TaskSpec {
    pub fn new<S: Into<String>>(label: S) -> Self {
        Self {
            label: label.into(),
            requires_reboot: false,
        }
    }

    pub fn with_reboot(mut self, requires_reboot: bool) -> Self {
        self.requires_reboot = requires_reboot;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    id: TaskId,
    label: String,
    requires_reboot: bool,
    state: TaskState,
}

impl Task {
    fn new(id: TaskId, spec: TaskSpec) -> Self {
        Self {
            id,
            label: spec.label,
            requires_reboot: spec.requires_reboot,
            state: TaskState::Pending,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn requires_reboot(&self) -> bool {
        self.requires_reboot
    }

    pub fn state(&self) -> &TaskState {
        &self.state
    }

    fn start(&mut self) -> Result<()> {
        match self.state {
            TaskState::Pending => {
                self.state = TaskState::Running;
                Ok(())
            }
            ref other => Err(RboostError::other(format!(
                "task {} cannot start from {:?}",
                self.id, other
            ))),
        }
    }

    fn finish(&mut self, outcome: std::result::Result<(), String>) -> Result<()> {
        if self.state != TaskState::Running {
            return Err(RboostError::other(format!(
                "task {} cannot finish from {:?}",
                self.id, self.state
            )));
        }
        self.state = match outcome {
            Ok(()) => TaskState::Succeeded,
            Err(reason) => TaskState::Failed(reason),
        };
        Ok(())
    }
}

/// Delays of the completion protocol.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Delay before the progress bar goes back to 0 and "Ready." is shown.
    pub reset_delay: Duration,
    /// Delay before the reboot prompt of a task that asked for one.
    pub reboot_prompt_delay: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            reset_delay: Duration::from_millis(2000),
            reboot_prompt_delay: Duration::from_millis(3000),
        }
    }
}

/// Handed to a running operation to report back to the UI.
pub struct Progress<S> {
    task: TaskId,
    ui: UiSender<S>,
    cancel: Arc<AtomicBool>,
}

impl<S: TaskSurface> Progress<S> {
    pub fn task_id(&self) -> TaskId {
        self.task
    }

    /// Forward a progress value and status line. Values are clamped to
    /// `[0, 1]`; an empty message only moves the bar.
    pub fn report<M: Into<String>>(&self, fraction: f32, message: M) {
        let fraction = clamp_fraction(fraction);
        let message = message.into();
        self.ui.post(move |surface: &mut S| {
            let message = (!message.is_empty()).then_some(message.as_str());
            surface.set_progress(fraction, message);
        });
    }

    /// Append a line to the status log without moving the bar.
    pub fn log<M: Into<String>>(&self, message: M) {
        let message = message.into();
        self.ui.post(move |surface: &mut S| surface.log_status(&message));
    }

    /// Forward an arbitrary UI update.
    pub fn post<F>(&self, update: F)
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        self.ui.post(update);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Shared flag that flips when the user cancels this task.
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Bail out of the operation if cancellation was requested.
    pub fn check_cancelled(&self) -> anyhow::Result<()> {
        if self.is_cancelled() {
            anyhow::bail!("cancelled by user");
        }
        Ok(())
    }
}

fn clamp_fraction(fraction: f32) -> f32 {
    if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, 1.0)
    }
}

/// Identity of the task currently in flight.
#[derive(Debug, Clone)]
pub struct ActiveTask {
    pub id: TaskId,
    pub label: String,
    cancel: Arc<AtomicBool>,
}

/// Clears the in-flight marker on every exit path of the worker.
struct InFlightGuard {
    flag: Arc<AtomicBool>,
    active: Arc<Mutex<Option<ActiveTask>>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        *self.active.lock() = None;
        self.flag.store(false, Ordering::Release);
    }
}

pub struct TaskRunner<S> {
    ui: UiSender<S>,
    in_flight: Arc<AtomicBool>,
    active: Arc<Mutex<Option<ActiveTask>>>,
    next_id: Arc<AtomicU64>,
    config: RunnerConfig,
}

impl<S> Clone for TaskRunner<S> {
    fn clone(&self) -> Self {
        Self {
            ui: self.ui.clone(),
            in_flight: Arc::clone(&self.in_flight),
            active: Arc::clone(&self.active),
            next_id: Arc::clone(&self.next_id),
            config: self.config.clone(),
        }
    }
}

impl<S: TaskSurface> TaskRunner<S> {
    pub fn new(ui: UiSender<S>) -> Self {
        Self::with_config(ui, RunnerConfig::default())
    }

    pub fn with_config(ui: UiSender<S>, config: RunnerConfig) -> Self {
        Self {
            ui,
            in_flight: Arc::new(AtomicBool::new(false)),
            active: Arc::new(Mutex::new(None)),
            next_id: Arc::new(AtomicU64::new(0)),
            config,
        }
    }

    /// Submit `operation`. Returns `false` without side effects when another
    /// task is running; otherwise starts it on a worker thread and returns
    /// `true` immediately.
    pub fn submit<F>(&self, spec: TaskSpec, operation: F) -> bool
    where
        F: FnOnce(&Progress<S>) -> anyhow::Result<()> + Send + 'static,
    {
        match self.try_submit(spec, operation) {
            Ok(_) => true,
            Err(e) => {
                log::info!("Submission rejected: {}", e);
                false
            }
        }
    }

    /// Like [`submit`](Self::submit), but reports why a submission was not
    /// accepted.
    pub fn try_submit<F>(&self, spec: TaskSpec, operation: F) -> Result<TaskId>
    where
        F: FnOnce(&Progress<S>) -> anyhow::Result<()> + Send + 'static,
    {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            let running = self
                .active
                .lock()
                .as_ref()
                .map(|task| task.label.clone())
                .unwrap_or_default();
            return Err(RboostError::task_in_flight(running));
        }

        let guard = InFlightGuard {
            flag: Arc::clone(&self.in_flight),
            active: Arc::clone(&self.active),
        };

        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let mut task = Task::new(id, spec);
        task.start()?;

        let cancel = Arc::new(AtomicBool::new(false));
        *self.active.lock() = Some(ActiveTask {
            id,
            label: task.label.clone(),
            cancel: Arc::clone(&cancel),
        });

        let progress = Progress {
            task: id,
            ui: self.ui.clone(),
            cancel,
        };
        let config = self.config.clone();

        // If the spawn fails the closure is dropped, and the guard with it.
        thread::Builder::new()
            .name(format!("rboost-task-{}", id.0))
            .spawn(move || {
                let _guard = guard;
                execute(task, progress, operation, &config);
            })?;

        Ok(id)
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Id and label of the running task, if any.
    pub fn current(&self) -> Option<(TaskId, String)> {
        self.active
            .lock()
            .as_ref()
            .map(|task| (task.id, task.label.clone()))
    }

    /// Request cooperative cancellation of the running task. Returns `false`
    /// when nothing is running.
    pub fn cancel(&self) -> bool {
        match self.active.lock().as_ref() {
            Some(task) => {
                log::info!("Cancellation requested for task {} ({})", task.id, task.label);
                task.cancel.store(true, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }
}

fn execute<S, F>(mut task: Task, progress: Progress<S>, operation: F, config: &RunnerConfig)
where
    S: TaskSurface,
    F: FnOnce(&Progress<S>) -> anyhow::Result<()>,
{
    log::info!("Starting task {} ({})", task.id, task.label);
    progress.report(START_FRACTION, task.label.clone());

    let progress_ref = &progress;
    let outcome = match panic::catch_unwind(AssertUnwindSafe(move || operation(progress_ref))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(format!("{:#}", e)),
        Err(payload) => Err(panic_message(payload.as_ref())),
    };

    match &outcome {
        Ok(()) => {
            log::info!("Task {} completed successfully", task.id);
            progress.report(1.0, SUCCESS_MESSAGE);
            // The prompt is chained off the reset so it can never overtake it.
            let prompt = task
                .requires_reboot
                .then(|| (progress.ui.clone(), config.reboot_prompt_delay.saturating_sub(config.reset_delay)));
            progress.ui.post_after(config.reset_delay, move |surface: &mut S| {
                surface.set_progress(0.0, None);
                surface.log_status(READY_MESSAGE);
                if let Some((ui, delay)) = prompt {
                    ui.post_after(delay, |surface: &mut S| surface.prompt_reboot());
                }
            });
        }
        Err(reason) => {
            log::error!("Error during task {} execution: {}", task.id, reason);
            progress.report(0.0, format!("Task failed: {}", reason));
            progress.log(format!("Error: {}", reason));
        }
    }

    if let Err(e) = task.finish(outcome) {
        log::error!("{}", e);
    }
    progress.ui.post(move |surface: &mut S| surface.task_finished(&task));
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("task panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("task panicked: {}", message)
    } else {
        "task panicked".to_string()
    }
}
