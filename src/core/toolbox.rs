//! The actions a user can trigger, each run as a task.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context};
use humansize::{format_size, DECIMAL};
use sysinfo::{Pid, Process, ProcessRefreshKind, ProcessesToUpdate, Signal, System};

use super::cleaner::TempCleaner;
use super::config::Config;
use super::dispatch::{Dispatcher, TimerHandle};
use super::metrics::{partition_breakdown, MetricsSurface, SysinfoSource};
use super::shell;
use super::task_runner::{Progress, TaskRunner, TaskSpec, TaskSurface};
use crate::error::RboostError;
use crate::platform::{browser_cache_locations, can_trim_working_sets, is_elevated, trim_working_set};

/// Progress range used by operations that report per-item progress.
const WORK_START: f32 = 0.1;
const WORK_END: f32 = 0.9;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolboxAction {
    CleanTemp,
    AnalyzeDisks,
    KillBackground,
    ListProcesses,
    KillProcess(u32),
    ClearBrowserCache,
    FlushStandbyRam,
    SpeedTest,
    Console(String),
}

/// Settings an action runs with, captured when it is submitted.
#[derive(Debug, Clone, Default)]
pub struct ActionContext {
    pub config: Config,
    pub dry_run: bool,
}

impl ActionContext {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

impl ToolboxAction {
    /// Status line shown when the task starts.
    pub fn label(&self) -> String {
        match self {
            ToolboxAction::CleanTemp => "Cleaning temporary files...".to_string(),
            ToolboxAction::AnalyzeDisks => "Analyzing disk usage...".to_string(),
            ToolboxAction::KillBackground => "Killing background apps...".to_string(),
            ToolboxAction::ListProcesses => "Loading process list...".to_string(),
            ToolboxAction::KillProcess(pid) => format!("Killing process {}...", pid),
            ToolboxAction::ClearBrowserCache => "Clearing browser cache...".to_string(),
            ToolboxAction::FlushStandbyRam => "Flushing standby RAM...".to_string(),
            ToolboxAction::SpeedTest => "Running speed test...".to_string(),
            ToolboxAction::Console(command) => format!("Executing command: {}", command),
        }
    }

    /// Whether a successful run should be followed by a reboot prompt.
    pub fn requires_reboot(&self) -> bool {
        matches!(self, ToolboxAction::CleanTemp)
    }

    pub fn spec(&self) -> TaskSpec {
        TaskSpec::new(self.label()).with_reboot(self.requires_reboot())
    }

    /// Submit this action through `runner`. Returns `false` when another
    /// task is already running.
    pub fn submit<S>(&self, runner: &TaskRunner<S>, ctx: &ActionContext) -> bool
    where
        S: TaskSurface + MetricsSurface,
    {
        let action = self.clone();
        let ctx = ctx.clone();
        runner.submit(self.spec(), move |progress| action.run(&ctx, progress))
    }

    /// Body of the task. Runs on the worker thread.
    pub fn run<S>(&self, ctx: &ActionContext, progress: &Progress<S>) -> anyhow::Result<()>
    where
        S: TaskSurface + MetricsSurface,
    {
        match self {
            ToolboxAction::CleanTemp => clean_temp(ctx, progress),
            ToolboxAction::AnalyzeDisks => analyze_disks(progress),
            ToolboxAction::KillBackground => kill_background(ctx, progress),
            ToolboxAction::ListProcesses => list_processes(progress),
            ToolboxAction::KillProcess(pid) => kill_process(*pid, ctx, progress),
            ToolboxAction::ClearBrowserCache => clear_browser_cache(ctx, progress),
            ToolboxAction::FlushStandbyRam => flush_standby_ram(ctx, progress),
            ToolboxAction::SpeedTest => speed_test(progress),
            ToolboxAction::Console(command) => console(command, progress),
        }
    }
}

impl fmt::Display for ToolboxAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolboxAction::CleanTemp => f.write_str("clean-temp"),
            ToolboxAction::AnalyzeDisks => f.write_str("analyze-disks"),
            ToolboxAction::KillBackground => f.write_str("kill-background"),
            ToolboxAction::ListProcesses => f.write_str("list-processes"),
            ToolboxAction::KillProcess(pid) => write!(f, "kill-process {}", pid),
            ToolboxAction::ClearBrowserCache => f.write_str("clear-browser-cache"),
            ToolboxAction::FlushStandbyRam => f.write_str("flush-ram"),
            ToolboxAction::SpeedTest => f.write_str("speed-test"),
            ToolboxAction::Console(command) => write!(f, "console `{}`", command),
        }
    }
}

impl FromStr for ToolboxAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "clean-temp" => Ok(ToolboxAction::CleanTemp),
            "analyze-disks" => Ok(ToolboxAction::AnalyzeDisks),
            "kill-background" => Ok(ToolboxAction::KillBackground),
            "list-processes" => Ok(ToolboxAction::ListProcesses),
            "clear-browser-cache" => Ok(ToolboxAction::ClearBrowserCache),
            "flush-ram" => Ok(ToolboxAction::FlushStandbyRam),
            "speed-test" => Ok(ToolboxAction::SpeedTest),
            other => bail!("Unknown action '{}'", other),
        }
    }
}

fn work_fraction(done: usize, total: usize) -> f32 {
    if total == 0 {
        return WORK_START;
    }
    WORK_START + (WORK_END - WORK_START) * (done as f32 / total as f32)
}

fn clean_temp<S: TaskSurface>(ctx: &ActionContext, progress: &Progress<S>) -> anyhow::Result<()> {
    let mut cleaner = TempCleaner::new()
        .with_min_age(ctx.config.clean.min_age())
        .with_cancel_flag(progress.cancel_token());
    cleaner.add_directories(&ctx.config.clean.custom_paths);

    if let Err(e) = shell::require_elevation("Cleaning system temp folders") {
        progress.log(format!("{}. Protected files will be skipped.", e));
    }
    for dir in &cleaner.directories {
        progress.log(format!("Cleaning {}", dir.display()));
    }

    // One UI update per percent, not per file.
    let mut last_percent = None;
    let stats = cleaner.clean(ctx.dry_run, |processed, total| {
        let percent = processed * 100 / total.max(1);
        if last_percent != Some(percent) {
            last_percent = Some(percent);
            progress.report(
                work_fraction(processed, total),
                format!("Deleting files... {}/{}", processed, total),
            );
        }
    })?;

    progress.check_cancelled()?;
    progress.log(format!(
        "{} {} files. Total size: {}.{}",
        if ctx.dry_run { "Would clean" } else { "Cleaned" },
        stats.deleted_files,
        format_size(stats.deleted_size, DECIMAL),
        if stats.failed_files > 0 {
            format!(" {} files were in use and skipped.", stats.failed_files)
        } else {
            String::new()
        }
    ));
    Ok(())
}

fn analyze_disks<S>(progress: &Progress<S>) -> anyhow::Result<()>
where
    S: TaskSurface + MetricsSurface,
{
    progress.report(0.5, "Scanning drives...");
    let mut source = SysinfoSource::new();
    let partitions = partition_breakdown(&mut source).context("Failed to analyze disk usage")?;

    for partition in &partitions {
        progress.log(format!(
            "Drive {}: {:.1}% used.",
            partition.mount_label, partition.percent_used
        ));
    }
    progress.post(move |surface: &mut S| surface.show_partitions(&partitions));
    progress.log("Disk analysis complete.");
    Ok(())
}

/// Whether process `name` is one of `targets`. On non-Windows hosts the
/// `.exe` suffix of a target is optional.
pub fn matches_process(name: &str, targets: &[String]) -> bool {
    let name = name.to_lowercase();
    targets.iter().any(|target| {
        let target = target.to_lowercase();
        name == target || (!cfg!(windows) && target.strip_suffix(".exe") == Some(name.as_str()))
    })
}

fn kill_background<S: TaskSurface>(ctx: &ActionContext, progress: &Progress<S>) -> anyhow::Result<()> {
    let targets = &ctx.config.background_processes;
    if targets.is_empty() {
        progress.log("No background processes configured.");
        return Ok(());
    }

    let mut system = System::new();
    system.refresh_processes_specifics(ProcessesToUpdate::All, true, ProcessRefreshKind::nothing());

    let matching: Vec<_> = system
        .processes()
        .values()
        .filter(|process| matches_process(&process.name().to_string_lossy(), targets))
        .collect();

    let total = matching.len();
    let mut killed = 0;
    for (i, process) in matching.into_iter().enumerate() {
        progress.check_cancelled()?;
        let name = process.name().to_string_lossy().to_string();
        if ctx.dry_run {
            progress.log(format!("Would kill process: {} ({})", name, process.pid()));
            killed += 1;
        } else if terminate(process) {
            progress.log(format!("Killed process: {}", name));
            killed += 1;
        } else {
            log::warn!("Could not terminate {} ({})", name, process.pid());
        }
        progress.report(work_fraction(i + 1, total), "");
    }

    progress.log(format!("Killed {} known background processes.", killed));
    Ok(())
}

/// Ask `process` to exit, falling back to a hard kill where polite
/// termination is not supported.
fn terminate(process: &Process) -> bool {
    process
        .kill_with(Signal::Term)
        .unwrap_or_else(|| process.kill())
}

/// Display form used by the process list: `name (PID: n)`.
pub fn describe_process(process: &Process) -> String {
    format!("{} (PID: {})", process.name().to_string_lossy(), process.pid())
}

fn list_processes<S: TaskSurface>(progress: &Progress<S>) -> anyhow::Result<()> {
    let mut system = System::new();
    system.refresh_processes_specifics(ProcessesToUpdate::All, true, ProcessRefreshKind::nothing());

    let mut processes: Vec<_> = system.processes().values().collect();
    processes.sort_by_key(|process| process.pid());
    for process in processes {
        progress.log(describe_process(process));
    }
    progress.log("Process list refreshed.");
    Ok(())
}

/// Terminate the process with id `pid`. Returns its display name.
pub fn terminate_pid(pid: u32) -> crate::error::Result<String> {
    let pid = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes_specifics(ProcessesToUpdate::Some(&[pid]), true, ProcessRefreshKind::nothing());

    let process = system
        .process(pid)
        .ok_or_else(|| RboostError::operation_failed(format!("no process with PID {}", pid)))?;
    let name = describe_process(process);
    if terminate(process) {
        log::info!("Terminated {}", name);
        Ok(name)
    } else {
        Err(RboostError::permission_denied(format!("could not terminate {}", name)))
    }
}

fn kill_process<S: TaskSurface>(pid: u32, ctx: &ActionContext, progress: &Progress<S>) -> anyhow::Result<()> {
    // Other users' processes can only be ended from an elevated session on Windows.
    if cfg!(windows) {
        shell::require_elevation("Killing a process")?;
    }
    if ctx.dry_run {
        progress.log(format!("Would kill process with PID {}", pid));
        return Ok(());
    }

    let name = terminate_pid(pid)?;
    progress.log(format!("Killed: {}", name));
    Ok(())
}

fn clear_browser_cache<S: TaskSurface>(ctx: &ActionContext, progress: &Progress<S>) -> anyhow::Result<()> {
    let caches = browser_cache_locations();
    let total = caches.len();
    let mut freed = 0;

    for (i, cache) in caches.iter().enumerate() {
        progress.check_cancelled()?;
        progress.report(work_fraction(i, total), format!("Clearing {} cache...", cache.browser));
        if !cache.path.exists() {
            progress.log(format!("{} cache path not found.", cache.browser));
            continue;
        }

        let cleaner = TempCleaner::with_directories(cache.targets()).with_cancel_flag(progress.cancel_token());
        match cleaner.clean(ctx.dry_run, |_, _| {}) {
            Ok(stats) => {
                freed += stats.deleted_size;
                progress.log(format!("{} cache cleared.", cache.browser));
            }
            Err(e) => progress.log(format!("Failed to clear {} cache: {:#}", cache.browser, e)),
        }
    }

    progress.check_cancelled()?;
    progress.log(format!(
        "{} {} of browser cache.",
        if ctx.dry_run { "Would free" } else { "Freed" },
        format_size(freed, DECIMAL)
    ));
    Ok(())
}

fn flush_standby_ram<S: TaskSurface>(ctx: &ActionContext, progress: &Progress<S>) -> anyhow::Result<()> {
    if !can_trim_working_sets() {
        return Err(RboostError::operation_failed("flushing standby RAM is only supported on Windows").into());
    }

    progress.log("Starting RAM flush...");
    let mut system = System::new();
    system.refresh_processes_specifics(ProcessesToUpdate::All, true, ProcessRefreshKind::nothing());
    let mut processes: Vec<_> = system.processes().values().collect();
    processes.sort_by_key(|process| process.pid());

    let total = processes.len();
    let (mut flushed, mut failed) = (0, 0);
    for (i, process) in processes.into_iter().enumerate() {
        progress.check_cancelled()?;
        if ctx.dry_run || trim_working_set(process.pid().as_u32()) {
            flushed += 1;
        } else {
            failed += 1;
            log::debug!("Could not trim {}", describe_process(process));
        }
        progress.report(work_fraction(i + 1, total), "");
    }

    progress.log(format!("Flushed: {} processes. Failed: {}", flushed, failed));
    if !is_elevated() {
        progress.log("Tip: Run rboost as Administrator for better results.");
    }
    Ok(())
}

fn speed_test<S: TaskSurface>(progress: &Progress<S>) -> anyhow::Result<()> {
    let program = which::which("speedtest").map_err(|_| {
        progress.log("Error: 'speedtest' command not found. Please install speedtest-cli.");
        RboostError::tool_not_found("speedtest")
    })?;

    progress.log("Running speed test (this may take a moment)...");
    progress.report(0.3, "Executing speedtest-cli...");

    let program = program.to_string_lossy().to_string();
    let mut fraction = 0.3_f32;
    shell::run_program_streaming(&program, &[], |line| {
        progress.log(line);
        fraction = (fraction + 0.05).min(WORK_END);
        progress.report(fraction, "");
    })?;

    progress.log("Speed test complete.");
    Ok(())
}

fn console<S: TaskSurface>(command: &str, progress: &Progress<S>) -> anyhow::Result<()> {
    let command = command.trim();
    if command.is_empty() {
        bail!("No command given");
    }

    progress.log(format!("> {}", command));
    shell::run_streaming(command, |line| progress.log(line))?;
    progress.log("Command executed.");
    Ok(())
}

/// Periodically submit a temp cleanup in the background. A tick that finds
/// the runner busy is skipped.
pub fn install_silent_cleanup<S>(
    dispatcher: &mut Dispatcher<S>,
    runner: TaskRunner<S>,
    ctx: ActionContext,
    interval: Duration,
) -> TimerHandle
where
    S: TaskSurface + MetricsSurface,
{
    log::info!("Silent cleanup enabled, every {} s", interval.as_secs());
    dispatcher.every(interval, move |_surface: &mut S, _now| {
        if runner.is_busy() {
            log::info!("Silent cleanup skipped: a task is already running");
            return;
        }
        if ToolboxAction::CleanTemp.submit(&runner, &ctx) {
            log::info!("Silent cleanup started");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_cleanup_asks_for_reboot() {
        assert!(ToolboxAction::CleanTemp.requires_reboot());
        assert!(!ToolboxAction::AnalyzeDisks.requires_reboot());
        assert!(!ToolboxAction::KillBackground.requires_reboot());
        assert!(!ToolboxAction::SpeedTest.requires_reboot());
        assert!(!ToolboxAction::Console("dir".to_string()).requires_reboot());
    }

    #[test]
    fn test_parse_names() {
        for name in [
            "clean-temp",
            "analyze-disks",
            "kill-background",
            "list-processes",
            "clear-browser-cache",
            "flush-ram",
            "speed-test",
        ] {
            let action: ToolboxAction = name.parse().unwrap();
            assert_eq!(action.to_string(), name);
        }
        assert!("defrag".parse::<ToolboxAction>().is_err());
    }

    #[test]
    fn test_kill_process_label_names_pid() {
        let action = ToolboxAction::KillProcess(4242);
        assert_eq!(action.label(), "Killing process 4242...");
        assert_eq!(action.to_string(), "kill-process 4242");
        assert!(!action.requires_reboot());
    }

    #[cfg(unix)]
    #[test]
    fn test_terminate_pid_ends_child() {
        use std::process::Command;

        let mut child = Command::new("sleep").arg("30").spawn().unwrap();
        let name = terminate_pid(child.id()).unwrap();
        assert!(name.ends_with(&format!("(PID: {})", child.id())));

        let status = child.wait().unwrap();
        assert!(!status.success());
    }

    #[test]
    fn test_terminate_unknown_pid_fails() {
        let err = terminate_pid(u32::MAX - 1).unwrap_err();
        assert!(matches!(err, RboostError::OperationFailed(_)));
    }

    #[test]
    fn test_process_matching() {
        let targets = vec!["Steam.exe".to_string(), "discord.exe".to_string()];
        assert!(matches_process("steam.exe", &targets));
        assert!(matches_process("DISCORD.EXE", &targets));
        assert!(!matches_process("steamwebhelper.exe", &targets));
        if !cfg!(windows) {
            assert!(matches_process("discord", &targets));
        }
    }

    #[test]
    fn test_work_fraction_range() {
        assert_eq!(work_fraction(0, 0), WORK_START);
        assert_eq!(work_fraction(10, 10), WORK_END);
        assert!(work_fraction(5, 10) > WORK_START);
    }
}
