// Integration tests for the single-flight task runner against the dashboard

use rboost::core::dispatch::Dispatcher;
use rboost::core::task_runner::{RunnerConfig, TaskRunner, TaskSpec, TaskState};
use rboost::ui::{Dashboard, RenderMode};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

fn runner(dispatcher: &Dispatcher<Dashboard>) -> TaskRunner<Dashboard> {
    TaskRunner::with_config(
        dispatcher.sender(),
        RunnerConfig {
            reset_delay: Duration::from_millis(200),
            reboot_prompt_delay: Duration::from_millis(300),
        },
    )
}

fn wait_idle(runner: &TaskRunner<Dashboard>) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while runner.is_busy() {
        assert!(Instant::now() < deadline, "task did not finish in time");
        thread::sleep(Duration::from_millis(2));
    }
}

fn messages(dashboard: &Dashboard) -> Vec<String> {
    dashboard.status_log().map(|line| line.message.clone()).collect()
}

#[test]
fn test_second_submission_rejected_while_running() {
    let mut dispatcher = Dispatcher::new();
    let runner = runner(&dispatcher);
    let (release_tx, release_rx) = mpsc::channel::<()>();

    assert!(runner.submit(TaskSpec::new("Cleaning temporary files..."), move |_| {
        release_rx.recv()?;
        Ok(())
    }));
    assert!(!runner.submit(TaskSpec::new("Killing background apps..."), |_| Ok(())));

    release_tx.send(()).unwrap();
    wait_idle(&runner);

    let mut dashboard = Dashboard::new(RenderMode::Quiet, true);
    dispatcher.pump_at(&mut dashboard, Instant::now() + Duration::from_secs(1));

    assert_eq!(dashboard.finished_count(), 1);
    assert!(!messages(&dashboard).contains(&"Killing background apps...".to_string()));
}

#[test]
fn test_completion_then_reset_then_reboot_prompt() {
    let mut dispatcher = Dispatcher::new();
    let runner = runner(&dispatcher);

    assert!(runner.submit(
        TaskSpec::new("Cleaning temporary files...").with_reboot(true),
        |progress| {
            progress.report(0.5, "Deleting files... 1/2");
            Ok(())
        }
    ));
    wait_idle(&runner);

    let mut dashboard = Dashboard::new(RenderMode::Quiet, true);
    dispatcher.pump(&mut dashboard);
    assert_eq!(dashboard.progress(), 1.0);
    assert!(!dashboard.reboot_requested());

    dispatcher.pump_at(&mut dashboard, Instant::now() + Duration::from_secs(1));
    assert_eq!(dashboard.progress(), 0.0);
    assert!(dashboard.reboot_requested());
    assert_eq!(
        messages(&dashboard),
        vec![
            "Cleaning temporary files...",
            "Deleting files... 1/2",
            "Task completed successfully!",
            "Ready.",
            "Some changes require a system reboot to take effect.",
        ]
    );
}

#[test]
fn test_failing_task_reports_and_frees_runner() {
    let mut dispatcher = Dispatcher::new();
    let runner = runner(&dispatcher);

    assert!(runner.submit(
        TaskSpec::new("Cleaning temporary files...").with_reboot(true),
        |_| anyhow::bail!("access denied")
    ));
    wait_idle(&runner);
    assert!(runner.current().is_none());

    let mut dashboard = Dashboard::new(RenderMode::Quiet, true);
    dispatcher.pump_at(&mut dashboard, Instant::now() + Duration::from_secs(1));

    let log = messages(&dashboard);
    assert!(log.contains(&"Task failed: access denied".to_string()));
    assert!(log.contains(&"Error: access denied".to_string()));
    assert_eq!(dashboard.progress(), 0.0);
    assert!(!dashboard.reboot_requested());
    assert_eq!(
        dashboard.last_finished().unwrap().state,
        TaskState::Failed("access denied".to_string())
    );

    assert!(runner.submit(TaskSpec::new("Analyzing disk usage..."), |_| Ok(())));
    wait_idle(&runner);
}

#[test]
fn test_reboot_prompt_suppressed_by_setting() {
    let mut dispatcher = Dispatcher::new();
    let runner = runner(&dispatcher);

    assert!(runner.submit(TaskSpec::new("clean").with_reboot(true), |_| Ok(())));
    wait_idle(&runner);

    let mut dashboard = Dashboard::new(RenderMode::Quiet, false);
    dispatcher.pump_at(&mut dashboard, Instant::now() + Duration::from_secs(1));
    assert!(!dashboard.reboot_requested());
    assert_eq!(dashboard.last_status(), Some("Ready."));
}

#[test]
fn test_reboot_prompt_never_overtakes_reset() {
    let mut dispatcher = Dispatcher::new();
    let runner = TaskRunner::with_config(
        dispatcher.sender(),
        RunnerConfig {
            reset_delay: Duration::from_millis(200),
            reboot_prompt_delay: Duration::ZERO,
        },
    );

    assert!(runner.submit(TaskSpec::new("clean").with_reboot(true), |_| Ok(())));
    wait_idle(&runner);

    let mut dashboard = Dashboard::new(RenderMode::Quiet, true);
    dispatcher.pump(&mut dashboard);
    assert!(!dashboard.reboot_requested());

    dispatcher.pump_at(&mut dashboard, Instant::now() + Duration::from_secs(1));
    assert!(dashboard.reboot_requested());
    assert_eq!(
        messages(&dashboard),
        vec![
            "clean",
            "Task completed successfully!",
            "Ready.",
            "Some changes require a system reboot to take effect.",
        ]
    );
}
