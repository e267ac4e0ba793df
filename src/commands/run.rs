use anyhow::{bail, Context, Result};
use colored::Colorize;

use crate::app::App;
use crate::core::dispatch::RunExit;
use crate::core::task_runner::TaskState;
use crate::core::{Config, TempCleaner, ToolboxAction};
use crate::platform::{is_elevated, request_reboot};
use crate::ui::{self, read_confirmation, RenderMode};

/// `rboost run <ACTION>`
pub fn execute(matches: &clap::ArgMatches) -> Result<()> {
    let name = matches
        .get_one::<String>("action")
        .context("Action argument is required")?;
    let action: ToolboxAction = name.parse()?;
    let dry_run = matches.get_flag("dry-run");
    let assume_yes = matches.get_flag("yes");

    let config = Config::load()?;
    if action == ToolboxAction::CleanTemp && !dry_run && !assume_yes && !confirm_cleanup(&config)? {
        ui::warn("Operation cancelled by user.");
        return Ok(());
    }

    run_action(config, action, dry_run)
}

/// `rboost console <COMMAND>...`
pub fn execute_console(matches: &clap::ArgMatches) -> Result<()> {
    let command = matches
        .get_many::<String>("command")
        .context("Command argument is required")?
        .cloned()
        .collect::<Vec<_>>()
        .join(" ");

    run_action(Config::load()?, ToolboxAction::Console(command), false)
}

/// `rboost kill <PID>`
pub fn execute_kill(matches: &clap::ArgMatches) -> Result<()> {
    let pid = *matches.get_one::<u32>("pid").context("PID argument is required")?;
    let dry_run = matches.get_flag("dry-run");
    if !dry_run
        && !matches.get_flag("yes")
        && !read_confirmation(&format!("Kill process {}? (y/n): ", pid), 3)?
    {
        ui::warn("Operation cancelled by user.");
        return Ok(());
    }

    run_action(Config::load()?, ToolboxAction::KillProcess(pid), dry_run)
}

fn confirm_cleanup(config: &Config) -> Result<bool> {
    let mut cleaner = TempCleaner::new();
    cleaner.add_directories(&config.clean.custom_paths);

    println!("{}", "Directories to clean:".white().bold());
    for (idx, dir) in cleaner.directories.iter().enumerate() {
        println!("  {}. {}", idx + 1, dir.display().to_string().cyan());
    }
    println!();
    println!(
        "{}",
        "Warning: This will delete the files in the directories listed above."
            .yellow()
            .bold()
    );
    if !is_elevated() {
        ui::info("Note: Administrator privileges are required for system directories.");
    }

    read_confirmation("Do you want to continue? (y/n): ", 3)
}

fn run_action(config: Config, action: ToolboxAction, dry_run: bool) -> Result<()> {
    if dry_run {
        ui::warn("DRY RUN MODE - nothing will be changed");
    }

    let mut app = App::new(config, RenderMode::Text);
    let shutdown = app.shutdown_signal();
    let runner = app.runner().clone();
    ctrlc::set_handler(move || {
        if !runner.cancel() {
            let _ = shutdown.send(());
        }
    })
    .context("Failed to install Ctrl-C handler")?;

    let finished_before = app.dashboard().finished_count();
    if !app.submit(&action, dry_run) {
        bail!("A task is already running");
    }

    let exit = app.run_task_to_completion(finished_before)?;
    let outcome = app.dashboard().last_finished().map(|task| task.state.clone());

    if exit == RunExit::Done && app.dashboard_mut().take_reboot_request() {
        if read_confirmation("Reboot now? (y/n): ", 3)? {
            request_reboot()?;
        } else {
            ui::dimmed("Reboot postponed.");
        }
    }
    app.shutdown();

    match outcome {
        Some(TaskState::Failed(reason)) => bail!("{} failed: {}", action, reason),
        Some(_) => Ok(()),
        None => bail!("{} was interrupted", action),
    }
}
