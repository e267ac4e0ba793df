use anyhow::{Context, Result};

use crate::app::App;
use crate::core::Config;
use crate::ui::{self, RenderMode};

pub fn execute(matches: &clap::ArgMatches) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(interval) = matches.get_one::<u64>("interval") {
        config.monitor.interval_ms = *interval;
    }
    config.validate();

    let samples = matches.get_one::<u64>("samples").copied();
    let json = matches.get_flag("json");
    let mode = if json { RenderMode::Json } else { RenderMode::Text };

    if !json {
        ui::info(&format!(
            "Sampling every {} ms (window of {}). Press Ctrl-C to stop.",
            config.monitor.interval_ms, config.monitor.history_capacity
        ));
    }

    let mut app = App::new(config, mode);
    let shutdown = app.shutdown_signal();
    ctrlc::set_handler(move || {
        let _ = shutdown.send(());
    })
    .context("Failed to install Ctrl-C handler")?;

    app.start_monitoring();
    app.start_silent_cleanup();

    app.run_until(|dashboard| samples.is_some_and(|n| dashboard.metrics_updates() >= n))?;
    app.shutdown();

    if !json {
        ui::dimmed("Monitoring stopped.");
    }
    Ok(())
}
