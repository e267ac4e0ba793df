use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

use crate::core::Config;
use crate::ui;

pub fn execute(matches: &clap::ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("show", _)) => show(),
        Some(("path", _)) => {
            println!("{}", Config::get_config_path()?.display());
            Ok(())
        }
        Some(("reset", _)) => {
            let mut config = Config::load()?;
            config.reset();
            config.save()?;
            ui::success("Settings reset to defaults.");
            Ok(())
        }
        Some(("import", sub_matches)) => {
            let file = file_arg(sub_matches)?;
            let mut config = Config::load()?;
            config.import(file)?;
            config.save()?;
            ui::success(&format!("Settings imported from {}", file.display()));
            Ok(())
        }
        Some(("export", sub_matches)) => {
            let file = file_arg(sub_matches)?;
            Config::load()?.export(file)?;
            ui::success(&format!("Settings exported to {}", file.display()));
            Ok(())
        }
        Some(("set", sub_matches)) => {
            let key = sub_matches
                .get_one::<String>("key")
                .context("Key argument is required")?;
            let value = sub_matches
                .get_one::<String>("value")
                .context("Value argument is required")?;

            let mut config = Config::load()?;
            config.set(key, value)?;
            config.save()?;
            println!("{} = {}", key.cyan(), value);
            Ok(())
        }
        _ => {
            println!("Use 'rboost config --help' for more information.");
            Ok(())
        }
    }
}

fn show() -> Result<()> {
    let config = Config::load()?;
    let json = serde_json::to_string_pretty(&config).context("Failed to serialize config")?;
    println!("{}", json);
    Ok(())
}

fn file_arg(matches: &clap::ArgMatches) -> Result<&Path> {
    matches
        .get_one::<String>("file")
        .map(Path::new)
        .context("File argument is required")
}
