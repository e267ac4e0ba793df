use anyhow::Result;
use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;

use rboost::commands;
use rboost::ui;

fn build_cli() -> Command {
    Command::new("rboost")
        .version(env!("CARGO_PKG_VERSION"))
        .about("PC optimization toolbox with live system metrics")
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .value_name("PATH")
                .help("Also write the log to PATH (truncated on start)")
                .num_args(0..=1)
                .value_parser(value_parser!(PathBuf))
                .global(true),
        )
        .subcommand(
            Command::new("monitor")
                .about("Show live CPU, memory, network and disk usage")
                .arg(
                    Arg::new("interval")
                        .short('i')
                        .long("interval")
                        .value_name("MS")
                        .help("Sampling period in milliseconds")
                        .value_parser(value_parser!(u64)),
                )
                .arg(
                    Arg::new("samples")
                        .short('n')
                        .long("samples")
                        .value_name("N")
                        .help("Stop after N samples")
                        .value_parser(value_parser!(u64)),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print one JSON object per sample")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("run")
                .about("Run a toolbox action")
                .arg(
                    Arg::new("action")
                        .help("Action to run")
                        .required(true)
                        .value_parser([
                            "clean-temp",
                            "analyze-disks",
                            "kill-background",
                            "list-processes",
                            "clear-browser-cache",
                            "flush-ram",
                            "speed-test",
                        ])
                        .index(1),
                )
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .help("Show what would be done without changing anything")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("yes")
                        .short('y')
                        .long("yes")
                        .help("Do not ask for confirmation")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("kill")
                .about("Terminate a process by PID")
                .arg(
                    Arg::new("pid")
                        .help("Process id, as shown by 'rboost run list-processes'")
                        .required(true)
                        .value_parser(value_parser!(u32))
                        .index(1),
                )
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .help("Show what would be done without changing anything")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("yes")
                        .short('y')
                        .long("yes")
                        .help("Do not ask for confirmation")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("console")
                .about("Run a shell command and stream its output")
                .arg(
                    Arg::new("command")
                        .help("Command line to execute")
                        .required(true)
                        .num_args(1..)
                        .trailing_var_arg(true)
                        .allow_hyphen_values(true),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Manage settings")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(Command::new("show").about("Print the current settings"))
                .subcommand(Command::new("path").about("Print the settings file location"))
                .subcommand(Command::new("reset").about("Restore default settings"))
                .subcommand(
                    Command::new("import")
                        .about("Load settings from a file")
                        .arg(Arg::new("file").required(true).index(1)),
                )
                .subcommand(
                    Command::new("export")
                        .about("Write settings to a file")
                        .arg(Arg::new("file").required(true).index(1)),
                )
                .subcommand(
                    Command::new("set")
                        .about("Change a single setting, e.g. monitor.interval_ms 500")
                        .arg(Arg::new("key").required(true).index(1))
                        .arg(Arg::new("value").required(true).index(2)),
                ),
        )
}

fn main() {
    if let Err(e) = run() {
        ui::error(&format!("Error: {:#}", e));
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let matches = build_cli().get_matches();

    let log_file = if matches.contains_id("log-file") {
        matches
            .get_one::<PathBuf>("log-file")
            .cloned()
            .or_else(rboost::default_log_path)
    } else {
        None
    };
    rboost::init_logging(log_file.as_deref())?;

    match matches.subcommand() {
        Some(("monitor", sub_matches)) => commands::monitor(sub_matches),
        Some(("run", sub_matches)) => commands::run::execute(sub_matches),
        Some(("kill", sub_matches)) => commands::run::execute_kill(sub_matches),
        Some(("console", sub_matches)) => commands::run::execute_console(sub_matches),
        Some(("config", sub_matches)) => commands::config::execute(sub_matches),
        _ => {
            println!("Welcome to rboost!");
            println!("Use 'rboost --help' for more information.");
            Ok(())
        }
    }
}
