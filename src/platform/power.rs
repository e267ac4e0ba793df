use std::process::Command;

use crate::error::{RboostError, Result};

/// Program and arguments that restart the machine immediately.
pub fn reboot_command() -> (&'static str, &'static [&'static str]) {
    if cfg!(windows) {
        ("shutdown", &["/r", "/t", "0"])
    } else {
        ("shutdown", &["-r", "now"])
    }
}

/// Start the platform reboot command without waiting for it.
pub fn request_reboot() -> Result<()> {
    let (program, args) = reboot_command();
    log::info!("Requesting system reboot: {} {}", program, args.join(" "));
    Command::new(program)
        .args(args)
        .spawn()
        .map(|_| ())
        .map_err(|e| RboostError::operation_failed(format!("could not start {}: {}", program, e)))
}
