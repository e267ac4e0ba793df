// RBoost Library - Public API

pub mod error;
pub use error::{RboostError, Result};

pub mod app;
pub mod commands;
pub mod core;
pub mod platform;
pub mod ui;

pub use core::config::Config;

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Writes every record to stderr and to the log file.
struct Tee {
    file: File,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        self.file.flush()
    }
}

/// Default location of the log file: `rboost/rboost.log` in the local data
/// directory.
pub fn default_log_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("rboost").join("rboost.log"))
}

/// Initialize logging. The level defaults to Info and can be overridden with
/// `RUST_LOG`. With `log_file`, records are also written to that file, which
/// is truncated first.
pub fn init_logging(log_file: Option<&Path>) -> anyhow::Result<()> {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(log::LevelFilter::Info)
        .parse_default_env();

    if let Some(path) = log_file {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(Tee { file })));
    }

    builder.try_init()?;
    Ok(())
}
