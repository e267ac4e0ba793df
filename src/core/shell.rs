//! Shell command execution with streamed output.

use std::io::{BufRead, BufReader, Read};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;

use crate::error::{RboostError, Result};

pub use crate::platform::ensure_elevated as require_elevation;

/// Build the platform shell invocation for `command`.
pub fn shell_command(command: &str) -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    }
}

/// Run `command` through the shell, calling `on_line` for every line it
/// prints on stdout or stderr. Fails with `CommandFailed` on a non-zero exit.
pub fn run_streaming<F>(command: &str, on_line: F) -> Result<ExitStatus>
where
    F: FnMut(&str),
{
    log::info!("Executing command: {}", command);
    let mut cmd = shell_command(command);
    stream_child(command, &mut cmd, on_line)
}

/// Run a program directly (no shell) and stream its output the same way.
pub fn run_program_streaming<F>(program: &str, args: &[&str], on_line: F) -> Result<ExitStatus>
where
    F: FnMut(&str),
{
    log::info!("Executing: {} {}", program, args.join(" "));
    let mut cmd = Command::new(program);
    cmd.args(args);
    let display = if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    };
    stream_child(&display, &mut cmd, on_line)
}

fn stream_child<F>(display: &str, cmd: &mut Command, mut on_line: F) -> Result<ExitStatus>
where
    F: FnMut(&str),
{
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let (tx, rx) = mpsc::channel::<String>();
    let mut readers = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        readers.push(forward_lines(stdout, tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(forward_lines(stderr, tx.clone()));
    }
    drop(tx);

    for line in rx {
        on_line(&line);
    }
    for reader in readers {
        let _ = reader.join();
    }

    let status = child.wait()?;
    if status.success() {
        Ok(status)
    } else {
        let code = status
            .code()
            .map(|c| format!("exit code {}", c))
            .unwrap_or_else(|| "a signal".to_string());
        log::error!("Command `{}` failed with {}", display, code);
        Err(RboostError::command_failed(display, code))
    }
}

fn forward_lines<R>(stream: R, tx: mpsc::Sender<String>) -> thread::JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    // Console output is not always UTF-8 (OEM code pages on Windows).
                    let line = String::from_utf8_lossy(&buf);
                    if tx.send(line.trim_end_matches(['\r', '\n']).to_string()).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    log::debug!("Stopped reading command output: {}", e);
                    break;
                }
            }
        }
    })
}
