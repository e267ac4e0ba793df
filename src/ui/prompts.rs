// UI prompts and user interaction module

use colored::Colorize;
use std::io::{self, BufRead, Write};

fn is_yes(input: &str) -> bool {
    let response = input.trim().to_lowercase();
    response == "y" || response == "yes"
}

/// Ask a yes/no question, retrying on IO errors up to `max_attempts` times.
pub fn read_confirmation(prompt: &str, max_attempts: u32) -> anyhow::Result<bool> {
    let stdin = io::stdin();
    read_confirmation_from(&mut stdin.lock(), prompt, max_attempts)
}

/// Same as [`read_confirmation`] but reading answers from `input`.
pub fn read_confirmation_from<R: BufRead>(
    input: &mut R,
    prompt: &str,
    max_attempts: u32,
) -> anyhow::Result<bool> {
    let attempts = max_attempts.max(1);
    for attempt in 1..=attempts {
        print!("{}", prompt.white().bold());
        io::stdout().flush()?;

        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(_) => return Ok(is_yes(&line)),
            Err(e) if attempt < attempts => {
                println!(
                    "{}",
                    format!("Error reading input (attempt {}/{}): {}", attempt, attempts, e).yellow()
                );
                println!("{}", "Retrying...".dimmed());
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Failed to read confirmation after {} attempts: {}",
                    attempts,
                    e
                ));
            }
        }
    }
    Ok(false)
}

/// Display a warning message
pub fn warn(message: &str) {
    println!("{}", format!("Warning: {}", message).yellow().bold());
}

/// Display an info message
pub fn info(message: &str) {
    println!("{}", message.cyan());
}

/// Display a success message
pub fn success(message: &str) {
    println!("{}", message.green().bold());
}

/// Display an error message
pub fn error(message: &str) {
    eprintln!("{}", message.red().bold());
}

/// Display a dimmed/secondary message
pub fn dimmed(message: &str) {
    println!("{}", message.dimmed());
}
