// Progress bar rendering

use colored::Colorize;
use std::io::{self, Write};

const BAR_LENGTH: usize = 30;

/// `[=====     ]  50%` for a fraction in `[0, 1]`.
pub fn render_bar(fraction: f32) -> String {
    let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
    let filled = (fraction * BAR_LENGTH as f32).round() as usize;
    let empty = BAR_LENGTH.saturating_sub(filled);
    format!(
        "[{}{}] {:>3}%",
        "=".repeat(filled),
        " ".repeat(empty),
        (fraction * 100.0).round() as u32
    )
}

/// Redraw the progress line in place.
pub fn show_progress_bar(fraction: f32, message: &str) {
    clear_line();
    let bar = render_bar(fraction);
    print!("\r{} {}", bar.green(), message.white());
    io::stdout().flush().ok();
}

/// Clear the current line (useful for progress bars)
pub fn clear_line() {
    print!("\r{}\r", " ".repeat(80));
    io::stdout().flush().ok();
}
