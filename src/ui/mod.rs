// UI and formatting module

pub mod dashboard;
pub mod formatters;
pub mod progress;
pub mod prompts;

pub use dashboard::{Dashboard, RenderMode, StatusLine};
pub use formatters::{format_clock, format_percent, format_rate, format_size};
pub use progress::{clear_line, render_bar, show_progress_bar};
pub use prompts::{dimmed, error, info, read_confirmation, success, warn};
