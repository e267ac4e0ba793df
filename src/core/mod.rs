// Core business logic module

pub mod cleaner;
pub mod config;
pub mod dispatch;
pub mod metrics;
pub mod shell;
pub mod task_runner;
pub mod toolbox;

// Re-export commonly used items
pub use cleaner::{CleanupStats, TempCleaner};
pub use config::Config;
pub use dispatch::{Dispatcher, TimerHandle, UiSender};
pub use task_runner::{Progress, TaskRunner, TaskSpec, TaskSurface};
pub use toolbox::ToolboxAction;
