// Platform-specific code module

pub mod browser_cache;
pub mod elevation;
pub mod memory;
pub mod power;
pub mod temp_dirs;

pub use browser_cache::{browser_cache_locations, BrowserCache};
pub use elevation::{ensure_elevated, is_elevated};
pub use memory::{can_trim_working_sets, trim_working_set};
pub use power::{reboot_command, request_reboot};
pub use temp_dirs::get_default_temp_directories;
