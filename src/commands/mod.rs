// Command handlers module
pub mod config;
pub mod monitor;
pub mod run;

pub use monitor::execute as monitor;
