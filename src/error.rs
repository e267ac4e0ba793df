use std::io;
use thiserror::Error;

/// Custom error type for RBoost
#[derive(Error, Debug)]
pub enum RboostError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Elevation required: {0}")]
    ElevationRequired(String),

    #[error("Metric collection failed: {0}")]
    MetricCollection(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),

    #[error("A task is already running: {0}")]
    TaskInFlight(String),

    #[error("Command `{command}` exited with {status}")]
    CommandFailed { command: String, status: String },

    #[error("Required tool not found: {0}")]
    ToolNotFound(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for RBoost
pub type Result<T> = std::result::Result<T, RboostError>;

impl RboostError {
    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        RboostError::Config(msg.into())
    }

    /// Create a permission denied error
    pub fn permission_denied<S: Into<String>>(msg: S) -> Self {
        RboostError::PermissionDenied(msg.into())
    }

    /// Create an elevation required error
    pub fn elevation_required<S: Into<String>>(msg: S) -> Self {
        RboostError::ElevationRequired(msg.into())
    }

    pub fn metric_collection<S: Into<String>>(msg: S) -> Self {
        RboostError::MetricCollection(msg.into())
    }

    pub fn operation_failed<S: Into<String>>(msg: S) -> Self {
        RboostError::OperationFailed(msg.into())
    }

    pub fn task_in_flight<S: Into<String>>(label: S) -> Self {
        RboostError::TaskInFlight(label.into())
    }

    pub fn command_failed<C: Into<String>, S: Into<String>>(command: C, status: S) -> Self {
        RboostError::CommandFailed {
            command: command.into(),
            status: status.into(),
        }
    }

    pub fn tool_not_found<S: Into<String>>(tool: S) -> Self {
        RboostError::ToolNotFound(tool.into())
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        RboostError::Other(msg.into())
    }
}
