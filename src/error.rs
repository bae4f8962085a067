use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while configuring the collector or sampling processes.
///
/// Only the configuration and namespace variants ever reach the host; the rest
/// are recorded per spec and shrink the result set of a collection pass.
#[derive(Debug, Error)]
pub enum ProcstatError {
    #[error("required config option 'files' is missing")]
    ConfigMissingFiles,

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("unable to read pid from file '{}': {reason}", .path.display())]
    InvalidPidFile { path: PathBuf, reason: String },

    #[error("unable to read pids from pattern '{pattern}': {reason}")]
    PatternSearchFailed { pattern: String, reason: String },

    #[error("pid {pid} could not be accessed: {reason}")]
    ProcessBindFailed { pid: i32, reason: String },

    #[error("unable to read process name of pid {pid}")]
    ProcessNameUnavailable { pid: i32 },

    #[error("pid {pid} is no longer running")]
    ProcessGone { pid: i32 },

    #[error("unable to read {field} of pid {pid}: {reason}")]
    FieldReadFailed {
        pid: i32,
        field: &'static str,
        reason: String,
    },

    #[error("invalid namespace '{0}': expected /vendor/class/plugin/process/field")]
    InvalidNamespace(String),
}

pub type Result<T> = std::result::Result<T, ProcstatError>;
