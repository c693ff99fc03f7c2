//! Error types for the watchdog stack.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WdError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("fork failed: {0}")]
    Fork(std::io::Error),

    #[error("exec of {path:?} failed: {source}")]
    Exec {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("waitpid on pid {pid} failed: {source}")]
    Wait { pid: i32, source: std::io::Error },

    #[error("rendezvous failure: {0}")]
    Rendezvous(String),

    #[error("failed to install signal handlers: {0}")]
    SignalInstall(std::io::Error),

    #[error("watchdog is already running")]
    AlreadyRunning,

    #[error("watchdog is not running")]
    NotRunning,

    #[error("{0}")]
    Other(String),
}

pub type WdResult<T> = Result<T, WdError>;
