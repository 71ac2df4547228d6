//! Error types for pktlog-core.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PktlogError {
    /// The buffer will never accept or yield more data.
    #[error("Log buffer closed")]
    BufferClosed,

    #[error("Session logger already started")]
    AlreadyStarted,

    #[error("Scheduler has been shut down")]
    SchedulerShutdown,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, PktlogError>;
