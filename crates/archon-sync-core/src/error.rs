use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchonError {
    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("invalid daemon interval {got}s: must be at least {min}s")]
    InvalidInterval { got: u64, min: u64 },

    #[error("daemon already running for '{feature}' (PID {pid})")]
    DaemonRunning { feature: String, pid: u32 },

    #[error("state directory unavailable: {0}")]
    StateDir(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ArchonError>;
