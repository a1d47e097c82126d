// Error types for relink

use thiserror::Error;

/// Result type alias using anyhow::Error
pub type Result<T> = anyhow::Result<T>;

/// Relink-specific error types
#[derive(Error, Debug)]
pub enum RelinkError {
    #[error("Unknown service '{0}' (expected one of: barrier, ssh_tunnel, smb)")]
    UnknownService(String),

    #[error("Service '{0}' is not registered")]
    ServiceNotRegistered(String),

    #[error("Service registry error: {0}")]
    Registry(String),

    #[error("Failed to run '{program}': {message}")]
    CommandSpawn {
        program: String,
        kind: std::io::ErrorKind,
        message: String,
    },

    #[error("'{program}' timed out after {secs}s")]
    CommandTimeout { program: String, secs: u64 },

    #[error("'{program}' exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
