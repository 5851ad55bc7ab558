//! API Error Types

use storage::StorageError;
use thiserror::Error;

/// Errors that stop the service from starting or serving
#[derive(Debug, Error)]
pub enum ApiError {
    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Storage backend could not be set up
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Listener bind or serve failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
