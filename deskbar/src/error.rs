//! Error types for the deskbar GUI application

use deskbar_core::error::ConfigError;
use thiserror::Error;

/// Errors that can occur while starting the shell
#[derive(Debug, Error)]
pub enum AppError {
    /// Settings could not be located or parsed
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A component failed to initialize
    #[error("Failed to initialize {component}: {reason}")]
    InitializationFailed {
        /// The component that failed to initialize
        component: &'static str,
        /// The reason for failure
        reason: String,
    },
}

/// Result type alias for shell startup
pub type AppResult<T> = Result<T, AppError>;
