//! Error types for `deskbar-core`
//!
//! Each subsystem has its own error enum; [`DeskbarError`] wraps them for
//! callers that cross subsystem boundaries (the CLI, the shell's startup code).

use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

/// Top-level error for the core library
#[derive(Debug, Error)]
pub enum DeskbarError {
    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// JSON store error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Service operation error
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Weather retrieval error
    #[error(transparent)]
    Weather(#[from] WeatherError),

    /// System backend error (`nmcli`, `pactl`, `/proc`)
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while loading or saving `config.toml`
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse the configuration file
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// A setting has an invalid value
    #[error("Invalid value for {field}: {reason}")]
    Validation {
        /// Setting name
        field: String,
        /// Why the value was rejected
        reason: String,
    },

    /// The configuration directory could not be determined
    #[error("Configuration directory not found: {0}")]
    NotFound(PathBuf),

    /// Failed to write the configuration file
    #[error("Failed to write configuration: {0}")]
    Write(String),

    /// Failed to serialize the settings
    #[error("Failed to serialize configuration: {0}")]
    Serialize(String),
}

/// Errors raised by [`crate::store::JsonStore`]
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem error on the store file
    #[error("Store I/O error for {path}: {source}")]
    Io {
        /// Store file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The file exists but is not a valid JSON mapping
    #[error("Failed to parse store {path}: {reason}")]
    Parse {
        /// Store file
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// An entry could not be serialized
    #[error("Failed to serialize store {path}: {reason}")]
    Serialize {
        /// Store file
        path: PathBuf,
        /// Serializer message
        reason: String,
    },
}

/// Errors returned from service operations
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No entity with this id
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind ("Reminder", "To-do item", ...)
        entity: &'static str,
        /// Requested id
        id: Uuid,
    },

    /// The service could not open its store and refuses writes
    #[error("{0} service is not initialized")]
    NotInitialized(&'static str),

    /// Persisting the change failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors raised while retrieving weather data
#[derive(Debug, Error)]
pub enum WeatherError {
    /// Transport-level failure
    #[error("Weather request failed: {0}")]
    Request(String),

    /// Endpoint answered with a non-200 status
    #[error("Weather endpoint returned HTTP {0}")]
    Status(u16),

    /// The body did not contain the expected fields
    #[error("Malformed weather response: {0}")]
    Malformed(String),

    /// No endpoint is configured
    #[error("Weather endpoint is not configured")]
    NotConfigured,
}

/// Errors from the external-command backends
#[derive(Debug, Error)]
pub enum BackendError {
    /// The helper binary could not be spawned
    #[error("Failed to run {command}: {reason}")]
    Spawn {
        /// Binary name
        command: &'static str,
        /// Spawn error
        reason: String,
    },

    /// The helper exited unsuccessfully
    #[error("{command} exited with status {status}: {stderr}")]
    Failed {
        /// Binary name
        command: &'static str,
        /// Exit status
        status: i32,
        /// Captured stderr
        stderr: String,
    },

    /// The helper was killed after running too long
    #[error("{command} did not finish within {after:?}")]
    Timeout {
        /// Binary name
        command: &'static str,
        /// Time allowed
        after: std::time::Duration,
    },

    /// The helper output could not be understood
    #[error("Unexpected {command} output: {output}")]
    Parse {
        /// Binary name
        command: &'static str,
        /// Offending output
        output: String,
    },

    /// No device of the requested kind exists
    #[error("No {0} device available")]
    NoDevice(&'static str),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Result type for weather operations
pub type WeatherResult<T> = Result<T, WeatherError>;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;
