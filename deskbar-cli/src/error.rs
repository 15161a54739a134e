//! CLI error types and exit codes.

use deskbar_core::error::{ConfigError, ServiceError, StoreError, WeatherError};

/// Exit codes for CLI operations
pub mod exit_codes {
    /// General error - configuration, storage, or other failures
    pub const GENERAL_ERROR: i32 = 1;
    /// The requested reminder or item does not exist, or the prefix is ambiguous
    pub const NOT_FOUND: i32 = 2;
    /// The weather endpoint could not be reached or answered badly
    pub const WEATHER_FAILURE: i32 = 3;
}

/// CLI error type
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A store could not be opened, so nothing would be saved
    #[error("{0} store is unavailable; see the log for details")]
    StoreUnavailable(&'static str),

    /// Store read or write failed
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// No entity matches the given id
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind
        entity: &'static str,
        /// The id or prefix as given
        id: String,
    },

    /// More than one entity matches the given prefix
    #[error("Ambiguous {entity} id '{prefix}'. Matches: {}", .matches.join(", "))]
    Ambiguous {
        /// Entity kind
        entity: &'static str,
        /// The prefix as given
        prefix: String,
        /// Full ids that matched
        matches: Vec<String>,
    },

    /// Service operation failed
    #[error(transparent)]
    Service(ServiceError),

    /// Weather fetch failed
    #[error(transparent)]
    Weather(#[from] WeatherError),

    /// Output serialization failed
    #[error("Failed to serialize output: {0}")]
    Serialize(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<ServiceError> for CliError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound { entity, id } => Self::NotFound {
                entity,
                id: id.to_string(),
            },
            ServiceError::Store(e) => Self::Store(e),
            other => Self::Service(other),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialize(err.to_string())
    }
}

impl CliError {
    /// Returns the appropriate exit code for this error type.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. } | Self::Ambiguous { .. } => exit_codes::NOT_FOUND,
            Self::Weather(_) => exit_codes::WEATHER_FAILURE,
            Self::Config(_)
            | Self::StoreUnavailable(_)
            | Self::Store(_)
            | Self::Service(_)
            | Self::Serialize(_)
            | Self::Io(_) => exit_codes::GENERAL_ERROR,
        }
    }
}
