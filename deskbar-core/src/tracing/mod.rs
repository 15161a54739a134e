//! Logging setup shared by the shell and the CLI
//!
//! Both binaries describe what they want in a [`TracingConfig`] and hand it
//! to [`init_tracing`], which installs an `EnvFilter` scoped to the deskbar
//! crates and a single fmt layer. The destination is picked by
//! [`TracingOutput`] and boxed so there is only one subscriber shape.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Targets the level applies to when no explicit filter is given
const DESKBAR_TARGETS: [&str; 3] = ["deskbar", "deskbar_core", "deskbar_cli"];

/// Failures while installing the subscriber
#[derive(Debug, Error)]
pub enum TracingError {
    /// A subscriber is already installed in this process
    #[error("Tracing has already been initialized")]
    AlreadyInitialized,

    /// The filter directive did not parse
    #[error("Invalid log filter '{directive}': {reason}")]
    InvalidFilter {
        /// Directive as given
        directive: String,
        /// Parser message
        reason: String,
    },

    /// Level name not one of error, warn, info, debug, trace
    #[error("Unknown log level '{0}'")]
    UnknownLevel(String),

    /// The log file could not be opened
    #[error("Cannot open log file {path}: {source}")]
    LogFile {
        /// Requested file
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// `tracing-subscriber` refused the subscriber
    #[error("Failed to install subscriber: {0}")]
    Install(String),
}

/// Result type for tracing setup
pub type TracingResult<T> = Result<T, TracingError>;

/// Verbosity, ordered from quiet to chatty
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum TracingLevel {
    /// Errors only
    Error,
    /// Errors and warnings
    Warn,
    /// Normal operation messages
    #[default]
    Info,
    /// Debug output
    Debug,
    /// Everything
    Trace,
}

impl TracingLevel {
    const ALL: [Self; 5] = [Self::Error, Self::Warn, Self::Info, Self::Debug, Self::Trace];

    /// Directive spelling of the level
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }

    /// Maps a `-v` count to a level; no flag means warnings
    #[must_use]
    pub fn from_verbosity(count: u8) -> Self {
        Self::ALL[(usize::from(count) + 1).min(Self::ALL.len() - 1)]
    }
}

impl std::str::FromStr for TracingLevel {
    type Err = TracingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        if wanted == "warning" {
            return Ok(Self::Warn);
        }
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == wanted)
            .ok_or_else(|| TracingError::UnknownLevel(s.to_string()))
    }
}

impl std::fmt::Display for TracingLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where log lines go
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TracingOutput {
    /// Standard output
    Stdout,
    /// Standard error
    #[default]
    Stderr,
    /// A log file, truncated at startup
    File(PathBuf),
}

impl TracingOutput {
    fn make_writer(&self) -> TracingResult<BoxMakeWriter> {
        match self {
            Self::Stdout => Ok(BoxMakeWriter::new(std::io::stdout)),
            Self::Stderr => Ok(BoxMakeWriter::new(std::io::stderr)),
            Self::File(path) => open_log_file(path).map(BoxMakeWriter::new),
        }
    }

    const fn is_terminal_stream(&self) -> bool {
        !matches!(self, Self::File(_))
    }
}

fn open_log_file(path: &Path) -> TracingResult<std::fs::File> {
    let log_error = |source| TracingError::LogFile {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(log_error)?;
    }
    std::fs::File::create(path).map_err(log_error)
}

/// What [`init_tracing`] installs
#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    /// Level for the deskbar targets
    pub level: TracingLevel,
    /// Destination
    pub output: TracingOutput,
    /// Raw `EnvFilter` directive, e.g. from `RUST_LOG`; replaces `level`
    pub filter: Option<String>,
}

impl TracingConfig {
    /// Info level to stderr
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the level
    #[must_use]
    pub const fn with_level(mut self, level: TracingLevel) -> Self {
        self.level = level;
        self
    }

    /// Sets the destination
    #[must_use]
    pub fn with_output(mut self, output: TracingOutput) -> Self {
        self.output = output;
        self
    }

    /// Uses a raw filter directive instead of the level
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// The directive the filter is built from
    #[must_use]
    pub fn directive(&self) -> String {
        self.filter.clone().unwrap_or_else(|| {
            DESKBAR_TARGETS
                .iter()
                .map(|target| format!("{target}={}", self.level))
                .collect::<Vec<_>>()
                .join(",")
        })
    }

    fn env_filter(&self) -> TracingResult<EnvFilter> {
        let directive = self.directive();
        EnvFilter::try_new(&directive).map_err(|e| TracingError::InvalidFilter {
            directive,
            reason: e.to_string(),
        })
    }
}

/// Installs the process-wide subscriber
///
/// # Errors
///
/// Returns an error if a subscriber is already installed, the filter is
/// invalid, or the log file cannot be opened.
pub fn init_tracing(config: &TracingConfig) -> TracingResult<()> {
    let filter = config.env_filter()?;
    let writer = config.output.make_writer()?;
    if INSTALLED.swap(true, Ordering::SeqCst) {
        return Err(TracingError::AlreadyInitialized);
    }

    let layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(config.output.is_terminal_stream())
        .with_writer(writer);
    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .map_err(|e| TracingError::Install(e.to_string()))?;

    tracing::debug!(directive = %config.directive(), "Logging ready");
    Ok(())
}

/// Opens an info span named after one of [`span_names`]
///
/// ```ignore
/// let _span = deskbar_core::trace_operation!(
///     deskbar_core::tracing::span_names::STORE_WRITE,
///     { deskbar_core::tracing::field_names::PATH } = %path.display()
/// ).entered();
/// ```
#[macro_export]
macro_rules! trace_operation {
    ($name:expr) => {
        tracing::info_span!($name)
    };
    ($name:expr, $($field:tt)*) => {
        tracing::info_span!($name, $($field)*)
    };
}

/// Span names used across the crates
pub mod span_names {
    /// Reading `config.toml`
    pub const CONFIG_LOAD: &str = "config.load";
    /// Reading a JSON store
    pub const STORE_LOAD: &str = "store.load";
    /// Rewriting a JSON store
    pub const STORE_WRITE: &str = "store.write";
    /// Arming reminder timers
    pub const REMINDER_SCHEDULE: &str = "reminder.schedule";
    /// Retention sweep
    pub const REMINDER_SWEEP: &str = "reminder.sweep";
    /// Weather HTTP fetch
    pub const WEATHER_FETCH: &str = "weather.fetch";
    /// NetworkManager snapshot
    pub const NETWORK_REFRESH: &str = "network.refresh";
    /// Running a power action
    pub const POWER_ACTION: &str = "power.action";
}

/// Structured field names used across the crates
pub mod field_names {
    /// Reminder id
    pub const REMINDER_ID: &str = "reminder_id";
    /// To-do item id
    pub const ITEM_ID: &str = "item_id";
    /// Number of armed timers
    pub const TIMER_COUNT: &str = "timer_count";
    /// Store file
    pub const PATH: &str = "path";
    /// Error message
    pub const ERROR: &str = "error";
}
