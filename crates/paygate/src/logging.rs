//! # Logging
//!
//! Structured logging for the paygate service, built on `tracing`.
//!
//! Supports pretty, JSON and compact output, an optional daily-rolling log
//! file, and correlation ids for socket requests.
//!
//! ```no_run
//! use paygate::logging::{init_logging, LogConfig};
//!
//! let _guard = init_logging(&LogConfig::default()).expect("logging init");
//! tracing::info!("paygate started");
//! ```
//!
//! Key material must never be passed to a tracing macro. Use
//! [`redact_sensitive`] for any identifier that should only be partially shown.

use std::path::PathBuf;
use std::str::FromStr;

use paygate_core::config::LoggingConfig;
use paygate_core::config_loader::expand_path;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Error type for logging initialization failures.
#[derive(Debug)]
pub enum LogError {
    /// Failed to create the log file or its directory
    FileCreation(String),
    /// Failed to install the subscriber
    SubscriberInit(String),
    /// Invalid configuration
    InvalidConfig(String),
}

impl std::fmt::Display for LogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FileCreation(msg) => write!(f, "Failed to create log file: {msg}"),
            Self::SubscriberInit(msg) => write!(f, "Failed to initialize logging: {msg}"),
            Self::InvalidConfig(msg) => write!(f, "Invalid log configuration: {msg}"),
        }
    }
}

impl std::error::Error for LogError {}

/// Minimum severity of logged messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// trace and above
    Trace,
    /// debug and above
    Debug,
    /// info and above
    #[default]
    Info,
    /// warn and above
    Warn,
    /// error only
    Error,
}

impl LogLevel {
    /// Convert to a tracing [`Level`].
    #[must_use]
    pub const fn as_tracing_level(self) -> Level {
        match self {
            Self::Trace => Level::TRACE,
            Self::Debug => Level::DEBUG,
            Self::Info => Level::INFO,
            Self::Warn => Level::WARN,
            Self::Error => Level::ERROR,
        }
    }

    /// Directive string for [`EnvFilter`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(LogError::InvalidConfig(format!("unknown log level: {other}"))),
        }
    }
}

/// Output format of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
    /// Single-line text.
    Compact,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
            Self::Compact => write!(f, "compact"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            other => Err(LogError::InvalidConfig(format!("unknown log format: {other}"))),
        }
    }
}

/// Configuration for [`init_logging`].
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Minimum level. Defaults to [`LogLevel::Info`].
    pub level: LogLevel,

    /// Output format. Defaults to [`LogFormat::Pretty`].
    pub format: LogFormat,

    /// Optional file to log to in addition to stderr.
    ///
    /// The parent directory is created if missing; the file rolls daily.
    pub file_path: Option<PathBuf>,

    /// Attach a correlation id span to each socket request.
    pub correlation_ids: bool,
}

impl LogConfig {
    /// Build from the `[logging]` config section.
    ///
    /// A non-zero `verbosity` (from `-v` flags) overrides the configured level.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::InvalidConfig`] for an unknown level or format, or a
    /// file path that cannot be expanded.
    pub fn from_config(config: &LoggingConfig, verbosity: u8) -> Result<Self, LogError> {
        let level = if verbosity > 0 {
            verbosity_to_level(verbosity)
        } else {
            config.level.parse()?
        };

        let file_path = config
            .file
            .as_deref()
            .map(expand_path)
            .transpose()
            .map_err(|e| LogError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            level,
            format: config.format.parse()?,
            file_path,
            correlation_ids: true,
        })
    }
}

/// Keeps the non-blocking file writer alive; logs are flushed on drop.
pub struct LogGuard {
    guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

impl LogGuard {
    const fn new(guard: Option<tracing_appender::non_blocking::WorkerGuard>) -> Self {
        Self { guard }
    }
}

impl std::fmt::Debug for LogGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogGuard")
            .field("has_file_guard", &self.guard.is_some())
            .finish()
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG`, when set, takes precedence over the configured level.
///
/// # Errors
///
/// Returns [`LogError`] if the log directory cannot be created or a
/// subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<LogGuard, LogError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.level.as_str()))
        .map_err(|e| LogError::InvalidConfig(e.to_string()))?;

    let (file_writer, guard) = if let Some(ref path) = config.file_path {
        let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
        std::fs::create_dir_all(dir)
            .map_err(|e| LogError::FileCreation(format!("{}: {}", dir.display(), e)))?;

        let filename = path
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| LogError::InvalidConfig("Invalid log file name".to_string()))?;

        let file_appender = tracing_appender::rolling::daily(dir, filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        (Some(non_blocking), Some(guard))
    } else {
        (None, None)
    };

    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.format {
        LogFormat::Pretty => {
            let stderr_layer = fmt::layer()
                .pretty()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_span_events(FmtSpan::CLOSE);
            let file_layer = file_writer.map(|writer| {
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(true)
            });
            registry.with(stderr_layer).with(file_layer).try_init()
        }
        LogFormat::Json => {
            let stderr_layer = fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_current_span(true);
            let file_layer = file_writer.map(|writer| {
                fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_target(true)
                    .with_current_span(true)
            });
            registry.with(stderr_layer).with(file_layer).try_init()
        }
        LogFormat::Compact => {
            let stderr_layer = fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_target(true);
            let file_layer = file_writer.map(|writer| {
                fmt::layer()
                    .compact()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(true)
            });
            registry.with(stderr_layer).with(file_layer).try_init()
        }
    };

    result.map_err(|e| LogError::SubscriberInit(e.to_string()))?;

    Ok(LogGuard::new(guard))
}

/// Partially redact an identifier for logging.
///
/// Values shorter than 12 characters become `***`; longer ones keep the first
/// and last four characters.
///
/// ```
/// use paygate::logging::redact_sensitive;
///
/// assert_eq!(redact_sensitive("cMahea7zqjxrtgAbB7LSGbcQ"), "cMah***GbcQ");
/// assert_eq!(redact_sensitive("short"), "***");
/// ```
#[must_use]
pub fn redact_sensitive(value: &str) -> String {
    const MIN_LENGTH_FOR_PARTIAL: usize = 12;
    const VISIBLE_CHARS: usize = 4;

    let chars: Vec<char> = value.chars().collect();
    let len = chars.len();

    if len < MIN_LENGTH_FOR_PARTIAL {
        return "***".to_string();
    }

    let prefix: String = chars.iter().take(VISIBLE_CHARS).collect();
    let suffix: String = chars.iter().skip(len - VISIBLE_CHARS).collect();

    format!("{prefix}***{suffix}")
}

/// Generate a 32 hex character correlation id.
///
/// Unique within the process; not suitable as a secret.
#[must_use]
pub fn new_correlation_id() -> String {
    use std::fmt::Write;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let counter = COUNTER.fetch_add(1, Ordering::Relaxed);
    let mixed = timestamp.wrapping_add(u128::from(counter));

    // Truncation keeps the low 64 bits.
    #[allow(clippy::cast_possible_truncation)]
    let low = mixed as u64;

    let mut state = low ^ counter.rotate_left(32);
    let mut random_part = [0u8; 8];
    for byte in &mut random_part {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        *byte = state.to_be_bytes()[0];
    }

    let mut hex = String::with_capacity(32);
    for byte in low.to_be_bytes().iter().chain(random_part.iter()) {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

/// Map `-v` occurrences to a level.
///
/// | Verbosity | Level |
/// |-----------|-------|
/// | 0         | Warn  |
/// | 1         | Info  |
/// | 2         | Debug |
/// | 3+        | Trace |
#[must_use]
pub const fn verbosity_to_level(verbosity: u8) -> LogLevel {
    match verbosity {
        0 => LogLevel::Warn,
        1 => LogLevel::Info,
        2 => LogLevel::Debug,
        _ => LogLevel::Trace,
    }
}
