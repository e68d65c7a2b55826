//! Process-wide logging bootstrap.
//!
//! # Responsibility
//! - Start one rotating file logger per process.
//! - Keep core diagnostics metadata-only: ids, counts and offsets. Document
//!   and paraphrase text never reach a log line.
//!
//! # Invariants
//! - Repeating initialization with the same level and directory is a no-op.
//! - Initialization with a different level or directory is rejected.
//! - Initialization never panics.

use crate::config::LoggingConfig;
use flexi_logger::{
    Cleanup, Criterion, Duplicate, FileSpec, LogSpecification, Logger, LoggerHandle, Naming,
    WriteMode,
};
use log::{error, info, LevelFilter};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const LOG_BASENAME: &str = "marginalia";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const KEEP_ROTATED_FILES: usize = 5;
const PANIC_SUMMARY_CHARS: usize = 160;

static LOGGER: OnceCell<RunningLogger> = OnceCell::new();
static PANIC_HOOK: OnceCell<()> = OnceCell::new();

struct RunningLogger {
    status: LoggingStatus,
    _handle: LoggerHandle,
}

/// Level and directory of the running logger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingStatus {
    pub level: LevelFilter,
    pub dir: PathBuf,
}

/// Errors from logger initialization.
#[derive(Debug)]
pub enum LoggingError {
    UnsupportedLevel(String),
    /// Directory is empty or relative.
    InvalidDir(PathBuf),
    CreateDir { path: PathBuf, source: std::io::Error },
    Backend(String),
    /// A logger with another configuration is already running.
    Conflict { running: LoggingStatus, requested: LoggingStatus },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedLevel(level) => write!(
                f,
                "unsupported log level `{level}`; expected trace|debug|info|warn|error"
            ),
            Self::InvalidDir(path) => {
                write!(f, "log dir must be a non-empty absolute path, got `{}`", path.display())
            }
            Self::CreateDir { path, source } => {
                write!(f, "cannot create log dir `{}`: {source}", path.display())
            }
            Self::Backend(message) => write!(f, "logger backend failed: {message}"),
            Self::Conflict { running, requested } => write!(
                f,
                "logger already running with level {} at `{}`; refusing to switch to level {} at `{}`",
                running.level,
                running.dir.display(),
                requested.level,
                requested.dir.display()
            ),
        }
    }
}

impl Error for LoggingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDir { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Starts file logging at `level` under the absolute directory `dir`.
pub fn init_logging(level: &str, dir: impl AsRef<Path>) -> Result<(), LoggingError> {
    let requested = LoggingStatus {
        level: parse_level(level)?,
        dir: absolute_dir(dir.as_ref())?,
    };
    let running = LOGGER.get_or_try_init(|| start(requested.clone()))?;
    if running.status != requested {
        return Err(LoggingError::Conflict {
            running: running.status.clone(),
            requested,
        });
    }
    Ok(())
}

/// Starts logging from config. Without `dir` nothing is started.
pub fn init_logging_from_config(config: &LoggingConfig) -> Result<(), LoggingError> {
    match &config.dir {
        Some(dir) => init_logging(&config.level, dir),
        None => Ok(()),
    }
}

pub fn logging_status() -> Option<LoggingStatus> {
    LOGGER.get().map(|running| running.status.clone())
}

/// `debug` in debug builds, `info` otherwise.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

/// Accepts the five `log` level names, case-insensitively, plus `warning`.
pub(crate) fn parse_level(value: &str) -> Result<LevelFilter, LoggingError> {
    let normalized = value.trim().to_ascii_lowercase();
    let name = if normalized == "warning" {
        "warn"
    } else {
        normalized.as_str()
    };
    match name.parse::<LevelFilter>() {
        Ok(LevelFilter::Off) | Err(_) => Err(LoggingError::UnsupportedLevel(value.to_string())),
        Ok(level) => Ok(level),
    }
}

fn absolute_dir(dir: &Path) -> Result<PathBuf, LoggingError> {
    if dir.as_os_str().is_empty() || !dir.is_absolute() {
        return Err(LoggingError::InvalidDir(dir.to_path_buf()));
    }
    Ok(dir.to_path_buf())
}

fn start(status: LoggingStatus) -> Result<RunningLogger, LoggingError> {
    std::fs::create_dir_all(&status.dir).map_err(|source| LoggingError::CreateDir {
        path: status.dir.clone(),
        source,
    })?;

    let spec = LogSpecification::builder().default(status.level).build();
    let handle = Logger::with(spec)
        .log_to_file(FileSpec::default().directory(&status.dir).basename(LOG_BASENAME))
        .rotate(
            Criterion::Size(ROTATE_AT_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(KEEP_ROTATED_FILES),
        )
        .duplicate_to_stderr(Duplicate::Error)
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|err| LoggingError::Backend(err.to_string()))?;

    install_panic_hook();
    info!(
        "event=logging_start module=logging status=ok version={} level={} dir={}",
        env!("CARGO_PKG_VERSION"),
        status.level,
        status.dir.display()
    );
    Ok(RunningLogger {
        status,
        _handle: handle,
    })
}

fn install_panic_hook() {
    if PANIC_HOOK.set(()).is_err() {
        return;
    }
    let chained = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|location| format!("{}:{}", location.file(), location.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .map(|message| (*message).to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        error!(
            "event=panic module=core status=error location={} payload={}",
            location,
            summarize(&payload, PANIC_SUMMARY_CHARS)
        );
        chained(info);
    }));
}

// Panic messages can quote user text, so they are flattened and capped.
fn summarize(value: &str, max_chars: usize) -> String {
    let mut summary = value
        .chars()
        .take(max_chars)
        .map(|ch| if ch.is_control() { ' ' } else { ch })
        .collect::<String>();
    if value.chars().nth(max_chars).is_some() {
        summary.push_str("...");
    }
    summary
}
