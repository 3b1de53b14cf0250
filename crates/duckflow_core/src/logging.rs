//! Process-wide logging bootstrap.
//!
//! # Responsibility
//! - Initialize the diagnostic sink exactly once per process, either stderr
//!   or size-rotated files.
//! - Capture panics as log events.
//!
//! # Invariants
//! - Logging init is idempotent for the same level and destination.
//! - Re-initialization with a different level or destination is rejected.
//! - Initialization must not panic.
//! - Sessions write events but never own the sink.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::any::Any;
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "duckflow";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;
const MAX_PANIC_PAYLOAD_CHARS: usize = 160;

static LOGGING_STATE: OnceCell<LoggingState> = OnceCell::new();
static PANIC_HOOK_INSTALLED: OnceCell<()> = OnceCell::new();

struct LoggingState {
    level: &'static str,
    log_dir: Option<PathBuf>,
    _logger: LoggerHandle,
}

/// Initializes logging with `level`, writing to `log_dir` when given and to
/// stderr otherwise.
///
/// # Errors
/// - `level` is not one of `trace|debug|info|warn|error`.
/// - `log_dir` is empty, relative, or cannot be created.
/// - Logging is already active with a different level or destination.
/// - The logger backend fails to start.
pub fn init_logging(level: &str, log_dir: Option<&str>) -> Result<(), String> {
    let normalized_level = parse_level(level)?;
    let normalized_dir = log_dir.map(parse_log_dir).transpose()?;

    if let Some(state) = LOGGING_STATE.get() {
        return check_same_config(state, normalized_level, normalized_dir.as_deref());
    }

    let init_dir = normalized_dir.clone();
    let state = LOGGING_STATE.get_or_try_init(|| -> Result<LoggingState, String> {
        let logger = start_logger(normalized_level, init_dir.as_deref())?;

        install_panic_hook_once();

        info!(
            "event=app_start module=core status=ok platform={} build_mode={} version={}",
            std::env::consts::OS,
            build_mode(),
            env!("CARGO_PKG_VERSION")
        );
        info!(
            "event=core_init module=core status=ok level={} log_dir={}",
            normalized_level,
            init_dir
                .as_deref()
                .map_or_else(|| "stderr".to_string(), |dir| dir.display().to_string())
        );

        Ok(LoggingState {
            level: normalized_level,
            log_dir: init_dir,
            _logger: logger,
        })
    })?;

    check_same_config(state, normalized_level, normalized_dir.as_deref())
}

/// Returns `(level, log_dir)` of the active logger, or `None` before init.
/// `log_dir` is `None` when logging to stderr.
pub fn logging_status() -> Option<(&'static str, Option<PathBuf>)> {
    LOGGING_STATE
        .get()
        .map(|state| (state.level, state.log_dir.clone()))
}

/// Returns the default log level for current build mode.
///
/// - `debug` builds -> `debug`
/// - `release` builds -> `info`
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start_logger(level: &str, log_dir: Option<&Path>) -> Result<LoggerHandle, String> {
    let logger = Logger::try_with_str(level)
        .map_err(|err| format!("invalid log level `{level}`: {err}"))?;

    let logger = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|err| {
                format!("failed to create log directory `{}`: {err}", dir.display())
            })?;
            logger
                .log_to_file(
                    FileSpec::default()
                        .directory(dir)
                        .basename(LOG_FILE_BASENAME),
                )
                .rotate(
                    Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(MAX_LOG_FILES),
                )
                .write_mode(WriteMode::BufferAndFlush)
                .append()
                .format_for_files(flexi_logger::detailed_format)
        }
        None => logger
            .log_to_stderr()
            .format_for_stderr(flexi_logger::default_format),
    };

    logger
        .start()
        .map_err(|err| format!("failed to start logger: {err}"))
}

fn check_same_config(
    state: &LoggingState,
    level: &'static str,
    log_dir: Option<&Path>,
) -> Result<(), String> {
    if state.log_dir.as_deref() != log_dir {
        return Err(format!(
            "logging already initialized at `{}`; refusing to switch to `{}`",
            describe_dir(state.log_dir.as_deref()),
            describe_dir(log_dir)
        ));
    }
    if state.level != level {
        return Err(format!(
            "logging already initialized with level `{}`; refusing to switch to `{}`",
            state.level, level
        ));
    }
    Ok(())
}

fn describe_dir(dir: Option<&Path>) -> String {
    dir.map_or_else(|| "stderr".to_string(), |dir| dir.display().to_string())
}

/// Accepted spellings, mapped to the names `flexi_logger` parses.
const LEVEL_ALIASES: &[(&str, &str)] = &[
    ("trace", "trace"),
    ("debug", "debug"),
    ("info", "info"),
    ("warn", "warn"),
    ("warning", "warn"),
    ("error", "error"),
];

fn parse_level(level: &str) -> Result<&'static str, String> {
    let wanted = level.trim();
    LEVEL_ALIASES
        .iter()
        .find(|(alias, _)| alias.eq_ignore_ascii_case(wanted))
        .map(|(_, canonical)| *canonical)
        .ok_or_else(|| {
            format!("unsupported log level `{wanted}`; expected trace|debug|info|warn|error")
        })
}

fn parse_log_dir(log_dir: &str) -> Result<PathBuf, String> {
    match PathBuf::from(log_dir.trim()) {
        dir if dir.as_os_str().is_empty() => Err("log_dir cannot be empty".to_string()),
        dir if dir.is_relative() => Err(format!(
            "log_dir must be an absolute path, got `{}`",
            dir.display()
        )),
        dir => Ok(dir),
    }
}

fn build_mode() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    }
}

fn install_panic_hook_once() {
    PANIC_HOOK_INSTALLED.get_or_init(|| {
        let chained = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let location = info.location().map_or_else(
                || "unknown".to_string(),
                |loc| format!("{}:{}", loc.file(), loc.line()),
            );
            error!(
                "event=panic_captured module=core status=error location={location} payload={}",
                one_line_capped(panic_text(info.payload()), MAX_PANIC_PAYLOAD_CHARS)
            );
            chained(info);
        }));
    });
}

fn panic_text(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

/// Joins lines with spaces and keeps at most `limit` chars, marking the cut.
fn one_line_capped(text: &str, limit: usize) -> String {
    let mut flat: String = text
        .chars()
        .map(|ch| if matches!(ch, '\n' | '\r') { ' ' } else { ch })
        .collect();
    if let Some((cut, _)) = flat.char_indices().nth(limit) {
        flat.truncate(cut);
        flat.push_str("...");
    }
    flat
}

#[cfg(test)]
mod tests {
    use super::{init_logging, logging_status, one_line_capped, parse_level, parse_log_dir};

    #[test]
    fn parse_level_is_case_insensitive_and_maps_aliases() {
        assert_eq!(parse_level("INFO"), Ok("info"));
        assert_eq!(parse_level(" warning "), Ok("warn"));
        let err = parse_level("verbose").expect_err("unknown level must fail");
        assert!(err.contains("verbose"));
    }

    #[test]
    fn parse_log_dir_requires_non_empty_absolute_path() {
        let err = parse_log_dir("logs/dev").expect_err("relative paths must be rejected");
        assert!(err.contains("absolute"));
        assert!(parse_log_dir("  ").is_err());
    }

    #[test]
    fn one_line_capped_flattens_and_marks_truncation() {
        assert_eq!(one_line_capped("line1\nline2\rline3", 8), "line1 li...");
        assert_eq!(one_line_capped("short", 8), "short");
        assert_eq!(one_line_capped("exactly8", 8), "exactly8");
    }

    #[test]
    fn init_logging_is_idempotent_for_same_config_and_rejects_conflicts() {
        let log_dir = tempfile::tempdir().expect("temp dir");
        let log_dir_str = log_dir
            .path()
            .to_str()
            .expect("temp dir should be valid UTF-8")
            .to_string();

        init_logging("info", Some(&log_dir_str)).expect("first init should succeed");
        init_logging("INFO", Some(&log_dir_str)).expect("same config should be idempotent");

        let level_error =
            init_logging("debug", Some(&log_dir_str)).expect_err("level conflict should fail");
        assert!(level_error.contains("refusing to switch"));

        let sink_error = init_logging("info", None).expect_err("sink conflict should fail");
        assert!(sink_error.contains("refusing to switch"));

        let (active_level, active_dir) = logging_status().expect("logging should be active");
        assert_eq!(active_level, "info");
        assert_eq!(active_dir.as_deref(), Some(log_dir.path()));
    }
}
