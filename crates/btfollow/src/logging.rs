//! Logging initialization.
//!
//! - **Console**: compact logs to stdout
//! - **Console + file** (`--log-dir`): adds JSON logs to a daily-rotated file
//!
//! The filter comes from `RUST_LOG`, then `BTFOLLOW_LOG_LEVEL`, then the
//! configuration's `log_level`, then `info`.

use std::path::Path;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable overriding the configured log level.
pub const LOG_LEVEL_ENV: &str = "BTFOLLOW_LOG_LEVEL";

const DEFAULT_LEVEL: &str = "info";

/// Keeps the non-blocking file writer alive for the lifetime of the program.
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

static INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize logging.
///
/// # Arguments
///
/// * `config_level` - The `log_level` from the configuration, if any
/// * `log_dir` - Directory for rotated JSON log files, if file logging is wanted
///
/// # Errors
///
/// Returns an error if the filter is invalid or the log file cannot be created.
pub fn init(config_level: Option<&str>, log_dir: Option<&Path>) -> anyhow::Result<()> {
    let directive = filter_directive(std::env::var(LOG_LEVEL_ENV).ok(), config_level);
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&directive))?;

    let stdout_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(false);

    match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("btfollow")
                .filename_suffix("log")
                .build(dir)?;
            let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

            let file_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking_file)
                .with_target(true)
                .with_file(true)
                .with_line_number(true);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(stdout_layer)
                .with(file_layer)
                .try_init()?;

            let _ = FILE_GUARD.set(file_guard);
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stdout_layer)
                .try_init()?;
        }
    }

    let _ = INITIALIZED.set(());
    Ok(())
}

/// Whether [`init`] has completed.
pub fn is_initialized() -> bool {
    INITIALIZED.get().is_some()
}

/// Pick the filter directive used when `RUST_LOG` is unset.
fn filter_directive(env_level: Option<String>, config_level: Option<&str>) -> String {
    env_level
        .filter(|level| !level.trim().is_empty())
        .or_else(|| config_level.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_LEVEL.to_string())
}
