//! Logging setup shared by the QRNG scripts.

use dotenvy::dotenv;
use std::{env, fmt::Debug, io::stderr, str::FromStr};
use strum::EnumString;
use tracing_appender::{
    non_blocking::{NonBlocking, WorkerGuard},
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
    Registry,
};

const ENV_LOG_FILE: &str = "QRNG_LOG_FILE";
const ENV_LOG_DIR: &str = "QRNG_LOG_DIR";
const ENV_LOG_FORMAT_FILE: &str = "QRNG_LOG_FORMAT_FILE";
const ENV_LOG_FORMAT_STDERR: &str = "QRNG_LOG_FORMAT_STDERR";

#[derive(EnumString, Debug, Default, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
enum LogFormat {
    #[default]
    Text,
    Json,
}

/// A boxed layer for tracing
pub type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync>;

/// Initialize logging.
///
/// Logs go to stderr so that stdout only carries the script results. By default this will
/// initialize INFO text logs.
///
/// Env var options:
/// - `QRNG_LOG_FILE` - file name to write logs to. If empty, will not write logs to file.
/// - `QRNG_LOG_DIR` - directory to write logs to. If empty will write logs to current directory.
/// - `QRNG_LOG_FORMAT_FILE` - logging format for file target. Defaults to `json`. One of json,
///   text.
/// - `QRNG_LOG_FORMAT_STDERR` - logging format for stderr target. Defaults to `text`. One of
///   json, text.
///
/// The returned guards must be held until the process exits, otherwise buffered logs are lost.
pub fn init_logging() -> eyre::Result<Vec<WorkerGuard>> {
    dotenv().ok();

    let env_log_file = env::var(ENV_LOG_FILE).unwrap_or_default();
    let env_log_dir = env::var(ENV_LOG_DIR).unwrap_or_else(|_| ".".to_string());
    let env_log_format_file = env::var(ENV_LOG_FORMAT_FILE).unwrap_or_else(|_| "json".to_string());
    let env_log_format_stderr =
        env::var(ENV_LOG_FORMAT_STDERR).unwrap_or_else(|_| "text".to_string());

    let log_format_file = LogFormat::from_str(&env_log_format_file).unwrap_or_default();
    let log_format_stderr = LogFormat::from_str(&env_log_format_stderr).unwrap_or_default();

    let (stderr_writer, stderr_guard) = tracing_appender::non_blocking(stderr());

    let mut guards = vec![stderr_guard];
    let mut layers: Vec<BoxedLayer<Registry>> =
        vec![apply_layer_format(&log_format_stderr, stderr_writer)];

    if !env_log_file.is_empty() {
        let appender = RollingFileAppender::new(Rotation::NEVER, &env_log_dir, &env_log_file);
        let (file_writer, file_guard) = tracing_appender::non_blocking(appender);
        guards.push(file_guard);
        layers.push(apply_layer_format(&log_format_file, file_writer));
    }

    tracing_subscriber::registry().with(layers).try_init()?;

    tracing::debug!(
        QRNG_LOG_FILE = env_log_file,
        QRNG_LOG_DIR = env_log_dir,
        QRNG_LOG_FORMAT_FILE = env_log_format_file,
        QRNG_LOG_FORMAT_STDERR = env_log_format_stderr,
        RUST_LOG = env::var("RUST_LOG").unwrap_or_default(),
        "Logging options configured via env vars: "
    );

    Ok(guards)
}

/// Initialize a tracing subscriber for tests. Use `RUST_LOG` to set the filter level.
///
/// If the tracing subscriber has already been initialized in a previous test, this
/// function will silently fail due to `try_init()`, which does not reinitialize
/// the subscriber if one is already set.
pub fn test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(default_env_filter())
        .with_writer(stderr)
        .try_init();
}

fn default_env_filter() -> EnvFilter {
    EnvFilter::builder().with_default_directive(LevelFilter::INFO.into()).from_env_lossy()
}

fn apply_layer_format(log_format: &LogFormat, writer: NonBlocking) -> BoxedLayer<Registry> {
    match log_format {
        LogFormat::Json => {
            fmt::layer().json().with_writer(writer).with_filter(default_env_filter()).boxed()
        }
        LogFormat::Text => fmt::layer().with_writer(writer).with_filter(default_env_filter()).boxed(),
    }
}
