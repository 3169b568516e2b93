//! Process-wide `tracing` setup.
//!
//! Every binary and integration test funnels through [`init_logging`], which
//! installs a daily-rolling file sink (plus an optional stderr copy). The
//! first call wins; later calls return the path chosen by the first.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Context;
use chrono::Local;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, registry::Registry, EnvFilter};

static SINK_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static ACTIVE_LOG: OnceLock<PathBuf> = OnceLock::new();

const LOG_DIR_ENV: &str = "STEER_LOG_DIR";

/// Transport and WebDriver crates are chatty at debug; keep them quiet unless
/// `RUST_LOG` asks otherwise.
const QUIET_DEPENDENCIES: &[&str] = &["hyper=warn", "hyper_util=warn", "reqwest=warn", "fantoccini=info"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// Anything but `json` (any case) is text.
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Used for the log file name and the fallback directory.
    pub app_name: &'static str,
    /// Explicit log directory; otherwise `STEER_LOG_DIR`, then
    /// `~/.local/share/<app_name>`.
    pub log_dir: Option<PathBuf>,
    /// Mirror events to stderr.
    pub emit_stderr: bool,
    pub format: LogFormat,
    /// Filter used when `RUST_LOG` is unset.
    pub default_filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            app_name: "steer",
            log_dir: None,
            emit_stderr: false,
            format: LogFormat::Text,
            default_filter: "info".to_string(),
        }
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn sink_layer<W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Text => fmt::layer().with_writer(writer).with_ansi(ansi).boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
    }
}

fn build_filter(default_filter: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let mut directives = default_filter.to_string();
    for quiet in QUIET_DEPENDENCIES {
        let krate = quiet.split('=').next().unwrap_or_default();
        if !default_filter.contains(krate) {
            directives.push(',');
            directives.push_str(quiet);
        }
    }
    EnvFilter::new(directives)
}

/// Install the global subscriber and return today's log file path.
pub fn init_logging(config: LogConfig) -> anyhow::Result<PathBuf> {
    if let Some(path) = ACTIVE_LOG.get() {
        return Ok(path.clone());
    }

    let dir = resolve_log_dir(config.app_name, config.log_dir.as_deref());
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create log directory: {}", dir.display()))?;

    let file_name = format!("{}.log", config.app_name);
    let today = Local::now().format("%Y-%m-%d");
    let active = dir.join(format!("{file_name}.{today}"));

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(&dir, &file_name));
    let _ = SINK_GUARD.set(guard);

    let mut layers = vec![sink_layer(config.format, writer, false)];
    if config.emit_stderr {
        layers.push(sink_layer(config.format, std::io::stderr, true));
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(build_filter(&config.default_filter))
        .try_init()
        .map_err(|e| anyhow::anyhow!("tracing setup failed: {e}"))?;

    let _ = ACTIVE_LOG.set(active.clone());
    Ok(active)
}

fn resolve_log_dir(app_name: &str, explicit: Option<&Path>) -> PathBuf {
    let configured = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(LOG_DIR_ENV).map(PathBuf::from));
    match configured {
        Some(dir) => expand_home(&dir),
        None => home_dir()
            .map(|home| home.join(".local").join("share").join(app_name))
            .unwrap_or_else(|| PathBuf::from(".").join(app_name)),
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_dir_wins_over_environment() {
        let dir = resolve_log_dir("steer", Some(Path::new("/tmp/steer-logs")));
        assert_eq!(dir, PathBuf::from("/tmp/steer-logs"));
    }

    #[test]
    fn tilde_expands_to_home() {
        if let Some(home) = home_dir() {
            assert_eq!(expand_home(Path::new("~/logs")), home.join("logs"));
        }
        assert_eq!(expand_home(Path::new("/var/log")), PathBuf::from("/var/log"));
    }

    #[test]
    fn format_names_are_case_insensitive() {
        assert_eq!(LogFormat::from_name(" JSON "), LogFormat::Json);
        assert_eq!(LogFormat::from_name("pretty"), LogFormat::Text);
    }
}
