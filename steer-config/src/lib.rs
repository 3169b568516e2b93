//! Loader for steer configuration with YAML + environment overlays.
//!
//! Sources are merged in this order, later ones winning:
//!
//! 1. files added with [`SteerConfigLoader::with_file`] / [`SteerConfigLoader::with_optional_file`]
//! 2. inline YAML added with [`SteerConfigLoader::with_yaml_str`]
//! 3. `STEER`-prefixed environment variables, `__` separating path segments
//!    (`STEER__PLANNER__BASE_URL=http://planner:8000`)
//!
//! String values may reference other environment variables as `$VAR` or
//! `${VAR}`; references are expanded recursively (bounded) after merging.
//! Every section and field has a default, so an empty document is valid.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SteerConfig {
    pub planner: PlannerSection,
    pub browser: BrowserSection,
    pub controller: ControllerSection,
    pub logging: LoggingSection,
}

/// Where the remote planner lives and which session identity to use.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlannerSection {
    pub base_url: String,
    /// App answering free-form chat messages (may emit `perform_action`).
    pub chat_app: String,
    /// App driving the step-by-step controller session.
    pub controller_app: String,
    pub user_id: String,
    pub session_id: String,
    pub timeout_secs: u64,
    /// Sent as a bearer token when the planner sits behind a gateway.
    pub api_token: Option<String>,
}

impl Default for PlannerSection {
    fn default() -> Self {
        Self {
            base_url: "http://0.0.0.0:8000".into(),
            chat_app: "browser_chat".into(),
            controller_app: "browser_controller".into(),
            user_id: "u_123".into(),
            session_id: "s_123".into(),
            timeout_secs: 120,
            api_token: None,
        }
    }
}

impl PlannerSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserSection {
    pub webdriver_url: String,
    pub headless: bool,
    /// `[width, height]` of the browser window.
    pub window_size: Option<(u32, u32)>,
    /// Page opened right after the session starts.
    pub start_url: Option<String>,
}

impl Default for BrowserSection {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".into(),
            headless: false,
            window_size: None,
            start_url: None,
        }
    }
}

/// Timings and limits of the controller loop, all in milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControllerSection {
    pub settle_ms: u64,
    pub session_reset_delay_ms: u64,
    pub ready_timeout_ms: u64,
    pub ready_poll_ms: u64,
    pub click_settle_ms: u64,
    pub marker_ttl_ms: u64,
    pub max_steps: Option<u32>,
}

impl Default for ControllerSection {
    fn default() -> Self {
        Self {
            settle_ms: 1000,
            session_reset_delay_ms: 400,
            ready_timeout_ms: 5000,
            ready_poll_ms: 100,
            click_settle_ms: 100,
            marker_ttl_ms: 3000,
            max_steps: Some(50),
        }
    }
}

impl ControllerSection {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
    pub fn session_reset_delay(&self) -> Duration {
        Duration::from_millis(self.session_reset_delay_ms)
    }
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }
    pub fn ready_poll(&self) -> Duration {
        Duration::from_millis(self.ready_poll_ms)
    }
    pub fn click_settle(&self) -> Duration {
        Duration::from_millis(self.click_settle_ms)
    }
    pub fn marker_ttl(&self) -> Duration {
        Duration::from_millis(self.marker_ttl_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub dir: Option<PathBuf>,
    /// `text` or `json`.
    pub format: String,
    pub stderr: bool,
    pub filter: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            dir: None,
            format: "text".into(),
            stderr: false,
            filter: "info".into(),
        }
    }
}

/// `~/.config/steer/steer.yaml` (platform equivalent), if a config dir exists.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("steer").join("steer.yaml"))
}

/// Expand `$VAR` / `${VAR}` in a string until it stops changing or the depth
/// cap is hit; unknown variables stay as written.
fn expand_str(raw: &str) -> String {
    let mut current = raw.to_string();
    for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
        let Ok(next) = shellexpand::env(&current) else {
            break;
        };
        if next == current {
            break;
        }
        current = next.into_owned();
    }
    current
}

fn expand_placeholders(v: &mut Value) {
    match v {
        Value::String(s) if s.contains('$') => *s = expand_str(s),
        Value::Array(items) => items.iter_mut().for_each(expand_placeholders),
        Value::Object(map) => map.values_mut().for_each(expand_placeholders),
        _ => {}
    }
}

/// Builder hiding the `config` crate wiring (YAML + env overrides).
pub struct SteerConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for SteerConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SteerConfigLoader {
    /// Start from defaults; `STEER__*` environment overrides are applied last.
    ///
    /// ```
    /// use steer_config::SteerConfigLoader;
    ///
    /// let config = SteerConfigLoader::new().load().expect("defaults load");
    /// assert_eq!(config.planner.controller_app, "browser_controller");
    /// assert_eq!(config.controller.settle_ms, 1000);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a required YAML/TOML/JSON file; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is silently skipped when missing.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet.
    ///
    /// ```
    /// use steer_config::SteerConfigLoader;
    ///
    /// let cfg = SteerConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// planner:
    ///   base_url: "http://planner.internal:8000"
    /// controller:
    ///   max_steps: 12
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.planner.base_url, "http://planner.internal:8000");
    /// assert_eq!(cfg.planner.user_id, "u_123");
    /// assert_eq!(cfg.controller.max_steps, Some(12));
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into [`SteerConfig`].
    pub fn load(self) -> Result<SteerConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix("STEER")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let mut tree: Value = cfg.try_deserialize()?;
        expand_placeholders(&mut tree);
        serde_json::from_value(tree).map_err(|e| ConfigError::Message(e.to_string()))
    }
}
