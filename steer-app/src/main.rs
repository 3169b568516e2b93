use anyhow::Result;
use clap::Parser;
use cli::Cli;
use std::path::Path;
use std::time::Duration;
use steer_common::observability::{LogConfig, LogFormat, init_logging};
use steer_config::{SteerConfig, SteerConfigLoader, default_config_path};
use steer_runtime::SteerRuntime;

mod cli;
mod console;
mod session;

fn load_config(explicit: Option<&Path>) -> Result<SteerConfig> {
    // Later sources win; STEER__* env overrides are applied on top by the loader.
    let mut loader = SteerConfigLoader::new();
    if let Some(path) = default_config_path() {
        loader = loader.with_optional_file(path);
    }
    loader = loader.with_optional_file("steer.yaml");
    if let Some(path) = explicit {
        loader = loader.with_file(path);
    }
    Ok(loader.load()?)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = load_config(cli.config.as_deref())?;

    let log_path = init_logging(LogConfig {
        app_name: "steer",
        log_dir: cfg.logging.dir.clone(),
        emit_stderr: cfg.logging.stderr,
        format: LogFormat::from_name(&cfg.logging.format),
        default_filter: cfg.logging.filter.clone(),
    })?;
    tracing::info!(target: "app", log = %log_path.display(), "steer starting");

    let runtime = SteerRuntime::build("steer-worker", None)?;
    let handle = runtime.handle();
    handle.cancel_on_ctrl_c();

    let result = runtime.block_on(session::execute(cli.command, cfg, handle.cancellation()));
    runtime.shutdown(Duration::from_secs(2));
    result
}
