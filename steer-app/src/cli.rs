use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Drive a browser with a remote planner.
#[derive(Debug, Parser)]
#[command(name = "steer", version, about)]
pub struct Cli {
    /// YAML config file; merged over `steer.yaml` and the user config.
    #[arg(long, short, env = "STEER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Talk to the assistant. Without a message, reads one message per line from stdin.
    Chat { message: Vec<String> },
    /// Start an automation run directly from a goal or a task plan JSON object.
    Run {
        #[arg(required = true)]
        goal: Vec<String>,
    },
}
