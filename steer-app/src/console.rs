use steer_controller::{Notice, Operator};
use tracing::debug;

/// Prints operator notices to stdout.
#[derive(Debug, Default)]
pub struct ConsoleOperator;

impl Operator for ConsoleOperator {
    fn notify(&self, kind: Notice, text: &str) {
        let tag = match kind {
            Notice::Info => "info",
            Notice::Warning => "warn",
            Notice::Success => "done",
        };
        println!("[{tag}] {text}");
    }

    fn set_input_enabled(&self, enabled: bool) {
        debug!(target: "app.console", enabled, "input toggled");
    }
}
