//! Planner-driven browser control.
//!
//! - [`assistant::Assistant`]: chat entry point, hands plans to the controller
//! - [`controller::Controller`]: the step loop and its state machine
//! - [`dispatcher::Dispatcher`]: instruction to page action
//! - [`report::Observation`]: what the planner sees after each step
//! - [`operator`]: user-facing notices and the input lock
pub mod assistant;
pub mod controller;
pub mod dispatcher;
pub mod operator;
pub mod report;

pub use assistant::{Assistant, Reply};
pub use controller::{Controller, ControllerSettings, ControllerState, RunError, RunOutcome};
pub use dispatcher::Dispatcher;
pub use operator::{InputGate, InputLock, Notice, Operator};
pub use report::Observation;
