//! The controller loop.
//!
//! One run is a strict request/response chain with the planner's controller
//! app: send the plan and a screenshot, receive an instruction, execute it,
//! settle, report with a fresh screenshot, and repeat until the planner
//! concludes or something fatal happens.
use crate::dispatcher::Dispatcher;
use crate::operator::{InputGate, Notice};
use crate::report::{preview, Observation, SCREENSHOT_MISSING};
use std::sync::Arc;
use std::time::Duration;
use steer_common::ActionResult;
use steer_config::{ControllerSection, PlannerSection};
use steer_drivers::settle::{settle, SettlePolicy};
use steer_drivers::PageDriver;
use steer_planner::protocol::{Event, Part};
use steer_planner::{
    ActionInstruction, InstructionError, Planner, PlannerError, TaskPlan, Turn,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Starting,
    Stepping { step: u32 },
    Concluded,
    Failed,
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("setup failed: {0}")]
    Setup(String),
    #[error("transport failure: {0}")]
    Transport(#[from] PlannerError),
    #[error("protocol violation: {0}")]
    Protocol(InstructionError),
    #[error("planner reported an error: {0}")]
    PlannerReported(String),
    #[error("step limit of {0} actions reached")]
    StepLimit(u32),
    #[error("cancelled")]
    Cancelled,
}

impl RunError {
    /// The warning shown to the operator when a run ends with this error.
    pub fn operator_message(&self) -> String {
        match self {
            RunError::Setup(m) => format!("Error starting automation: {m}"),
            RunError::Transport(PlannerError::Status { status, body }) => {
                format!("Error from controller ({status}): {body}. Stopping.")
            }
            RunError::Transport(PlannerError::EmptyResponse) => {
                "Empty or invalid response from controller. Stopping.".into()
            }
            RunError::Transport(e) => format!("Network error with controller: {e}. Stopping."),
            RunError::PlannerReported(e) => format!("Controller returned error: {e}. Stopping."),
            RunError::Protocol(InstructionError::UnknownAuthor(a)) => {
                format!("Received unexpected event author '{a}' from controller. Stopping.")
            }
            RunError::Protocol(InstructionError::Unexpected(a)) => {
                format!("Received unexpected event author '{a}' from controller. Stopping.")
            }
            RunError::Protocol(e) => format!("{e}. Stopping."),
            RunError::StepLimit(n) => format!("Reached the limit of {n} actions. Stopping."),
            RunError::Cancelled => "Automation cancelled. Stopping.".into(),
        }
    }
}

impl From<InstructionError> for RunError {
    fn from(e: InstructionError) -> Self {
        match e {
            InstructionError::PlannerReported(m) => RunError::PlannerReported(m),
            InstructionError::EmptyResponse => RunError::Transport(PlannerError::EmptyResponse),
            other => RunError::Protocol(other),
        }
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    Concluded { message: Option<String>, steps: u32 },
    Failed(RunError),
}

impl RunOutcome {
    pub fn is_concluded(&self) -> bool {
        matches!(self, RunOutcome::Concluded { .. })
    }
}

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    /// Planner app driving the loop.
    pub app: String,
    pub session_reset_delay: Duration,
    pub settle: SettlePolicy,
    pub click_settle: Duration,
    pub marker_ttl: Duration,
    pub max_steps: Option<u32>,
}

impl ControllerSettings {
    pub fn from_config(planner: &PlannerSection, controller: &ControllerSection) -> Self {
        Self {
            app: planner.controller_app.clone(),
            session_reset_delay: controller.session_reset_delay(),
            settle: SettlePolicy::from_config(controller),
            click_settle: controller.click_settle(),
            marker_ttl: controller.marker_ttl(),
            max_steps: controller.max_steps,
        }
    }
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from_config(&PlannerSection::default(), &ControllerSection::default())
    }
}

pub struct Controller {
    planner: Arc<dyn Planner>,
    page: Arc<dyn PageDriver>,
    dispatcher: Dispatcher,
    gate: Arc<InputGate>,
    settings: ControllerSettings,
    state: ControllerState,
}

impl Controller {
    pub fn new(
        planner: Arc<dyn Planner>,
        page: Arc<dyn PageDriver>,
        gate: Arc<InputGate>,
        settings: ControllerSettings,
    ) -> Self {
        let dispatcher = Dispatcher::new(page.clone(), settings.marker_ttl, settings.click_settle);
        Self {
            planner,
            page,
            dispatcher,
            gate,
            settings,
            state: ControllerState::Idle,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    fn notify(&self, kind: Notice, text: &str) {
        self.gate.operator().notify(kind, text);
    }

    /// Drive one automation run for `plan` to a terminal state.
    ///
    /// Input stays disabled for the whole run and is re-enabled on every
    /// exit path.
    pub async fn run(&mut self, plan: &TaskPlan, cancel: &CancellationToken) -> RunOutcome {
        let Some(_lock) = self.gate.try_lock() else {
            return RunOutcome::Failed(RunError::Setup("another run is already active".into()));
        };

        self.state = ControllerState::Starting;
        info!(target: "controller.run", app = %self.settings.app, goal = %plan.goal_summary, "run starting");

        let outcome = match self.drive(plan, cancel).await {
            Ok((message, steps)) => RunOutcome::Concluded { message, steps },
            Err(e) => RunOutcome::Failed(e),
        };

        match &outcome {
            RunOutcome::Concluded { message, steps } => {
                self.state = ControllerState::Concluded;
                info!(target: "controller.run", steps, "run concluded");
                self.notify(
                    Notice::Success,
                    &format!(
                        "Automation finished: {}",
                        message.as_deref().unwrap_or("(No concluding message provided)")
                    ),
                );
            }
            RunOutcome::Failed(e) => {
                self.state = ControllerState::Failed;
                warn!(target: "controller.run", error = %e, "run failed");
                self.notify(Notice::Warning, &e.operator_message());
            }
        }
        outcome
    }

    async fn drive(
        &mut self,
        plan: &TaskPlan,
        cancel: &CancellationToken,
    ) -> Result<(Option<String>, u32), RunError> {
        let mut events = self.start(plan, cancel).await?;
        let mut step: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(RunError::Cancelled);
            }

            let turn = Turn::from_events(&events)?;
            let decoded = match turn.instruction() {
                Ok(ActionInstruction::Conclude { message }) => return Ok((message, step)),
                Ok(instruction) => Ok(instruction),
                Err(e) if !e.is_fatal() => Err(e),
                Err(e) => return Err(e.into()),
            };

            step += 1;
            if let Some(max) = self.settings.max_steps {
                if step > max {
                    return Err(RunError::StepLimit(max));
                }
            }
            self.state = ControllerState::Stepping { step };

            let result = match decoded {
                Ok(instruction) => self.execute(&instruction).await,
                Err(e) => ActionResult::failed(e.to_string()),
            };
            debug!(
                target: "controller.step",
                step,
                author = %turn.author,
                success = result.success,
                error = result.error.as_deref().unwrap_or(""),
                "action attempted"
            );
            if !result.success {
                self.notify(
                    Notice::Warning,
                    &format!(
                        "Action {} failed: {}. Reporting to controller.",
                        turn.author.action_name(),
                        result.error.as_deref().unwrap_or("Unknown reason")
                    ),
                );
            }

            self.wait(settle(self.page.as_ref(), self.settings.settle), cancel)
                .await?;
            let screenshot = self.page.screenshot().await;
            let observation = Observation::compose(turn.author, &result, screenshot);
            events = self.exchange(observation.into_parts(), cancel).await?;
        }
    }

    /// Reset the controller session and send the plan with a first screenshot.
    async fn start(
        &self,
        plan: &TaskPlan,
        cancel: &CancellationToken,
    ) -> Result<Vec<Event>, RunError> {
        let app = self.settings.app.clone();
        if let Err(e) = self.wait(self.planner.reset_session(&app), cancel).await? {
            debug!(target: "controller.session", error = %e, "session delete failed; continuing");
        }
        self.wait(tokio::time::sleep(self.settings.session_reset_delay), cancel)
            .await?;
        self.wait(self.planner.create_session(&app), cancel)
            .await?
            .map_err(|e| RunError::Setup(format!("Could not start controller session ({e})")))?;

        let mut text = plan.to_message_text();
        let screenshot = self.page.screenshot().await;
        if screenshot.is_none() {
            text.push_str(SCREENSHOT_MISSING);
        }
        let mut parts = vec![Part::text(text)];
        parts.extend(screenshot.map(Part::image));
        self.exchange(parts, cancel).await
    }

    async fn execute(&self, instruction: &ActionInstruction) -> ActionResult {
        match instruction {
            ActionInstruction::Information { information } => {
                let result = self.dispatcher.dispatch(instruction).await;
                self.notify(
                    Notice::Info,
                    &format!("Info gathered: {}", preview(information, 100)),
                );
                result
            }
            other => {
                let name = other.author().action_name();
                let performing = match other {
                    ActionInstruction::Click {
                        item_description: Some(d),
                        ..
                    } => format!("Performing: {name} ({d})..."),
                    ActionInstruction::Fill {
                        field_name: Some(f),
                        ..
                    } => format!("Performing: {name} ({f})..."),
                    _ => format!("Performing: {name}..."),
                };
                self.notify(Notice::Info, &performing);
                self.dispatcher.dispatch(other).await
            }
        }
    }

    async fn exchange(
        &self,
        parts: Vec<Part>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Event>, RunError> {
        Ok(self
            .wait(self.planner.run(&self.settings.app, parts), cancel)
            .await??)
    }

    /// Race `fut` against cancellation.
    async fn wait<F: std::future::Future>(
        &self,
        fut: F,
        cancel: &CancellationToken,
    ) -> Result<F::Output, RunError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RunError::Cancelled),
            out = fut => Ok(out),
        }
    }
}

