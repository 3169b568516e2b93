//! Chat front door.
//!
//! Free-form messages go to the planner's chat app together with a
//! screenshot. Its reply either answers directly, points at something on the
//! page, or hands over a [`TaskPlan`] that starts a controller run.
use crate::controller::{Controller, RunOutcome};
use crate::operator::{InputGate, Notice};
use std::sync::Arc;
use steer_common::NormalizedBox;
use steer_drivers::PageDriver;
use steer_planner::protocol::Part;
use steer_planner::{Author, Planner, TaskPlan};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What came of one chat message.
#[derive(Debug)]
pub enum Reply {
    /// Input was locked or empty.
    Ignored,
    Answered(String),
    Shown(NormalizedBox),
    Ran(RunOutcome),
    Failed(String),
}

pub struct Assistant {
    planner: Arc<dyn Planner>,
    page: Arc<dyn PageDriver>,
    gate: Arc<InputGate>,
    controller: Controller,
    chat_app: String,
}

impl Assistant {
    pub fn new(
        planner: Arc<dyn Planner>,
        page: Arc<dyn PageDriver>,
        gate: Arc<InputGate>,
        controller: Controller,
        chat_app: impl Into<String>,
    ) -> Self {
        Self {
            planner,
            page,
            gate,
            controller,
            chat_app: chat_app.into(),
        }
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    fn say(&self, kind: Notice, text: &str) {
        self.gate.operator().notify(kind, text);
    }

    fn fail(&self, text: String) -> Reply {
        self.say(Notice::Warning, &text);
        Reply::Failed(text)
    }

    pub async fn handle_message(&mut self, text: &str, cancel: &CancellationToken) -> Reply {
        if self.gate.is_locked() {
            warn!(target: "assistant", "input ignored while automation is active");
            return Reply::Ignored;
        }
        let text = text.trim();
        if text.is_empty() {
            return Reply::Ignored;
        }

        let mut parts = vec![Part::text(text)];
        if let Some(image) = self.page.screenshot().await {
            parts.push(Part::image(image));
        }

        let events = match self.planner.run(&self.chat_app, parts).await {
            Ok(events) => events,
            Err(e) => return self.fail(format!("Critical error: Initial chat request failed: {e}")),
        };
        let Some(last) = events.last() else {
            return self.fail("(No response or unexpected format from initial chat)".into());
        };
        let Some(tag) = last.author.as_deref().filter(|_| last.content.is_some()) else {
            return self.fail("(Invalid event structure from initial chat)".into());
        };
        let primary = last.primary_text();
        debug!(target: "assistant", author = tag, has_text = primary.is_some(), "chat reply");

        match tag.parse::<Author>() {
            Ok(Author::PerformAction) => {
                let plan = match TaskPlan::from_event_text(primary) {
                    Ok(plan) => plan,
                    Err(e) => return self.fail(format!("Error starting automation: {e}")),
                };
                info!(target: "assistant", goal = %plan.goal_summary, "handing over to controller");
                self.say(Notice::Info, "Automation starting... I'll take it from here.");
                Reply::Ran(self.controller.run(&plan, cancel).await)
            }
            Ok(Author::ShowElement) => {
                let Some(raw) = primary else {
                    return self.fail("Error: Bounding box event missing data.".into());
                };
                let bbox = match serde_json::from_str::<NormalizedBox>(raw) {
                    Ok(b) if b.is_finite() => b,
                    _ => return self.fail("Error: Invalid bounding box data received.".into()),
                };
                if let Err(e) = self.page.install_actions().await {
                    return self.fail(format!("Error processing bounding box: {e}"));
                }
                if let Err(e) = self.controller.dispatcher().painter().draw(&bbox).await {
                    return self.fail(format!("Error processing bounding box: {e}"));
                }
                self.say(Notice::Info, "Shown on page.");
                Reply::Shown(bbox)
            }
            _ => {
                let reply = match last.embedded_error() {
                    Some(err) => format!("Error: {err}"),
                    None => primary.unwrap_or("(No text in response)").to_string(),
                };
                self.say(Notice::Info, &reply);
                Reply::Answered(reply)
            }
        }
    }
}
