//! Wires the browser, the planner, and the controller for one CLI invocation.
use crate::cli::Command;
use crate::console::ConsoleOperator;
use anyhow::{Context, Result, bail};
use std::sync::Arc;
use steer_config::SteerConfig;
use steer_controller::{Assistant, Controller, ControllerSettings, InputGate, Reply, RunOutcome};
use steer_drivers::PageDriver;
use steer_drivers::browser::driver::SteerDriver;
use steer_drivers::settle::{Readiness, SettlePolicy, settle};
use steer_planner::adk::AdkPlanner;
use steer_planner::{Planner, TaskPlan};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub async fn execute(command: Command, cfg: SteerConfig, cancel: CancellationToken) -> Result<()> {
    let driver = SteerDriver::connect(&cfg.browser)
        .await
        .with_context(|| format!("connecting to WebDriver at {}", cfg.browser.webdriver_url))?;
    let page: Arc<dyn PageDriver> = Arc::new(driver.page());

    let result = drive(command, &cfg, page, &cancel).await;

    if let Err(e) = driver.close().await {
        warn!(target: "app", error = %e, "closing browser session failed");
    }
    result
}

async fn drive(
    command: Command,
    cfg: &SteerConfig,
    page: Arc<dyn PageDriver>,
    cancel: &CancellationToken,
) -> Result<()> {
    if let Some(start) = cfg.browser.start_url.as_deref() {
        let url = url::Url::parse(start).with_context(|| format!("invalid start_url {start}"))?;
        page.navigate(&url).await?;
        if settle(page.as_ref(), SettlePolicy::from_config(&cfg.controller)).await
            == Readiness::TimedOut
        {
            warn!(target: "app", url = %url, "start page did not finish loading");
        }
    }

    let planner: Arc<dyn Planner> = Arc::new(AdkPlanner::from_config(&cfg.planner)?);
    let gate = InputGate::new(Arc::new(ConsoleOperator));
    let mut controller = Controller::new(
        planner.clone(),
        page.clone(),
        gate.clone(),
        ControllerSettings::from_config(&cfg.planner, &cfg.controller),
    );

    match command {
        Command::Run { goal } => {
            let plan = plan_from_text(&goal.join(" "));
            match controller.run(&plan, cancel).await {
                RunOutcome::Concluded { .. } => Ok(()),
                RunOutcome::Failed(e) => Err(e.into()),
            }
        }
        Command::Chat { message } => {
            let mut assistant =
                Assistant::new(planner, page, gate, controller, cfg.planner.chat_app.clone());
            if !message.is_empty() {
                return finish(assistant.handle_message(&message.join(" "), cancel).await);
            }
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                let line = tokio::select! {
                    _ = cancel.cancelled() => break,
                    line = lines.next_line() => line?,
                };
                let Some(line) = line else { break };
                if let Err(e) = finish(assistant.handle_message(&line, cancel).await) {
                    warn!(target: "app", error = %e, "message failed");
                }
            }
            info!(target: "app", "chat closed");
            Ok(())
        }
    }
}

fn finish(reply: Reply) -> Result<()> {
    match reply {
        Reply::Failed(message) => bail!(message),
        Reply::Ran(RunOutcome::Failed(e)) => Err(e.into()),
        _ => Ok(()),
    }
}

/// A plan JSON object passes through; anything else becomes the goal of a
/// minimal plan.
fn plan_from_text(text: &str) -> TaskPlan {
    TaskPlan::from_event_text(Some(text)).unwrap_or_else(|_| TaskPlan {
        goal_summary: text.trim().to_string(),
        successful_end_state: "The goal above is accomplished on the current page.".into(),
        proposed_action_plan: "Work out the steps from the current page state.".into(),
    })
}
