//! Post-action settling: a fixed delay, then poll `document.readyState`.
use crate::PageDriver;
use std::time::Duration;
use steer_config::ControllerSection;
use tokio::time::{sleep, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlePolicy {
    pub delay: Duration,
    pub ready_timeout: Duration,
    pub poll: Duration,
}

impl SettlePolicy {
    pub fn from_config(c: &ControllerSection) -> Self {
        Self {
            delay: c.settle(),
            ready_timeout: c.ready_timeout(),
            poll: c.ready_poll(),
        }
    }
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self::from_config(&ControllerSection::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    TimedOut,
}

/// Wait for the page to settle. Never fails: readiness errors (for example
/// mid-navigation) count as "not ready yet".
pub async fn settle(page: &dyn PageDriver, policy: SettlePolicy) -> Readiness {
    sleep(policy.delay).await;

    let deadline = Instant::now() + policy.ready_timeout;
    loop {
        match page.ready_state().await {
            Ok(state) if state == "complete" => return Readiness::Ready,
            Ok(state) => debug!(target: "driver.settle", %state, "page not ready"),
            Err(e) => debug!(target: "driver.settle", error = %e, "readiness probe failed"),
        }
        if Instant::now() >= deadline {
            debug!(target: "driver.settle", "readiness wait timed out");
            return Readiness::TimedOut;
        }
        sleep(policy.poll).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryPage;
    use steer_common::Viewport;

    fn policy() -> SettlePolicy {
        SettlePolicy {
            delay: Duration::from_millis(1000),
            ready_timeout: Duration::from_millis(500),
            poll: Duration::from_millis(100),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn waits_fixed_delay_then_sees_complete() {
        let page = MemoryPage::new(Viewport::new(800.0, 600.0));
        let start = Instant::now();
        assert_eq!(settle(&page, policy()).await, Readiness::Ready);
        assert_eq!(start.elapsed(), Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn polls_until_complete() {
        let page = MemoryPage::new(Viewport::new(800.0, 600.0));
        page.queue_ready_states(["loading", "interactive"]);
        let start = Instant::now();
        assert_eq!(settle(&page, policy()).await, Readiness::Ready);
        assert_eq!(start.elapsed(), Duration::from_millis(1200));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_timeout() {
        let page = MemoryPage::new(Viewport::new(800.0, 600.0));
        page.set_ready_state("loading");
        assert_eq!(settle(&page, policy()).await, Readiness::TimedOut);
    }
}
