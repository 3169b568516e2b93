use std::sync::Arc;
use std::time::Duration;
use steer_common::ActionResult;
use steer_drivers::{ElementResolver, MarkerPainter, PageActions, PageDriver};
use steer_planner::ActionInstruction;
use tracing::{debug, warn};

/// Routes a decoded instruction to the matching page action.
pub struct Dispatcher {
    page: Arc<dyn PageDriver>,
    actions: PageActions,
    painter: Arc<MarkerPainter>,
}

impl Dispatcher {
    pub fn new(page: Arc<dyn PageDriver>, marker_ttl: Duration, click_settle: Duration) -> Self {
        let painter = Arc::new(MarkerPainter::new(page.clone(), marker_ttl));
        let resolver = ElementResolver::new(page.clone(), painter.clone());
        let actions = PageActions::new(page.clone(), resolver, click_settle);
        Self {
            page,
            actions,
            painter,
        }
    }

    pub fn painter(&self) -> &Arc<MarkerPainter> {
        &self.painter
    }

    /// Make sure the page-side operations exist. Failures become results.
    pub async fn ensure_installed(&self) -> Result<(), ActionResult> {
        match self.page.install_actions().await {
            Ok(fresh) => {
                debug!(target: "controller.dispatch", fresh, "page actions ready");
                Ok(())
            }
            Err(e) => {
                warn!(target: "controller.dispatch", error = %e, "page action injection failed");
                Err(ActionResult::failed(format!(
                    "Failed to inject action script: {e}"
                )))
            }
        }
    }

    pub async fn dispatch(&self, instruction: &ActionInstruction) -> ActionResult {
        match instruction {
            ActionInstruction::Information { information } => ActionResult::succeeded()
                .with_gathered_info(information.clone())
                .with_info("Information processed for controller."),
            ActionInstruction::Navigate { url } => self.actions.navigate(url).await,
            ActionInstruction::Click { bbox, .. } => {
                if let Err(failed) = self.ensure_installed().await {
                    return failed;
                }
                self.actions.click(bbox).await
            }
            ActionInstruction::Fill {
                bbox, field_value, ..
            } => {
                if let Err(failed) = self.ensure_installed().await {
                    return failed;
                }
                self.actions.fill(bbox, field_value).await
            }
            ActionInstruction::Scroll { relative_amount } => {
                if let Err(failed) = self.ensure_installed().await {
                    return failed;
                }
                self.actions.scroll(*relative_amount).await
            }
            ActionInstruction::Conclude { .. } => ActionResult::failed(format!(
                "no action defined for author {}",
                instruction.author()
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use steer_common::{NormalizedBox, PixelRect, Viewport};
    use steer_drivers::testing::MemoryPage;

    fn dispatcher(page: &Arc<MemoryPage>) -> Dispatcher {
        Dispatcher::new(page.clone(), Duration::from_secs(3), Duration::from_millis(100))
    }

    #[tokio::test]
    async fn information_is_a_pass_through() {
        let page = Arc::new(MemoryPage::new(Viewport::new(800.0, 600.0)));
        let result = dispatcher(&page)
            .dispatch(&ActionInstruction::Information {
                information: "price is 42".into(),
            })
            .await;
        assert!(result.success);
        assert_eq!(result.gathered_info.as_deref(), Some("price is 42"));
        assert_eq!(page.installs(), 0);
    }

    #[tokio::test]
    async fn conclude_has_no_executor() {
        let page = Arc::new(MemoryPage::new(Viewport::new(800.0, 600.0)));
        let result = dispatcher(&page)
            .dispatch(&ActionInstruction::Conclude { message: None })
            .await;
        assert_eq!(
            result,
            ActionResult::failed("no action defined for author concluding_agent")
        );
    }

    #[tokio::test]
    async fn installation_is_idempotent_across_actions() {
        let page = Arc::new(MemoryPage::new(Viewport::new(1000.0, 1000.0)));
        page.add_element(
            "button",
            PixelRect {
                top: 100.0,
                left: 100.0,
                width: 200.0,
                height: 20.0,
            },
        );
        let d = dispatcher(&page);
        let click = ActionInstruction::Click {
            bbox: NormalizedBox::new(100.0, 100.0, 120.0, 300.0),
            item_description: None,
        };
        assert!(d.dispatch(&click).await.success);
        assert!(d.dispatch(&click).await.success);
        assert_eq!(page.installs(), 1);
        assert_eq!(page.clicked().len(), 2);
    }

    #[tokio::test]
    async fn injection_failure_becomes_a_result() {
        let page = Arc::new(MemoryPage::new(Viewport::new(800.0, 600.0)));
        page.refuse_install(true);
        let result = dispatcher(&page)
            .dispatch(&ActionInstruction::Scroll {
                relative_amount: 1.0,
            })
            .await;
        assert!(!result.success);
        assert!(result
            .error
            .unwrap()
            .starts_with("Failed to inject action script"));
        assert_eq!(page.scroll_y(), 0.0);
    }
}
