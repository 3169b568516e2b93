//! Primitive page actions.
//!
//! Every executor returns an [`ActionResult`]; driver failures are folded
//! into `success == false` and never escape as errors.
use crate::resolver::ElementResolver;
use crate::{DriverError, PageDriver};
use std::sync::Arc;
use std::time::Duration;
pub use steer_common::INVALID_SCROLL;
use steer_common::{ActionResult, NormalizedBox};
use tracing::{info, warn};

pub const NO_CLICK_TARGET: &str = "No element found at click coordinates";
pub const NO_FILL_TARGET: &str =
    "Fillable element (Input, Textarea, or contentEditable) not found for fill";

pub struct PageActions {
    page: Arc<dyn PageDriver>,
    resolver: ElementResolver,
    click_settle: Duration,
}

fn driver_failure(action: &'static str, e: DriverError) -> ActionResult {
    warn!(target: "driver.action", action, error = %e, "action failed in driver");
    ActionResult::failed(e.to_string())
}

impl PageActions {
    pub fn new(page: Arc<dyn PageDriver>, resolver: ElementResolver, click_settle: Duration) -> Self {
        Self {
            page,
            resolver,
            click_settle,
        }
    }

    pub fn resolver(&self) -> &ElementResolver {
        &self.resolver
    }

    /// Click whatever sits at the center of `bbox` once an element has been
    /// resolved there.
    pub async fn click(&self, bbox: &NormalizedBox) -> ActionResult {
        match self.try_click(bbox).await {
            Ok(result) => result,
            Err(e) => driver_failure("click", e),
        }
    }

    async fn try_click(&self, bbox: &NormalizedBox) -> Result<ActionResult, DriverError> {
        let Some(target) = self.resolver.resolve(bbox, false).await? else {
            return Ok(ActionResult::failed(NO_CLICK_TARGET));
        };
        let viewport = self.page.viewport().await?;
        let point = bbox.center(viewport);
        if !self.page.click_at(point, self.click_settle).await? {
            return Ok(ActionResult::failed(NO_CLICK_TARGET));
        }
        info!(
            target: "driver.action",
            tag = %target.tag,
            x = point.x,
            y = point.y,
            "clicked"
        );
        Ok(ActionResult::succeeded().with_info(format!("Clicked <{}>", target.tag)))
    }

    pub async fn fill(&self, bbox: &NormalizedBox, value: &str) -> ActionResult {
        match self.try_fill(bbox, value).await {
            Ok(result) => result,
            Err(e) => driver_failure("fill", e),
        }
    }

    async fn try_fill(&self, bbox: &NormalizedBox, value: &str) -> Result<ActionResult, DriverError> {
        let Some(target) = self.resolver.resolve(bbox, true).await? else {
            return Ok(ActionResult::failed(NO_FILL_TARGET));
        };
        self.page.fill(target.id, value).await?;
        info!(target: "driver.action", tag = %target.tag, chars = value.chars().count(), "filled");
        Ok(ActionResult::succeeded().with_info(format!("Filled <{}>", target.tag)))
    }

    /// Scroll by `relative_amount` viewport heights (negative scrolls up).
    pub async fn scroll(&self, relative_amount: f64) -> ActionResult {
        if !relative_amount.is_finite() {
            return ActionResult::failed(INVALID_SCROLL);
        }
        let result = async {
            let viewport = self.page.viewport().await?;
            let dy = relative_amount * viewport.height;
            self.page.scroll_by(dy).await?;
            Ok::<_, DriverError>(dy)
        }
        .await;
        match result {
            Ok(dy) => {
                info!(target: "driver.action", dy, "scrolled");
                ActionResult::succeeded().with_info(format!("Scrolled by {dy:.0}px"))
            }
            Err(e) => driver_failure("scroll", e),
        }
    }

    /// Point the active tab at `url`. Completion is left to the settle step.
    pub async fn navigate(&self, url: &str) -> ActionResult {
        let parsed = match url::Url::parse(url.trim()) {
            Ok(u) => u,
            Err(e) => {
                return driver_failure(
                    "navigate",
                    DriverError::InvalidUrl {
                        url: url.to_string(),
                        reason: e.to_string(),
                    },
                )
            }
        };
        match self.page.navigate(&parsed).await {
            Ok(()) => {
                info!(target: "driver.action", url = %parsed, "navigated");
                ActionResult::succeeded()
            }
            Err(e) => driver_failure("navigate", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::MarkerPainter;
    use crate::testing::MemoryPage;
    use steer_common::{PixelRect, Viewport};

    fn actions(page: &Arc<MemoryPage>) -> PageActions {
        let painter = Arc::new(MarkerPainter::new(page.clone(), Duration::from_secs(3)));
        let resolver = ElementResolver::new(page.clone(), painter);
        PageActions::new(page.clone(), resolver, Duration::from_millis(100))
    }

    fn rect(top: f64, left: f64, width: f64, height: f64) -> PixelRect {
        PixelRect {
            top,
            left,
            width,
            height,
        }
    }

    #[tokio::test]
    async fn click_on_matching_button_succeeds() {
        let page = Arc::new(MemoryPage::new(Viewport::new(1000.0, 1000.0)).preinstalled());
        let button = page.add_element("button", rect(100.0, 100.0, 200.0, 20.0));
        let result = actions(&page)
            .click(&NormalizedBox::new(100.0, 100.0, 120.0, 300.0))
            .await;
        assert!(result.success, "{result:?}");
        assert_eq!(page.clicked(), vec![button]);
        assert_eq!(page.markers().len(), 1);
    }

    #[tokio::test]
    async fn click_without_element_reports_and_still_marks() {
        let page = Arc::new(MemoryPage::new(Viewport::new(1000.0, 1000.0)).preinstalled());
        let result = actions(&page)
            .click(&NormalizedBox::new(100.0, 100.0, 120.0, 300.0))
            .await;
        assert_eq!(result, ActionResult::failed(NO_CLICK_TARGET));
        assert_eq!(page.markers().len(), 1);
        assert!(page.clicked().is_empty());
    }

    #[tokio::test]
    async fn fill_targets_input_and_skips_buttons() {
        let page = Arc::new(MemoryPage::new(Viewport::new(1000.0, 1000.0)).preinstalled());
        page.add_element("button", rect(100.0, 100.0, 200.0, 20.0));
        let input = page.add_element("input", rect(102.0, 102.0, 190.0, 16.0));
        let result = actions(&page)
            .fill(&NormalizedBox::new(100.0, 100.0, 120.0, 300.0), "hello")
            .await;
        assert!(result.success);
        assert_eq!(page.fills(), vec![(input, "hello".to_string())]);
    }

    #[tokio::test]
    async fn fill_without_fillable_element_fails() {
        let page = Arc::new(MemoryPage::new(Viewport::new(1000.0, 1000.0)).preinstalled());
        page.add_element("button", rect(100.0, 100.0, 200.0, 20.0));
        let result = actions(&page)
            .fill(&NormalizedBox::new(100.0, 100.0, 120.0, 300.0), "x")
            .await;
        assert_eq!(result, ActionResult::failed(NO_FILL_TARGET));
    }

    #[tokio::test]
    async fn scroll_is_relative_to_viewport_height() {
        let page = Arc::new(MemoryPage::new(Viewport::new(1000.0, 800.0)).preinstalled());
        let acts = actions(&page);
        assert!(acts.scroll(0.5).await.success);
        assert!(acts.scroll(-0.25).await.success);
        assert_eq!(page.scroll_y(), 200.0);
    }

    #[tokio::test]
    async fn non_finite_scroll_has_no_effect() {
        let page = Arc::new(MemoryPage::new(Viewport::new(1000.0, 800.0)).preinstalled());
        let result = actions(&page).scroll(f64::NAN).await;
        assert_eq!(result, ActionResult::failed(INVALID_SCROLL));
        assert_eq!(page.scroll_y(), 0.0);
    }

    #[tokio::test]
    async fn navigate_rejects_invalid_urls() {
        let page = Arc::new(MemoryPage::new(Viewport::new(1000.0, 800.0)).preinstalled());
        let acts = actions(&page);
        assert!(!acts.navigate("not a url").await.success);
        assert!(acts.navigate("https://example.com/a").await.success);
        assert_eq!(page.navigations(), vec!["https://example.com/a".to_string()]);
    }
}
