//! Maps a normalized box onto the best matching rendered element.
//!
//! Matching is tolerant on purpose: the page may have reflowed since the
//! screenshot the planner looked at, so the box is projected onto the
//! *current* viewport and candidates only need to sit roughly inside it.
use crate::marker::MarkerPainter;
use crate::{DriverError, ElementSnapshot, PageDriver};
use std::sync::Arc;
use steer_common::{NormalizedBox, Viewport};
use tracing::{debug, warn};

/// Containment slack: top/left may shrink and bottom/right may grow by this factor.
pub const CONTAINMENT_TOLERANCE: f64 = 4.0;

const NON_RENDERED_TAGS: [&str; 5] = ["script", "style", "noscript", "link", "meta"];

fn is_candidate(el: &ElementSnapshot) -> bool {
    if NON_RENDERED_TAGS.contains(&el.tag.as_str()) {
        return false;
    }
    if el.rect.width <= 0.0 || el.rect.height <= 0.0 {
        return false;
    }
    if el.display == "none" || el.visibility == "hidden" {
        return false;
    }
    !matches!(el.opacity.trim().parse::<f64>(), Ok(o) if o == 0.0)
}

/// Pick the element whose center is closest to the center of `bbox`.
///
/// Candidates must be rendered and visible, fillable when `fillable_only`,
/// and loosely contained in the projected box. Ties keep the earliest
/// element in document order.
pub fn select_element<'a>(
    bbox: &NormalizedBox,
    viewport: Viewport,
    elements: &'a [ElementSnapshot],
    fillable_only: bool,
) -> Option<&'a ElementSnapshot> {
    if viewport.is_degenerate() || !bbox.is_finite() {
        return None;
    }
    let target = bbox.edges(viewport);
    let center = bbox.center(viewport);

    let mut best: Option<(&ElementSnapshot, f64)> = None;
    for el in elements {
        if !is_candidate(el) || (fillable_only && !el.is_fillable()) {
            continue;
        }
        if !target.loosely_contains(&el.rect, CONTAINMENT_TOLERANCE) {
            continue;
        }
        let distance = el.rect.center().distance_to(center);
        match best {
            Some((_, d)) if distance >= d => {}
            _ => best = Some((el, distance)),
        }
    }
    best.map(|(el, _)| el)
}

pub struct ElementResolver {
    page: Arc<dyn PageDriver>,
    painter: Arc<MarkerPainter>,
}

impl ElementResolver {
    pub fn new(page: Arc<dyn PageDriver>, painter: Arc<MarkerPainter>) -> Self {
        Self { page, painter }
    }

    pub fn painter(&self) -> &Arc<MarkerPainter> {
        &self.painter
    }

    /// Highlight `bbox` and find the element it most likely designates.
    ///
    /// The marker is drawn at the requested box whether or not anything
    /// matches. `Ok(None)` is an ordinary outcome.
    pub async fn resolve(
        &self,
        bbox: &NormalizedBox,
        fillable_only: bool,
    ) -> Result<Option<ElementSnapshot>, DriverError> {
        if let Err(e) = self.painter.draw(bbox).await {
            warn!(target: "driver.resolver", error = %e, "could not draw marker");
        }

        let viewport = self.page.viewport().await?;
        let elements = self.page.elements().await?;
        let found = select_element(bbox, viewport, &elements, fillable_only).cloned();

        debug!(
            target: "driver.resolver",
            fillable_only,
            scanned = elements.len(),
            found = ?found.as_ref().map(|el| (el.id, el.tag.as_str())),
            "element resolution"
        );
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use steer_common::PixelRect;

    fn el(id: usize, tag: &str, top: f64, left: f64, width: f64, height: f64) -> ElementSnapshot {
        ElementSnapshot {
            id,
            tag: tag.into(),
            rect: PixelRect {
                top,
                left,
                width,
                height,
            },
            display: "block".into(),
            visibility: "visible".into(),
            opacity: "1".into(),
            content_editable: false,
        }
    }

    const VP: Viewport = Viewport {
        width: 1000.0,
        height: 1000.0,
    };

    #[test]
    fn exact_rect_match_resolves() {
        let elements = vec![el(0, "body", 0.0, 0.0, 1000.0, 1000.0), el(1, "button", 100.0, 100.0, 200.0, 20.0)];
        let bbox = NormalizedBox::new(100.0, 100.0, 120.0, 300.0);
        assert_eq!(select_element(&bbox, VP, &elements, false).map(|e| e.id), Some(1));
    }

    #[test]
    fn fillable_only_rejects_non_fillable_match() {
        let elements = vec![el(0, "button", 100.0, 100.0, 200.0, 20.0)];
        let bbox = NormalizedBox::new(100.0, 100.0, 120.0, 300.0);
        assert!(select_element(&bbox, VP, &elements, true).is_none());
    }

    #[test]
    fn fillable_is_tag_or_content_editable() {
        let mut editable = el(0, "div", 100.0, 100.0, 200.0, 20.0);
        editable.content_editable = true;
        let elements = vec![editable, el(1, "textarea", 100.0, 100.0, 200.0, 20.0)];
        let bbox = NormalizedBox::new(100.0, 100.0, 120.0, 300.0);
        assert_eq!(select_element(&bbox, VP, &elements, true).map(|e| e.id), Some(0));
    }

    #[test]
    fn ties_keep_document_order() {
        let elements = vec![
            el(0, "div", 100.0, 100.0, 200.0, 20.0),
            el(1, "span", 100.0, 100.0, 200.0, 20.0),
        ];
        let bbox = NormalizedBox::new(100.0, 100.0, 120.0, 300.0);
        assert_eq!(select_element(&bbox, VP, &elements, false).map(|e| e.id), Some(0));
    }

    #[test]
    fn hidden_and_non_rendered_elements_are_skipped() {
        let mut hidden = el(0, "div", 100.0, 100.0, 200.0, 20.0);
        hidden.visibility = "hidden".into();
        let mut none = el(1, "div", 100.0, 100.0, 200.0, 20.0);
        none.display = "none".into();
        let mut transparent = el(2, "div", 100.0, 100.0, 200.0, 20.0);
        transparent.opacity = "0".into();
        let elements = vec![
            hidden,
            none,
            transparent,
            el(3, "script", 100.0, 100.0, 200.0, 20.0),
            el(4, "div", 100.0, 100.0, 0.0, 20.0),
        ];
        let bbox = NormalizedBox::new(100.0, 100.0, 120.0, 300.0);
        assert!(select_element(&bbox, VP, &elements, false).is_none());
    }

    #[test]
    fn containment_is_tolerant_but_bounded() {
        // Starts at a quarter of the target top, still inside.
        let near = el(0, "a", 30.0, 30.0, 50.0, 50.0);
        // Ends beyond four times the target bottom.
        let far = el(1, "a", 400.0, 400.0, 200.0, 200.0);
        let bbox = NormalizedBox::new(100.0, 100.0, 120.0, 120.0);
        let elements = vec![far, near];
        assert_eq!(select_element(&bbox, VP, &elements, false).map(|e| e.id), Some(0));
    }

    #[test]
    fn closest_center_wins() {
        let elements = vec![
            el(0, "div", 90.0, 90.0, 240.0, 60.0),
            el(1, "button", 100.0, 100.0, 200.0, 20.0),
        ];
        let bbox = NormalizedBox::new(100.0, 100.0, 120.0, 300.0);
        assert_eq!(select_element(&bbox, VP, &elements, false).map(|e| e.id), Some(1));
    }

    #[test]
    fn degenerate_viewport_matches_nothing() {
        let elements = vec![el(0, "div", 0.0, 0.0, 10.0, 10.0)];
        let bbox = NormalizedBox::new(0.0, 0.0, 10.0, 10.0);
        assert!(select_element(&bbox, Viewport::new(0.0, 600.0), &elements, false).is_none());
    }
}
