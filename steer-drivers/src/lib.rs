//! Driver layer: everything that touches the live page.
//!
//! The rest of the workspace only sees the [`PageDriver`] capability. The
//! WebDriver implementation injects a small script bundle into the page and
//! runs its named operations through script execution; tests use the
//! in-memory page behind the `testing` feature.
//!
//! - [`browser::driver::SteerDriver`]: WebDriver session bound to a config
//! - [`browser::page::WebPage`]: [`PageDriver`] over a `fantoccini` client
//! - [`marker::MarkerPainter`]: the single transient debug marker
//! - [`resolver::ElementResolver`]: normalized box to DOM element
//! - [`actions::PageActions`]: click, fill, scroll and navigate executors
//! - [`settle`]: post-action settling step
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use steer_common::{EncodedImage, PixelRect, Point, Viewport};

pub mod actions;
pub mod browser;
pub mod marker;
pub mod resolver;
pub mod settle;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use actions::PageActions;
pub use marker::MarkerPainter;
pub use resolver::{select_element, ElementResolver};

/// Failures crossing the page boundary.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("webdriver command failed: {0}")]
    WebDriver(String),
    #[error("page operation `{op}` failed: {message}")]
    Script { op: &'static str, message: String },
    #[error("unexpected result from `{op}`: {message}")]
    Decode { op: &'static str, message: String },
    #[error("element {0} is no longer attached to the page")]
    StaleElement(usize),
    #[error("invalid url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// One rendered element as seen by the most recent [`PageDriver::elements`]
/// scan. `id` is only valid until the next scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementSnapshot {
    pub id: usize,
    /// Lowercase tag name.
    pub tag: String,
    pub rect: PixelRect,
    pub display: String,
    pub visibility: String,
    /// Computed opacity as the page reports it (`"0"`, `"0.5"`, `"1"`).
    pub opacity: String,
    #[serde(default)]
    pub content_editable: bool,
}

impl ElementSnapshot {
    pub fn is_fillable(&self) -> bool {
        matches!(self.tag.as_str(), "input" | "textarea") || self.content_editable
    }
}

/// Operations the controller needs from a page.
///
/// All element ids refer to the latest [`PageDriver::elements`] scan.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Make the page-side operations available. Safe to repeat; returns
    /// `true` when the bundle had to be (re)installed.
    async fn install_actions(&self) -> Result<bool, DriverError>;

    async fn viewport(&self) -> Result<Viewport, DriverError>;

    /// Every candidate element in document order.
    async fn elements(&self) -> Result<Vec<ElementSnapshot>, DriverError>;

    /// Draw the debug marker, replacing any existing one.
    async fn show_marker(&self, rect: PixelRect) -> Result<(), DriverError>;

    async fn hide_marker(&self) -> Result<(), DriverError>;

    /// Wait `settle`, hit-test `point` and click whatever is there.
    /// Returns `false` when nothing was hit.
    async fn click_at(&self, point: Point, settle: std::time::Duration)
        -> Result<bool, DriverError>;

    /// Focus, assign, fire `input` and `change`, blur.
    async fn fill(&self, element_id: usize, value: &str) -> Result<(), DriverError>;

    /// Scroll the window vertically by `dy` pixels.
    async fn scroll_by(&self, dy: f64) -> Result<(), DriverError>;

    async fn navigate(&self, url: &url::Url) -> Result<(), DriverError>;

    /// `document.readyState`.
    async fn ready_state(&self) -> Result<String, DriverError>;

    /// Capture the visible viewport; `None` when capture is unavailable.
    async fn screenshot(&self) -> Option<EncodedImage>;
}
