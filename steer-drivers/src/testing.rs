//! In-memory [`PageDriver`] for tests.
//!
//! Holds a flat list of elements in document order and records every
//! mutation the controller performs so assertions can inspect them.
use crate::{DriverError, ElementSnapshot, PageDriver};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use steer_common::{EncodedImage, PixelRect, Point, Viewport};

#[derive(Default)]
struct State {
    viewport: Option<Viewport>,
    elements: Vec<ElementSnapshot>,
    installed: bool,
    installs: usize,
    refuse_install: bool,
    markers: Vec<PixelRect>,
    clicks: Vec<usize>,
    fills: Vec<(usize, String)>,
    scroll_y: f64,
    navigations: Vec<String>,
    ready_queue: VecDeque<String>,
    ready_state: String,
    screenshot: Option<EncodedImage>,
}

pub struct MemoryPage {
    state: Mutex<State>,
}

impl MemoryPage {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            state: Mutex::new(State {
                viewport: Some(viewport),
                ready_state: "complete".into(),
                screenshot: Some(EncodedImage::new("image/png", "iVBORw0KGgo=")),
                ..State::default()
            }),
        }
    }

    /// Start with the page actions already installed.
    pub fn preinstalled(self) -> Self {
        self.state().installed = true;
        self
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append a visible element; returns its id.
    pub fn add_element(&self, tag: &str, rect: PixelRect) -> usize {
        let mut s = self.state();
        let id = s.elements.len();
        s.elements.push(ElementSnapshot {
            id,
            tag: tag.to_ascii_lowercase(),
            rect,
            display: "block".into(),
            visibility: "visible".into(),
            opacity: "1".into(),
            content_editable: false,
        });
        id
    }

    /// Append a fully specified element; its `id` is overwritten.
    pub fn push_element(&self, mut el: ElementSnapshot) -> usize {
        let mut s = self.state();
        el.id = s.elements.len();
        let id = el.id;
        s.elements.push(el);
        id
    }

    pub fn set_screenshot(&self, image: Option<EncodedImage>) {
        self.state().screenshot = image;
    }

    pub fn set_ready_state(&self, state: &str) {
        self.state().ready_state = state.into();
    }

    /// States returned by the next readiness probes, before the steady one.
    pub fn queue_ready_states<I, S>(&self, states: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state().ready_queue.extend(states.into_iter().map(Into::into));
    }

    /// Make bundle installation fail, as on a restricted page.
    pub fn refuse_install(&self, refuse: bool) {
        self.state().refuse_install = refuse;
    }

    pub fn markers(&self) -> Vec<PixelRect> {
        self.state().markers.clone()
    }

    pub fn clicked(&self) -> Vec<usize> {
        self.state().clicks.clone()
    }

    pub fn fills(&self) -> Vec<(usize, String)> {
        self.state().fills.clone()
    }

    pub fn scroll_y(&self) -> f64 {
        self.state().scroll_y
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state().navigations.clone()
    }

    pub fn installs(&self) -> usize {
        self.state().installs
    }

    fn require_installed(s: &State, op: &'static str) -> Result<(), DriverError> {
        if s.installed {
            Ok(())
        } else {
            Err(DriverError::Script {
                op,
                message: "page actions are not installed".into(),
            })
        }
    }
}

#[async_trait]
impl PageDriver for MemoryPage {
    async fn install_actions(&self) -> Result<bool, DriverError> {
        let mut s = self.state();
        if s.refuse_install {
            return Err(DriverError::Script {
                op: "install",
                message: "script injection is not allowed on this page".into(),
            });
        }
        if s.installed {
            return Ok(false);
        }
        s.installed = true;
        s.installs += 1;
        Ok(true)
    }

    async fn viewport(&self) -> Result<Viewport, DriverError> {
        let s = self.state();
        s.viewport.ok_or(DriverError::Decode {
            op: "viewport",
            message: "no viewport".into(),
        })
    }

    async fn elements(&self) -> Result<Vec<ElementSnapshot>, DriverError> {
        let s = self.state();
        Self::require_installed(&s, "collectElements")?;
        Ok(s.elements.clone())
    }

    async fn show_marker(&self, rect: PixelRect) -> Result<(), DriverError> {
        let mut s = self.state();
        s.markers.clear();
        s.markers.push(rect);
        Ok(())
    }

    async fn hide_marker(&self) -> Result<(), DriverError> {
        self.state().markers.clear();
        Ok(())
    }

    async fn click_at(&self, point: Point, settle: Duration) -> Result<bool, DriverError> {
        tokio::time::sleep(settle).await;
        let mut s = self.state();
        Self::require_installed(&s, "clickAtPoint")?;
        // Later elements paint over earlier ones.
        let hit = s
            .elements
            .iter()
            .rev()
            .find(|el| {
                el.display != "none"
                    && el.visibility != "hidden"
                    && el.rect.contains_point(point)
            })
            .map(|el| el.id);
        match hit {
            Some(id) => {
                s.clicks.push(id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn fill(&self, element_id: usize, value: &str) -> Result<(), DriverError> {
        let mut s = self.state();
        Self::require_installed(&s, "fillElement")?;
        if element_id >= s.elements.len() {
            return Err(DriverError::StaleElement(element_id));
        }
        s.fills.push((element_id, value.to_string()));
        Ok(())
    }

    async fn scroll_by(&self, dy: f64) -> Result<(), DriverError> {
        let mut s = self.state();
        Self::require_installed(&s, "scrollBy")?;
        s.scroll_y += dy;
        Ok(())
    }

    async fn navigate(&self, url: &url::Url) -> Result<(), DriverError> {
        let mut s = self.state();
        s.navigations.push(url.to_string());
        s.installed = false;
        Ok(())
    }

    async fn ready_state(&self) -> Result<String, DriverError> {
        let mut s = self.state();
        Ok(match s.ready_queue.pop_front() {
            Some(state) => state,
            None => s.ready_state.clone(),
        })
    }

    async fn screenshot(&self) -> Option<EncodedImage> {
        self.state().screenshot.clone()
    }
}
