//! The single transient debug marker.
//!
//! Each draw replaces the previous marker and owns exactly one pending
//! removal timer; drawing again aborts that timer first.
use crate::{DriverError, PageDriver};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use steer_common::{NormalizedBox, PixelRect};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub struct MarkerPainter {
    page: Arc<dyn PageDriver>,
    ttl: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl MarkerPainter {
    pub fn new(page: Arc<dyn PageDriver>, ttl: Duration) -> Self {
        Self {
            page,
            ttl,
            pending: Mutex::new(None),
        }
    }

    /// Draw `bbox` against the current viewport and schedule its removal.
    pub async fn draw(&self, bbox: &NormalizedBox) -> Result<PixelRect, DriverError> {
        self.abort_pending();

        let viewport = self.page.viewport().await?;
        let rect = bbox.to_pixels(viewport);
        self.page.show_marker(rect).await?;
        debug!(
            target: "driver.marker",
            top = rect.top,
            left = rect.left,
            width = rect.width,
            height = rect.height,
            "marker drawn"
        );

        let page = Arc::clone(&self.page);
        let ttl = self.ttl;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if let Err(e) = page.hide_marker().await {
                warn!(target: "driver.marker", error = %e, "marker removal failed");
            }
        });
        if let Ok(mut slot) = self.pending.lock() {
            *slot = Some(handle);
        }
        Ok(rect)
    }

    /// Remove the marker now.
    pub async fn clear(&self) -> Result<(), DriverError> {
        self.abort_pending();
        self.page.hide_marker().await
    }

    fn abort_pending(&self) {
        if let Ok(mut slot) = self.pending.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}

impl Drop for MarkerPainter {
    fn drop(&mut self) {
        self.abort_pending();
    }
}
