use crate::{DriverError, ElementSnapshot, PageDriver};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use fantoccini::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use steer_common::{EncodedImage, PixelRect, Point, Viewport};
use tracing::{debug, warn};

const INSTALL_SCRIPT: &str = concat!("return ", include_str!("page_actions.js"));

const CALL_SCRIPT: &str = r#"
const actions = window.__steerActions;
if (!actions) { throw new Error("page actions are not installed"); }
return actions[arguments[0]].apply(null, arguments[1]);
"#;

/// [`PageDriver`] over the active tab of a WebDriver session.
#[derive(Clone)]
pub struct WebPage {
    client: Client,
}

impl WebPage {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Run one named operation of the installed bundle.
    async fn call(&self, op: &'static str, args: Vec<Value>) -> Result<Value, DriverError> {
        self.client
            .execute(CALL_SCRIPT, vec![json!(op), Value::Array(args)])
            .await
            .map_err(|e| DriverError::Script {
                op,
                message: e.to_string(),
            })
    }

    async fn call_as<T: DeserializeOwned>(
        &self,
        op: &'static str,
        args: Vec<Value>,
    ) -> Result<T, DriverError> {
        let value = self.call(op, args).await?;
        serde_json::from_value(value).map_err(|e| DriverError::Decode {
            op,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl PageDriver for WebPage {
    async fn install_actions(&self) -> Result<bool, DriverError> {
        let installed = self
            .client
            .execute(INSTALL_SCRIPT, vec![])
            .await
            .map_err(|e| DriverError::Script {
                op: "install",
                message: e.to_string(),
            })?;
        let fresh = installed.as_bool().unwrap_or(false);
        if fresh {
            debug!(target: "driver.page", "page actions installed");
        }
        Ok(fresh)
    }

    async fn viewport(&self) -> Result<Viewport, DriverError> {
        self.call_as("viewport", vec![]).await
    }

    async fn elements(&self) -> Result<Vec<ElementSnapshot>, DriverError> {
        self.call_as("collectElements", vec![]).await
    }

    async fn show_marker(&self, rect: PixelRect) -> Result<(), DriverError> {
        self.call("showMarker", vec![json!(rect)]).await.map(|_| ())
    }

    async fn hide_marker(&self) -> Result<(), DriverError> {
        self.call("hideMarker", vec![]).await.map(|_| ())
    }

    async fn click_at(&self, point: Point, settle: Duration) -> Result<bool, DriverError> {
        self.call_as(
            "clickAtPoint",
            vec![json!(point.x), json!(point.y), json!(settle.as_millis() as u64)],
        )
        .await
    }

    async fn fill(&self, element_id: usize, value: &str) -> Result<(), DriverError> {
        let filled: bool = self
            .call_as("fillElement", vec![json!(element_id), json!(value)])
            .await?;
        if filled {
            Ok(())
        } else {
            Err(DriverError::StaleElement(element_id))
        }
    }

    async fn scroll_by(&self, dy: f64) -> Result<(), DriverError> {
        self.call("scrollBy", vec![json!(dy)]).await.map(|_| ())
    }

    async fn navigate(&self, url: &url::Url) -> Result<(), DriverError> {
        self.client
            .goto(url.as_str())
            .await
            .map_err(|e| DriverError::WebDriver(e.to_string()))
    }

    // Queried directly: a fresh navigation drops the installed bundle.
    async fn ready_state(&self) -> Result<String, DriverError> {
        let state = self
            .client
            .execute("return document.readyState;", vec![])
            .await
            .map_err(|e| DriverError::Script {
                op: "readyState",
                message: e.to_string(),
            })?;
        state.as_str().map(str::to_owned).ok_or(DriverError::Decode {
            op: "readyState",
            message: format!("expected a string, got {state}"),
        })
    }

    async fn screenshot(&self) -> Option<EncodedImage> {
        match self.client.screenshot().await {
            Ok(png) => Some(EncodedImage::new("image/png", STANDARD.encode(png))),
            Err(e) => {
                warn!(target: "driver.page", error = %e, "screenshot capture failed");
                None
            }
        }
    }
}
