use crate::browser::page::WebPage;
use crate::DriverError;
use fantoccini::{Client, ClientBuilder};
use serde_json::json;
use std::collections::HashMap;
use steer_config::BrowserSection;
use tracing::info;
use webdriver::capabilities::Capabilities;

/// Thin wrapper around a `fantoccini` WebDriver session.
pub struct SteerDriver {
    pub client: Client,
}

fn chrome_arguments(browser: &BrowserSection) -> Vec<String> {
    let mut args = vec!["--disable-infobars".to_string()];
    if browser.headless {
        args.push("--headless=new".into());
        args.push("--disable-gpu".into());
    }
    if let Some((w, h)) = browser.window_size {
        args.push(format!("--window-size={w},{h}"));
    }
    args
}

impl SteerDriver {
    /// Open a session on the WebDriver service at `browser.webdriver_url`.
    pub async fn connect(browser: &BrowserSection) -> Result<Self, DriverError> {
        let mut caps = Capabilities::new();
        let mut chrome_opts = HashMap::new();
        chrome_opts.insert("args".to_string(), json!(chrome_arguments(browser)));
        caps.insert("goog:chromeOptions".to_string(), json!(chrome_opts));

        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(&browser.webdriver_url)
            .await
            .map_err(|e| DriverError::WebDriver(e.to_string()))?;

        info!(
            target: "driver.session",
            webdriver_url = %browser.webdriver_url,
            headless = browser.headless,
            "webdriver session opened"
        );
        Ok(Self { client })
    }

    /// A [`WebPage`] sharing this session's client.
    pub fn page(&self) -> WebPage {
        WebPage::new(self.client.clone())
    }

    /// Close the underlying browser session.
    pub async fn close(self) -> Result<(), DriverError> {
        self.client
            .close()
            .await
            .map_err(|e| DriverError::WebDriver(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_and_window_size_become_chrome_flags() {
        let browser = BrowserSection {
            headless: true,
            window_size: Some((1280, 800)),
            ..BrowserSection::default()
        };
        let args = chrome_arguments(&browser);
        assert!(args.contains(&"--headless=new".to_string()));
        assert!(args.contains(&"--window-size=1280,800".to_string()));

        let args = chrome_arguments(&BrowserSection::default());
        assert!(!args.iter().any(|a| a.starts_with("--headless")));
    }
}
