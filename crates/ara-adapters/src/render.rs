use async_trait::async_trait;

use crate::AdapterError;

/// Produces the HTML of a page after its scripts have populated it.
#[async_trait]
pub trait ListRenderer: Send + Sync {
    /// Loads `url`, waits for `wait_for` (a CSS selector) to appear and
    /// returns the rendered document. Fails with
    /// [`AdapterError::RendererUnavailable`] when no browser can be reached.
    async fn render(&self, url: &str, wait_for: &str) -> Result<String, AdapterError>;
}

/// Renderer for builds or deployments without a browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRenderer;

#[async_trait]
impl ListRenderer for NoRenderer {
    async fn render(&self, _url: &str, _wait_for: &str) -> Result<String, AdapterError> {
        Err(AdapterError::RendererUnavailable(
            "no browser renderer configured".to_string(),
        ))
    }
}

#[cfg(feature = "webdriver")]
mod webdriver {
    use std::time::Duration;

    use async_trait::async_trait;
    use fantoccini::{ClientBuilder, Locator};
    use tracing::{debug, warn};

    use super::ListRenderer;
    use crate::AdapterError;

    /// Drives a headless browser through a WebDriver endpoint
    /// (chromedriver, geckodriver).
    #[derive(Debug, Clone)]
    pub struct WebDriverRenderer {
        webdriver_url: String,
        wait: Duration,
    }

    impl WebDriverRenderer {
        pub fn new(webdriver_url: impl Into<String>) -> Self {
            Self {
                webdriver_url: webdriver_url.into(),
                wait: Duration::from_secs(20),
            }
        }

        pub fn with_wait(mut self, wait: Duration) -> Self {
            self.wait = wait;
            self
        }
    }

    #[async_trait]
    impl ListRenderer for WebDriverRenderer {
        async fn render(&self, url: &str, wait_for: &str) -> Result<String, AdapterError> {
            let client = ClientBuilder::native()
                .connect(&self.webdriver_url)
                .await
                .map_err(|err| AdapterError::RendererUnavailable(err.to_string()))?;

            let rendered = async {
                client.goto(url).await?;
                if let Err(err) = client
                    .wait()
                    .at_most(self.wait)
                    .for_element(Locator::Css(wait_for))
                    .await
                {
                    warn!(url, wait_for, error = %err, "timed out waiting for list rows");
                }
                client.source().await
            }
            .await;

            if let Err(err) = client.close().await {
                debug!(error = %err, "closing webdriver session failed");
            }
            rendered.map_err(|err| AdapterError::Message(format!("rendering {url}: {err}")))
        }
    }
}

#[cfg(feature = "webdriver")]
pub use webdriver::WebDriverRenderer;
