//! Chromium implementation of [`Tab`] using chromiumoxide.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use chromiumoxide::Page;
use futures::StreamExt;
use std::path::PathBuf;
use tokio::task::JoinHandle;

use super::{StoredCookie, Tab};
use crate::error::{Error, Result};

/// Options for launching Chromium.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Run without a window.
    pub headless: bool,
    /// Explicit Chromium/Chrome binary.
    pub chrome_path: Option<PathBuf>,
    /// Window width and height.
    pub window_size: (u32, u32),
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            window_size: (1280, 1600),
        }
    }
}

/// A running Chromium instance and its CDP event handler task.
pub struct ChromeBrowser {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl ChromeBrowser {
    /// Launch Chromium.
    pub async fn launch(options: &LaunchOptions) -> Result<Self> {
        tracing::info!(headless = options.headless, "Launching browser");

        let mut builder = BrowserConfig::builder()
            .arg("--no-sandbox") // Required for containerized environments
            .arg("--disable-dev-shm-usage") // Avoid /dev/shm size issues in containers
            .window_size(options.window_size.0, options.window_size.1);

        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &options.chrome_path {
            builder = builder.chrome_executable(path);
        }

        let config = builder
            .build()
            .map_err(|e| Error::Browser(format!("Failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config).await?;

        let handler = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        Ok(Self { browser, handler })
    }

    /// Open a new tab at `url`.
    pub async fn new_tab(&self, url: &str) -> Result<ChromeTab> {
        let page = self.browser.new_page(url).await?;
        Ok(ChromeTab { page })
    }

    /// Close the browser and wait for the handler task to finish.
    pub async fn close(mut self) -> Result<()> {
        self.browser.close().await?;
        if let Err(e) = self.browser.wait().await {
            tracing::debug!(error = %e, "Browser process did not exit cleanly");
        }
        if let Err(e) = self.handler.await {
            tracing::debug!(error = %e, "Browser handler task failed");
        }
        Ok(())
    }
}

/// A Chromium page.
pub struct ChromeTab {
    page: Page,
}

impl ChromeTab {
    async fn element(&self, selector: &str) -> Result<chromiumoxide::Element> {
        self.page
            .find_element(selector)
            .await
            .map_err(|_| Error::ElementNotFound(selector.to_string()))
    }
}

#[async_trait]
impl Tab for ChromeTab {
    async fn goto(&self, url: &str) -> Result<()> {
        tracing::debug!(url, "Navigating");
        self.page.goto(url).await?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn content(&self) -> Result<String> {
        Ok(self.page.content().await?)
    }

    async fn exists(&self, selector: &str) -> Result<bool> {
        match self.page.find_elements(selector).await {
            Ok(elements) => Ok(!elements.is_empty()),
            Err(e) => {
                tracing::trace!(selector, error = %e, "Selector lookup failed");
                Ok(false)
            }
        }
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.element(selector).await?.click().await?;
        Ok(())
    }

    async fn click_text(&self, tag: &str, text: &str) -> Result<bool> {
        let script = format!(
            "(() => {{ \
                const want = {text}; \
                for (const el of document.querySelectorAll({tag})) {{ \
                    if ((el.innerText || '').trim() === want) {{ el.click(); return true; }} \
                }} \
                return false; \
            }})()",
            text = serde_json::to_string(text)?,
            tag = serde_json::to_string(tag)?,
        );

        let clicked = self
            .page
            .evaluate(script)
            .await?
            .into_value::<bool>()
            .map_err(|e| Error::Browser(format!("Unexpected click result: {e}")))?;
        Ok(clicked)
    }

    async fn type_into(&self, selector: &str, text: &str) -> Result<()> {
        let element = self.element(selector).await?;
        element.click().await?;
        element.type_str(text).await?;
        Ok(())
    }

    async fn press_enter(&self, selector: &str) -> Result<()> {
        self.element(selector).await?.press_key("Enter").await?;
        Ok(())
    }

    async fn scroll_by(&self, pixels: i64) -> Result<()> {
        self.page
            .evaluate(format!("window.scrollBy(0, {pixels})"))
            .await?;
        Ok(())
    }

    async fn cookies(&self) -> Result<Vec<StoredCookie>> {
        let cookies = self.page.get_cookies().await?;
        Ok(cookies
            .into_iter()
            .map(|c| StoredCookie {
                name: c.name,
                value: c.value,
                domain: c.domain,
                path: c.path,
                secure: c.secure,
                http_only: c.http_only,
                expires: (c.expires > 0.0).then_some(c.expires),
            })
            .collect())
    }

    async fn set_cookies(&self, cookies: &[StoredCookie]) -> Result<()> {
        let params = cookies
            .iter()
            .map(|c| {
                CookieParam::builder()
                    .name(&c.name)
                    .value(&c.value)
                    .domain(&c.domain)
                    .path(&c.path)
                    .secure(c.secure)
                    .http_only(c.http_only)
                    .build()
                    .map_err(|e| Error::Browser(format!("Failed to build cookie {}: {e}", c.name)))
            })
            .collect::<Result<Vec<_>>>()?;

        self.page.set_cookies(params).await?;
        Ok(())
    }
}
