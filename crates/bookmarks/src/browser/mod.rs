//! Browser automation seam.
//!
//! Everything that drives the X web UI goes through the [`Tab`] trait so the
//! login flow, timeline collection and redirect resolution can run against
//! Chromium in production and a scripted tab in tests.

mod chrome;
#[cfg(test)]
pub(crate) mod fake;

pub use chrome::{ChromeBrowser, ChromeTab, LaunchOptions};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

use crate::error::{Error, Result};

/// A browser cookie that can be saved to disk and installed again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
    /// Expiry as seconds since the epoch. Session cookies have none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
}

impl StoredCookie {
    /// Create a secure cookie for `.x.com`.
    #[must_use]
    pub fn x_com(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: ".x.com".to_string(),
            path: "/".to_string(),
            secure: true,
            http_only: false,
            expires: None,
        }
    }
}

/// A single browser tab.
#[async_trait]
pub trait Tab: Send + Sync {
    /// Navigate to a URL and wait for the load event.
    async fn goto(&self, url: &str) -> Result<()>;

    /// The URL currently shown, after any redirects.
    async fn current_url(&self) -> Result<String>;

    /// Serialized DOM of the current page.
    async fn content(&self) -> Result<String>;

    /// Whether at least one element matches the CSS selector.
    async fn exists(&self, selector: &str) -> Result<bool>;

    /// Click the first element matching the selector.
    async fn click(&self, selector: &str) -> Result<()>;

    /// Click the first `tag` element whose visible text equals `text`.
    ///
    /// Returns `false` when nothing matched.
    async fn click_text(&self, tag: &str, text: &str) -> Result<bool>;

    /// Focus the element matching the selector and type into it.
    async fn type_into(&self, selector: &str, text: &str) -> Result<()>;

    /// Press Enter in the element matching the selector.
    async fn press_enter(&self, selector: &str) -> Result<()>;

    /// Scroll the window down by `pixels`.
    async fn scroll_by(&self, pixels: i64) -> Result<()>;

    /// All cookies visible to the tab.
    async fn cookies(&self) -> Result<Vec<StoredCookie>>;

    /// Install cookies into the browser.
    async fn set_cookies(&self, cookies: &[StoredCookie]) -> Result<()>;
}

/// Poll `selectors` in order until one matches, returning the match.
pub async fn wait_for_any<'s>(
    tab: &dyn Tab,
    selectors: &[&'s str],
    timeout: Duration,
    poll: Duration,
) -> Result<&'s str> {
    let deadline = Instant::now() + timeout;

    loop {
        for selector in selectors {
            if tab.exists(selector).await? {
                tracing::debug!(selector, "Selector matched");
                return Ok(selector);
            }
        }

        if Instant::now() >= deadline {
            return Err(Error::Timeout {
                what: selectors.join(" | "),
                after: timeout,
            });
        }

        tokio::time::sleep(poll).await;
    }
}

/// Sleep unless the duration is zero.
pub async fn settle(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::fake::{FakePage, FakeTab};
    use super::*;

    #[tokio::test]
    async fn test_wait_for_any_returns_first_present() {
        let tab = FakeTab::new().with_page(
            "https://x.com/a",
            FakePage::default().with_selectors(&["input[name=\"text\"]"]),
        );
        tab.goto("https://x.com/a").await.unwrap();

        let found = wait_for_any(
            &tab,
            &["input[autocomplete=\"username\"]", "input[name=\"text\"]"],
            Duration::from_millis(20),
            Duration::from_millis(1),
        )
        .await
        .unwrap();
        assert_eq!(found, "input[name=\"text\"]");
    }

    #[tokio::test]
    async fn test_wait_for_any_times_out() {
        let tab = FakeTab::new();
        let err = wait_for_any(
            &tab,
            &["#missing"],
            Duration::from_millis(10),
            Duration::from_millis(1),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
    }
}
