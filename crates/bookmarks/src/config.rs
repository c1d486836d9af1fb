//! Harvest configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// Login credentials for the X web UI.
#[derive(Clone, Default)]
pub struct Credentials {
    /// Username, handle, or email for the first login step.
    pub username: String,
    /// Account password.
    pub password: String,
    /// Email or phone asked for by the unusual-activity challenge.
    pub email: Option<String>,
}

impl Credentials {
    /// Create credentials without a challenge identifier.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            email: None,
        }
    }

    /// Set the identifier used when X asks to confirm the account.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Whether both username and password are present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.username.trim().is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("email", &self.email)
            .finish()
    }
}

/// How candidate links are resolved to their final destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResolveMode {
    /// Navigate a second browser tab to the link.
    #[default]
    Browser,
    /// Follow HTTP redirects without a browser.
    Http,
}

/// Pauses and deadlines for the automation steps.
///
/// The X web UI renders asynchronously, so most steps wait a fixed settle
/// time before reading the page.
#[derive(Debug, Clone)]
pub struct Timing {
    /// Wait after navigating before reading the page.
    pub navigation_settle: Duration,
    /// Wait between login form steps.
    pub step_pause: Duration,
    /// Wait after each timeline scroll.
    pub scroll_pause: Duration,
    /// Wait after a redirect navigation before reading the final URL.
    pub resolve_settle: Duration,
    /// Deadline for a selector to appear.
    pub element_timeout: Duration,
    /// Deadline for a single link resolution.
    pub resolve_timeout: Duration,
    /// Interval between selector polls.
    pub poll_interval: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            navigation_settle: Duration::from_secs(3),
            step_pause: Duration::from_millis(1500),
            scroll_pause: Duration::from_millis(2000),
            resolve_settle: Duration::from_millis(1500),
            element_timeout: Duration::from_secs(15),
            resolve_timeout: Duration::from_secs(20),
            poll_interval: Duration::from_millis(250),
        }
    }
}

impl Timing {
    /// Near-zero pauses, for driving fake tabs.
    #[must_use]
    pub fn fast() -> Self {
        Self {
            navigation_settle: Duration::ZERO,
            step_pause: Duration::ZERO,
            scroll_pause: Duration::ZERO,
            resolve_settle: Duration::ZERO,
            element_timeout: Duration::from_millis(50),
            resolve_timeout: Duration::from_millis(200),
            poll_interval: Duration::from_millis(1),
        }
    }
}

/// Configuration for a harvest run.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// JSON report path.
    pub output: PathBuf,
    /// Saved cookie session. `None` always logs in with credentials.
    pub session_path: Option<PathBuf>,
    /// Login credentials.
    pub credentials: Credentials,
    /// Run Chromium without a window.
    pub headless: bool,
    /// Chromium executable, if not auto-detected.
    pub chrome_path: Option<PathBuf>,
    /// Stop after this many bookmarked posts.
    pub max_bookmarks: usize,
    /// Upper bound on timeline scrolls.
    pub max_scrolls: usize,
    /// Stop after this many scrolls in a row found nothing new.
    pub idle_scroll_limit: usize,
    /// Extra scrolls on each post page to load more replies.
    pub reply_scrolls: usize,
    /// Pixels per scroll.
    pub scroll_step: i64,
    /// Link resolution strategy.
    pub resolve_mode: ResolveMode,
    /// Also harvest links from the bookmarked post itself.
    pub include_post: bool,
    /// Only keep replies written by the post's author.
    pub author_only: bool,
    /// Only keep links that resolve to GitHub repositories.
    pub github_only: bool,
    /// Skip posts already present in the existing report.
    pub skip_seen: bool,
    /// Replace the existing report instead of merging into it.
    pub overwrite: bool,
    /// Automation pauses and deadlines.
    pub timing: Timing,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("bookmarks.json"),
            session_path: Some(PathBuf::from(".x-session.json")),
            credentials: Credentials::default(),
            headless: true,
            chrome_path: None,
            max_bookmarks: 50,
            max_scrolls: 40,
            idle_scroll_limit: 3,
            reply_scrolls: 2,
            scroll_step: 1200,
            resolve_mode: ResolveMode::Browser,
            include_post: false,
            author_only: false,
            github_only: false,
            skip_seen: false,
            overwrite: false,
            timing: Timing::default(),
        }
    }
}

impl HarvestConfig {
    /// Check the configuration before launching a browser.
    ///
    /// Credentials are only required when no saved session file exists.
    pub fn validate(&self) -> Result<()> {
        if self.max_bookmarks == 0 {
            return Err(Error::Config("max_bookmarks must be at least 1".to_string()));
        }
        if self.scroll_step <= 0 {
            return Err(Error::Config("scroll_step must be positive".to_string()));
        }

        let has_session = self.session_path.as_ref().is_some_and(|p| p.exists());
        if !has_session && !self.credentials.is_complete() {
            return Err(Error::Config(
                "X_USERNAME and X_PASSWORD are required when no saved session exists".to_string(),
            ));
        }

        Ok(())
    }
}
