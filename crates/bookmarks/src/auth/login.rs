//! Scripted login through the X web UI.
//!
//! The login flow is a multi-step form whose markup changes often, so every
//! step tries a list of selectors and falls back to pressing Enter when no
//! button can be found.

use std::path::Path;
use tokio::time::Instant;

use super::session::Session;
use crate::browser::{settle, wait_for_any, Tab};
use crate::config::{Credentials, Timing};
use crate::error::{Error, Result};

/// Entry point of the login flow.
pub const LOGIN_URL: &str = "https://x.com/i/flow/login";
/// Timeline shown after login.
pub const HOME_URL: &str = "https://x.com/home";

const USERNAME_SELECTORS: &[&str] = &[
    "input[autocomplete=\"username\"]",
    "input[name=\"text\"]",
    "input[type=\"text\"]",
];

const PASSWORD_SELECTORS: &[&str] = &[
    "input[name=\"password\"]",
    "input[type=\"password\"]",
    "input[autocomplete=\"current-password\"]",
];

/// "Enter your phone number or email address" unusual-activity prompt.
const CHALLENGE_SELECTORS: &[&str] = &["input[data-testid=\"ocfEnterTextTextInput\"]"];

const LOGIN_BUTTON_SELECTORS: &[&str] = &["[data-testid=\"LoginForm_Login_Button\"]"];

const LOGGED_IN_SELECTORS: &[&str] = &[
    "[data-testid=\"SideNav_AccountSwitcher_Button\"]",
    "[data-testid=\"AppTabBar_Home_Link\"]",
];

/// Page text X shows when it rejects the credentials.
const REJECTION_MARKERS: &[&str] = &[
    "Wrong password",
    "Could not log you in now",
    "Sorry, we could not find your account",
];

/// Drives the login form on a tab.
pub struct Authenticator<'a> {
    tab: &'a dyn Tab,
    credentials: &'a Credentials,
    timing: &'a Timing,
}

impl<'a> Authenticator<'a> {
    #[must_use]
    pub fn new(tab: &'a dyn Tab, credentials: &'a Credentials, timing: &'a Timing) -> Self {
        Self {
            tab,
            credentials,
            timing,
        }
    }

    /// Log in with the configured credentials.
    pub async fn login(&self) -> Result<()> {
        if !self.credentials.is_complete() {
            return Err(Error::Auth("username and password are required".to_string()));
        }

        tracing::info!(username = %self.credentials.username, "Logging in to X");
        self.tab.goto(LOGIN_URL).await?;
        settle(self.timing.navigation_settle).await;

        let username_input = self.wait_for(USERNAME_SELECTORS).await?;
        self.tab
            .type_into(username_input, &self.credentials.username)
            .await?;
        self.advance(username_input).await?;
        settle(self.timing.step_pause).await;

        let candidates: Vec<&str> = PASSWORD_SELECTORS
            .iter()
            .chain(CHALLENGE_SELECTORS)
            .copied()
            .collect();
        let mut password_input = self.wait_for(&candidates).await?;

        if CHALLENGE_SELECTORS.contains(&password_input) {
            tracing::info!("X asked to confirm the account identity");
            let email = self.credentials.email.as_deref().ok_or_else(|| {
                Error::Auth(
                    "X asked for the account email or phone, but X_EMAIL is not set".to_string(),
                )
            })?;
            self.tab.type_into(password_input, email).await?;
            self.advance(password_input).await?;
            settle(self.timing.step_pause).await;
            password_input = self.wait_for(PASSWORD_SELECTORS).await?;
        }

        self.tab
            .type_into(password_input, &self.credentials.password)
            .await?;
        self.submit(password_input).await?;

        self.wait_until_logged_in().await?;
        tracing::info!("Logged in");
        Ok(())
    }

    /// Reuse a saved session if it is still logged in, otherwise log in and save a new one.
    pub async fn ensure_session(&self, session_path: &Path) -> Result<Session> {
        if session_path.exists() {
            match Session::load(session_path) {
                Ok(mut session) if session.is_usable() => {
                    tracing::info!(path = %session_path.display(), "Trying saved session");
                    self.tab.set_cookies(&session.cookies).await?;
                    self.tab.goto(HOME_URL).await?;
                    settle(self.timing.navigation_settle).await;

                    // /home renders for stale cookies too; only the signed-in chrome counts.
                    match self.wait_for(LOGGED_IN_SELECTORS).await {
                        Ok(_) => {
                            tracing::info!("Saved session is valid");
                            session.mark_validated();
                            session.save(session_path)?;
                            return Ok(session);
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "Saved session expired, logging in again");
                        }
                    }
                }
                Ok(_) => tracing::warn!("Saved session has no auth cookie, logging in again"),
                Err(e) => tracing::warn!(error = %e, "Could not read saved session"),
            }
        }

        self.login().await?;

        let mut session = Session::new(self.tab.cookies().await?);
        if !session.is_usable() {
            tracing::warn!("Logged in but no auth_token cookie was captured");
        }
        session.mark_validated();
        session.save(session_path)?;
        tracing::info!(path = %session_path.display(), "Saved session");
        Ok(session)
    }

    /// Whether the tab currently shows a logged-in page.
    pub async fn is_logged_in(&self) -> Result<bool> {
        let url = self.tab.current_url().await?;
        if url.contains("/home") && !url.contains("/login") {
            return Ok(true);
        }

        for selector in LOGGED_IN_SELECTORS {
            if self.tab.exists(selector).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn wait_for<'s>(&self, selectors: &[&'s str]) -> Result<&'s str> {
        wait_for_any(
            self.tab,
            selectors,
            self.timing.element_timeout,
            self.timing.poll_interval,
        )
        .await
    }

    /// Move to the next form step: the "Next" button, or Enter in the field.
    async fn advance(&self, input: &str) -> Result<()> {
        if self.tab.click_text("button", "Next").await? {
            return Ok(());
        }
        tracing::debug!(input, "No Next button, pressing Enter");
        self.tab.press_enter(input).await
    }

    async fn submit(&self, input: &str) -> Result<()> {
        for selector in LOGIN_BUTTON_SELECTORS {
            if self.tab.exists(selector).await? {
                return self.tab.click(selector).await;
            }
        }
        if self.tab.click_text("button", "Log in").await? {
            return Ok(());
        }
        tracing::debug!(input, "No login button, pressing Enter");
        self.tab.press_enter(input).await
    }

    async fn wait_until_logged_in(&self) -> Result<()> {
        let deadline = Instant::now() + self.timing.element_timeout;

        loop {
            if self.is_logged_in().await? {
                return Ok(());
            }

            let content = self.tab.content().await?;
            if let Some(marker) = REJECTION_MARKERS.iter().find(|m| content.contains(*m)) {
                return Err(Error::Auth(format!("X rejected the login: {marker}")));
            }

            if Instant::now() >= deadline {
                let url = self.tab.current_url().await?;
                return Err(Error::Auth(format!("login did not complete, last URL: {url}")));
            }

            tokio::time::sleep(self.timing.poll_interval).await;
        }
    }
}
