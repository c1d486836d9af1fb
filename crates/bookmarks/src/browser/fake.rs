//! Scripted in-memory tab for tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use super::{StoredCookie, Tab};
use crate::error::{Error, Result};

/// A page the fake tab can show.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakePage {
    /// HTML per scroll position; scrolling advances through them.
    snapshots: Vec<String>,
    selectors: Vec<String>,
    /// Cookie required to view the page, and where to send visitors without it.
    guard: Option<(String, String)>,
    sets_cookies: Vec<StoredCookie>,
}

impl FakePage {
    pub(crate) fn html(html: impl Into<String>) -> Self {
        Self {
            snapshots: vec![html.into()],
            ..Default::default()
        }
    }

    pub(crate) fn snapshots(snapshots: Vec<String>) -> Self {
        Self {
            snapshots,
            ..Default::default()
        }
    }

    pub(crate) fn with_selectors(mut self, selectors: &[&str]) -> Self {
        self.selectors = selectors.iter().map(ToString::to_string).collect();
        self
    }

    pub(crate) fn requires_cookie(mut self, name: &str, redirect: &str) -> Self {
        self.guard = Some((name.to_string(), redirect.to_string()));
        self
    }

    pub(crate) fn sets_cookie(mut self, cookie: StoredCookie) -> Self {
        self.sets_cookies.push(cookie);
        self
    }
}

#[derive(Default)]
struct FakeState {
    pages: HashMap<String, FakePage>,
    redirects: HashMap<String, String>,
    failing: HashSet<String>,
    hanging: HashSet<String>,
    late_failing: HashSet<String>,
    /// (page url, trigger) -> destination url
    actions: HashMap<(String, String), String>,
    current_url: String,
    snapshot: usize,
    visits: Vec<String>,
    typed: Vec<(String, String)>,
    cookies: Vec<StoredCookie>,
    scrolls: usize,
}

impl FakeState {
    fn page(&self) -> Option<&FakePage> {
        self.pages.get(&self.current_url)
    }

    fn navigate(&mut self, url: &str) {
        let mut target = self
            .redirects
            .get(url)
            .cloned()
            .unwrap_or_else(|| url.to_string());

        if let Some((cookie, redirect)) = self.pages.get(&target).and_then(|p| p.guard.clone()) {
            if !self.cookies.iter().any(|c| c.name == cookie) {
                target = redirect;
            }
        }

        if let Some(page) = self.pages.get(&target) {
            for cookie in page.sets_cookies.clone() {
                self.cookies.retain(|c| c.name != cookie.name);
                self.cookies.push(cookie);
            }
        }

        self.current_url = target;
        self.snapshot = 0;
    }

    fn trigger(&mut self, trigger: String) -> bool {
        let key = (self.current_url.clone(), trigger);
        match self.actions.get(&key).cloned() {
            Some(destination) => {
                self.navigate(&destination);
                true
            }
            None => false,
        }
    }

    fn has_selector(&self, selector: &str) -> bool {
        self.page()
            .is_some_and(|p| p.selectors.iter().any(|s| s == selector))
    }
}

/// A [`Tab`] driven by a script of pages, redirects and actions.
#[derive(Default)]
pub(crate) struct FakeTab {
    state: Mutex<FakeState>,
}

impl FakeTab {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub(crate) fn with_page(self, url: &str, page: FakePage) -> Self {
        self.state().pages.insert(url.to_string(), page);
        self
    }

    pub(crate) fn with_redirect(self, from: &str, to: &str) -> Self {
        self.state()
            .redirects
            .insert(from.to_string(), to.to_string());
        self
    }

    pub(crate) fn with_failure(self, url: &str) -> Self {
        self.state().failing.insert(url.to_string());
        self
    }

    pub(crate) fn with_hang(self, url: &str) -> Self {
        self.state().hanging.insert(url.to_string());
        self
    }

    /// Navigating to `url` lands on its destination, then reports an error.
    pub(crate) fn with_late_failure(self, url: &str) -> Self {
        self.state().late_failing.insert(url.to_string());
        self
    }

    /// On `page`, clicking `selector` navigates to `destination`.
    pub(crate) fn on_click(self, page: &str, selector: &str, destination: &str) -> Self {
        self.action(page, format!("click:{selector}"), destination)
    }

    /// On `page`, clicking the element with text `text` navigates to `destination`.
    pub(crate) fn on_text(self, page: &str, text: &str, destination: &str) -> Self {
        self.action(page, format!("text:{text}"), destination)
    }

    /// On `page`, pressing Enter in `selector` navigates to `destination`.
    pub(crate) fn on_enter(self, page: &str, selector: &str, destination: &str) -> Self {
        self.action(page, format!("enter:{selector}"), destination)
    }

    fn action(self, page: &str, trigger: String, destination: &str) -> Self {
        self.state()
            .actions
            .insert((page.to_string(), trigger), destination.to_string());
        self
    }

    pub(crate) fn visits(&self) -> Vec<String> {
        self.state().visits.clone()
    }

    pub(crate) fn typed(&self) -> Vec<(String, String)> {
        self.state().typed.clone()
    }

    pub(crate) fn scrolls(&self) -> usize {
        self.state().scrolls
    }
}

#[async_trait]
impl Tab for FakeTab {
    async fn goto(&self, url: &str) -> Result<()> {
        let hang = {
            let mut state = self.state();
            state.visits.push(url.to_string());
            if state.failing.contains(url) {
                return Err(Error::Browser(format!("net::ERR_NAME_NOT_RESOLVED at {url}")));
            }
            state.hanging.contains(url)
        };

        if hang {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }

        let mut state = self.state();
        state.navigate(url);
        if state.late_failing.contains(url) {
            return Err(Error::Browser(format!("net::ERR_ABORTED at {url}")));
        }
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.state().current_url.clone())
    }

    async fn content(&self) -> Result<String> {
        let state = self.state();
        Ok(state
            .page()
            .and_then(|p| {
                p.snapshots
                    .get(state.snapshot)
                    .or_else(|| p.snapshots.last())
                    .cloned()
            })
            .unwrap_or_else(|| "<html><body></body></html>".to_string()))
    }

    async fn exists(&self, selector: &str) -> Result<bool> {
        Ok(self.state().has_selector(selector))
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let mut state = self.state();
        if !state.has_selector(selector) {
            return Err(Error::ElementNotFound(selector.to_string()));
        }
        state.trigger(format!("click:{selector}"));
        Ok(())
    }

    async fn click_text(&self, _tag: &str, text: &str) -> Result<bool> {
        Ok(self.state().trigger(format!("text:{text}")))
    }

    async fn type_into(&self, selector: &str, text: &str) -> Result<()> {
        let mut state = self.state();
        if !state.has_selector(selector) {
            return Err(Error::ElementNotFound(selector.to_string()));
        }
        state.typed.push((selector.to_string(), text.to_string()));
        Ok(())
    }

    async fn press_enter(&self, selector: &str) -> Result<()> {
        let mut state = self.state();
        if !state.has_selector(selector) {
            return Err(Error::ElementNotFound(selector.to_string()));
        }
        state.trigger(format!("enter:{selector}"));
        Ok(())
    }

    async fn scroll_by(&self, _pixels: i64) -> Result<()> {
        let mut state = self.state();
        state.scrolls += 1;
        let last = state.page().map_or(0, |p| p.snapshots.len().saturating_sub(1));
        state.snapshot = (state.snapshot + 1).min(last);
        Ok(())
    }

    async fn cookies(&self) -> Result<Vec<StoredCookie>> {
        Ok(self.state().cookies.clone())
    }

    async fn set_cookies(&self, cookies: &[StoredCookie]) -> Result<()> {
        let mut state = self.state();
        for cookie in cookies {
            state.cookies.retain(|c| c.name != cookie.name);
            state.cookies.push(cookie.clone());
        }
        Ok(())
    }
}
