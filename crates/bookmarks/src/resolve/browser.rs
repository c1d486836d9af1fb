//! Resolution by navigating a dedicated browser tab.

use async_trait::async_trait;

use super::{needs_resolution, LinkResolver, Resolution, ResolutionCache};
use crate::browser::{settle, Tab};
use crate::config::Timing;

/// Navigates a secondary tab to each link and reads where it landed.
///
/// A separate tab keeps the post page in the primary tab untouched.
pub struct BrowserResolver<T: Tab> {
    tab: T,
    timing: Timing,
    cache: ResolutionCache,
}

impl<T: Tab> BrowserResolver<T> {
    #[must_use]
    pub fn new(tab: T, timing: Timing) -> Self {
        Self {
            tab,
            timing,
            cache: ResolutionCache::new(),
        }
    }

    /// Give back the tab.
    pub fn into_inner(self) -> T {
        self.tab
    }

    async fn navigate(&self, url: &str) -> Resolution {
        let before = self.tab.current_url().await.unwrap_or_default();
        let outcome = tokio::time::timeout(self.timing.resolve_timeout, async {
            self.tab.goto(url).await?;
            settle(self.timing.resolve_settle).await;
            self.tab.current_url().await
        })
        .await;

        match outcome {
            Ok(Ok(final_url)) if is_real_page(&final_url) => Resolution::resolved(url, final_url),
            Ok(Ok(final_url)) => {
                Resolution::failed(url, format!("navigation ended on {final_url:?}"))
            }
            Ok(Err(e)) => self.salvage(url, &before, e.to_string()).await,
            Err(_) => {
                let reason = format!(
                    "timed out after {}ms",
                    self.timing.resolve_timeout.as_millis()
                );
                self.salvage(url, &before, reason).await
            }
        }
    }

    /// A navigation error often arrives after the redirect already happened
    /// (slow destination, aborted subresource). Keep the landed URL if the tab
    /// actually moved away from both the link and the previous page.
    async fn salvage(&self, url: &str, before: &str, reason: String) -> Resolution {
        match self.tab.current_url().await {
            Ok(current) if is_real_page(&current) && current != url && current != before => {
                tracing::debug!(url, current, reason, "Keeping URL reached before failure");
                Resolution::resolved(url, current)
            }
            _ => {
                tracing::warn!(url, reason, "Could not resolve link");
                Resolution::failed(url, reason)
            }
        }
    }
}

#[async_trait]
impl<T: Tab> LinkResolver for BrowserResolver<T> {
    fn name(&self) -> &'static str {
        "browser"
    }

    async fn resolve(&mut self, url: &str) -> Resolution {
        if let Some(hit) = self.cache.get(url) {
            return hit.clone();
        }

        let resolution = if needs_resolution(url) {
            self.navigate(url).await
        } else {
            Resolution::unchanged(url)
        };

        if resolution.redirected {
            tracing::debug!(url, final_url = %resolution.final_url, "Resolved link");
        }
        self.cache.insert(resolution.clone());
        resolution
    }
}

fn is_real_page(url: &str) -> bool {
    !url.is_empty()
        && url != "about:blank"
        && !url.starts_with("chrome-error://")
        && !url.starts_with("data:")
}
