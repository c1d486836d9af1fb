//! Redirect resolution.
//!
//! Follows short links (t.co and friends) to the page they finally land on.
//! Resolution never fails outright: errors are recorded on the [`Resolution`]
//! and the original URL is kept as the destination.

mod browser;
mod http;

pub use browser::BrowserResolver;
pub use http::{meta_refresh_target, HttpResolver};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::links::{is_internal, parse_github_repo};

/// Outcome of resolving one link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// The link as found.
    pub original: String,
    /// Where it ended up. Equal to `original` when nothing was followed.
    pub final_url: String,
    /// Whether the destination differs from the original.
    pub redirected: bool,
    /// Why resolution failed, if it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Resolution {
    /// The link is already its own destination.
    #[must_use]
    pub fn unchanged(url: &str) -> Self {
        Self {
            original: url.to_string(),
            final_url: url.to_string(),
            redirected: false,
            error: None,
        }
    }

    /// The link led to `final_url`.
    #[must_use]
    pub fn resolved(original: &str, final_url: impl Into<String>) -> Self {
        let final_url = final_url.into();
        Self {
            redirected: final_url != original,
            original: original.to_string(),
            final_url,
            error: None,
        }
    }

    /// Resolution failed; keep the original as the destination.
    #[must_use]
    pub fn failed(original: &str, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::unchanged(original)
        }
    }

    /// Whether a destination was determined without error.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Resolves links to their final destination.
#[async_trait]
pub trait LinkResolver: Send {
    /// Name for logs.
    fn name(&self) -> &'static str;

    /// Follow `url` to its destination.
    async fn resolve(&mut self, url: &str) -> Resolution;
}

/// Resolve a link, trusting a complete GitHub repository in the anchor text.
///
/// X shows the expanded destination as the text of its t.co anchors. When that
/// text is a full repository reference (not cut off with `…`) there is no need
/// to navigate.
pub async fn resolve_with_hint(
    resolver: &mut dyn LinkResolver,
    url: &str,
    display: Option<&str>,
) -> Resolution {
    if let Some(display) = display.map(str::trim) {
        if !display.ends_with('…') && parse_github_repo(display).is_some() {
            let final_url = if display.starts_with("http://") || display.starts_with("https://") {
                display.to_string()
            } else {
                format!("https://{display}")
            };
            tracing::debug!(url, final_url, "Resolved from anchor text");
            return Resolution::resolved(url, final_url);
        }
    }

    resolver.resolve(url).await
}

/// Whether a URL has to be followed to learn its destination.
pub fn needs_resolution(url: &str) -> bool {
    parse_github_repo(url).is_none() && !is_internal(url)
}

/// Per-run memo of resolved links.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: HashMap<String, Resolution>,
}

impl ResolutionCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<&Resolution> {
        self.entries.get(url)
    }

    pub fn insert(&mut self, resolution: Resolution) {
        self.entries
            .insert(resolution.original.clone(), resolution);
    }
}
