//! X data types.

use serde::{Deserialize, Serialize};

/// A bookmarked post.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostRef {
    /// Numeric status ID.
    pub id: String,
    /// Author handle (without @).
    pub author: String,
    /// Canonical post URL.
    pub url: String,
}

impl PostRef {
    /// Create a post reference with its canonical `x.com` URL.
    #[must_use]
    pub fn new(author: impl Into<String>, id: impl Into<String>) -> Self {
        let author = author.into();
        let id = id.into();
        let url = format!("https://x.com/{author}/status/{id}");
        Self { id, author, url }
    }

    /// Get the handle with @ prefix.
    #[must_use]
    pub fn at_handle(&self) -> String {
        format!("@{}", self.author)
    }
}

/// An outbound link found under a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyLink {
    /// Status ID of the reply that contains the link.
    pub reply_id: String,
    /// Handle of the reply's author.
    pub reply_author: String,
    /// Link target as it appears in the page (often a t.co short link).
    pub href: String,
    /// Visible anchor text, usually the shortened destination.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    /// The link is in the bookmarked post itself rather than a reply.
    #[serde(default)]
    pub from_post: bool,
}
