//! Bookmark timeline collection and per-post reply harvesting.

use std::collections::HashSet;

use super::parser::{BookmarkParser, ThreadParser};
use super::types::{PostRef, ReplyLink};
use crate::browser::{settle, Tab};
use crate::config::{HarvestConfig, Timing};
use crate::error::{Error, Result};

/// Bookmarks timeline.
pub const BOOKMARKS_URL: &str = "https://x.com/i/bookmarks";

/// Limits for timeline and reply scrolling.
#[derive(Debug, Clone)]
pub struct CollectOptions {
    /// Stop after this many posts.
    pub max_bookmarks: usize,
    /// Upper bound on timeline scrolls.
    pub max_scrolls: usize,
    /// Stop after this many scrolls in a row found nothing new.
    pub idle_scroll_limit: usize,
    /// Extra scrolls on each post page.
    pub reply_scrolls: usize,
    /// Pixels per scroll.
    pub scroll_step: i64,
    /// Also return links in the bookmarked post.
    pub include_post: bool,
    /// Only keep replies by the post's author.
    pub author_only: bool,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self::from(&HarvestConfig::default())
    }
}

impl From<&HarvestConfig> for CollectOptions {
    fn from(config: &HarvestConfig) -> Self {
        Self {
            max_bookmarks: config.max_bookmarks,
            max_scrolls: config.max_scrolls,
            idle_scroll_limit: config.idle_scroll_limit.max(1),
            reply_scrolls: config.reply_scrolls,
            scroll_step: config.scroll_step,
            include_post: config.include_post,
            author_only: config.author_only,
        }
    }
}

/// Walks the bookmarks timeline and the posts on it.
pub struct BookmarkCollector<'a> {
    tab: &'a dyn Tab,
    options: CollectOptions,
    timing: &'a Timing,
}

impl<'a> BookmarkCollector<'a> {
    #[must_use]
    pub fn new(tab: &'a dyn Tab, options: CollectOptions, timing: &'a Timing) -> Self {
        Self {
            tab,
            options,
            timing,
        }
    }

    /// Scroll the bookmarks timeline and collect post references.
    pub async fn collect_bookmarks(&self) -> Result<Vec<PostRef>> {
        tracing::info!("Opening bookmarks");
        self.tab.goto(BOOKMARKS_URL).await?;
        settle(self.timing.navigation_settle).await;
        self.ensure_not_login().await?;

        let mut seen = HashSet::new();
        let mut posts = Vec::new();
        let mut scrolls = 0;
        let mut idle = 0;

        loop {
            let html = self.tab.content().await?;
            let mut added = 0;
            for post in BookmarkParser::post_refs(&html) {
                if posts.len() >= self.options.max_bookmarks {
                    break;
                }
                if seen.insert(post.id.clone()) {
                    posts.push(post);
                    added += 1;
                }
            }
            tracing::debug!(added, total = posts.len(), scrolls, "Scanned timeline");

            if posts.len() >= self.options.max_bookmarks {
                tracing::debug!("Reached bookmark limit");
                break;
            }

            if added == 0 {
                idle += 1;
                if idle >= self.options.idle_scroll_limit {
                    tracing::debug!(idle, "Timeline stopped growing");
                    break;
                }
            } else {
                idle = 0;
            }

            if scrolls >= self.options.max_scrolls {
                tracing::debug!(scrolls, "Reached scroll limit");
                break;
            }

            self.tab.scroll_by(self.options.scroll_step).await?;
            scrolls += 1;
            settle(self.timing.scroll_pause).await;
        }

        tracing::info!(count = posts.len(), scrolls, "Collected bookmarks");
        Ok(posts)
    }

    /// Open a post and collect the outbound links in its replies.
    pub async fn harvest_post(&self, post: &PostRef) -> Result<Vec<ReplyLink>> {
        tracing::debug!(id = %post.id, url = %post.url, "Opening post");
        self.tab.goto(&post.url).await?;
        settle(self.timing.navigation_settle).await;
        self.ensure_not_login().await?;

        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for round in 0..=self.options.reply_scrolls {
            let html = self.tab.content().await?;
            for link in ThreadParser::reply_links(&html, post, self.options.include_post) {
                if self.options.author_only
                    && !link.from_post
                    && !link.reply_author.eq_ignore_ascii_case(&post.author)
                {
                    continue;
                }
                if seen.insert((link.reply_id.clone(), link.href.clone())) {
                    links.push(link);
                }
            }

            if round < self.options.reply_scrolls {
                self.tab.scroll_by(self.options.scroll_step).await?;
                settle(self.timing.scroll_pause).await;
            }
        }

        tracing::info!(id = %post.id, links = links.len(), "Harvested post");
        Ok(links)
    }

    async fn ensure_not_login(&self) -> Result<()> {
        let url = self.tab.current_url().await?;
        if url.contains("/login") || url.contains("/i/flow") {
            tracing::error!(url, "Redirected to login");
            return Err(Error::Auth(format!(
                "redirected to login page ({url}); the session is not logged in"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::{FakePage, FakeTab};

    fn tweet(author: &str, id: &str, body: &str) -> String {
        format!(
            r#"<article data-testid="tweet"><a href="/{author}/status/{id}">1h</a>
               <div data-testid="tweetText">{body}</div></article>"#
        )
    }

    fn timeline(ids: &[&str]) -> String {
        ids.iter()
            .map(|id| tweet("author", id, "text"))
            .collect::<Vec<_>>()
            .join("")
    }

    fn options() -> CollectOptions {
        CollectOptions {
            max_bookmarks: 10,
            max_scrolls: 10,
            idle_scroll_limit: 2,
            reply_scrolls: 1,
            scroll_step: 800,
            include_post: false,
            author_only: false,
        }
    }

    #[tokio::test]
    async fn test_collect_scrolls_until_idle() {
        let tab = FakeTab::new().with_page(
            BOOKMARKS_URL,
            FakePage::snapshots(vec![
                timeline(&["1", "2"]),
                timeline(&["2", "3"]),
                timeline(&["3", "4"]),
            ]),
        );
        let timing = Timing::fast();

        let posts = BookmarkCollector::new(&tab, options(), &timing)
            .collect_bookmarks()
            .await
            .unwrap();

        let ids: Vec<_> = posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4"]);
        // Two idle scrolls past the last snapshot.
        assert_eq!(tab.scrolls(), 4);
    }

    #[tokio::test]
    async fn test_collect_respects_limits() {
        let tab = FakeTab::new().with_page(
            BOOKMARKS_URL,
            FakePage::snapshots(vec![timeline(&["1", "2", "3"]), timeline(&["4", "5"])]),
        );
        let timing = Timing::fast();

        let posts = BookmarkCollector::new(
            &tab,
            CollectOptions {
                max_bookmarks: 2,
                ..options()
            },
            &timing,
        )
        .collect_bookmarks()
        .await
        .unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(tab.scrolls(), 0);

        let tab = FakeTab::new().with_page(
            BOOKMARKS_URL,
            FakePage::snapshots(vec![timeline(&["1"]), timeline(&["2"]), timeline(&["3"])]),
        );
        let posts = BookmarkCollector::new(
            &tab,
            CollectOptions {
                max_scrolls: 1,
                ..options()
            },
            &timing,
        )
        .collect_bookmarks()
        .await
        .unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(tab.scrolls(), 1);
    }

    #[tokio::test]
    async fn test_collect_detects_login_redirect() {
        let tab = FakeTab::new()
            .with_page(
                BOOKMARKS_URL,
                FakePage::default().requires_cookie("auth_token", "https://x.com/i/flow/login"),
            )
            .with_page("https://x.com/i/flow/login", FakePage::default());
        let timing = Timing::fast();

        let err = BookmarkCollector::new(&tab, options(), &timing)
            .collect_bookmarks()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }

    #[tokio::test]
    async fn test_harvest_post_merges_scrolled_replies() {
        let post = PostRef::new("alice", "100");
        let first = [
            tweet("alice", "100", r#"<a href="https://t.co/post">post link</a>"#),
            tweet("bob", "101", r#"<a href="https://t.co/one">github.com/bob/one</a>"#),
        ]
        .join("");
        let second = [
            tweet("bob", "101", r#"<a href="https://t.co/one">github.com/bob/one</a>"#),
            tweet("alice", "102", r#"<a href="https://t.co/two">github.com/alice/two</a>"#),
        ]
        .join("");
        let tab = FakeTab::new().with_page(&post.url, FakePage::snapshots(vec![first, second]));
        let timing = Timing::fast();

        let links = BookmarkCollector::new(&tab, options(), &timing)
            .harvest_post(&post)
            .await
            .unwrap();

        let hrefs: Vec<_> = links.iter().map(|l| l.href.as_str()).collect();
        assert_eq!(hrefs, vec!["https://t.co/one", "https://t.co/two"]);
        assert_eq!(tab.scrolls(), 1);
    }

    #[tokio::test]
    async fn test_harvest_post_author_only() {
        let post = PostRef::new("alice", "100");
        let html = [
            tweet("alice", "100", "see replies"),
            tweet("bob", "101", r#"<a href="https://t.co/spam">spam.example</a>"#),
            tweet("Alice", "102", r#"<a href="https://t.co/repo">github.com/alice/repo</a>"#),
        ]
        .join("");
        let tab = FakeTab::new().with_page(&post.url, FakePage::html(html));
        let timing = Timing::fast();

        let links = BookmarkCollector::new(
            &tab,
            CollectOptions {
                author_only: true,
                reply_scrolls: 0,
                ..options()
            },
            &timing,
        )
        .harvest_post(&post)
        .await
        .unwrap();

        assert_eq!(links.len(), 1);
        assert_eq!(links[0].href, "https://t.co/repo");
        assert_eq!(tab.scrolls(), 0);
    }
}
