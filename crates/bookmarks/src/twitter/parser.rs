//! X page HTML parsers.

use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;

use super::types::{PostRef, ReplyLink};
use crate::links::{extract_urls, host_of, is_internal};

// Prefer the stable testid selector; fall back to article containers if X changes markup.
static TWEET: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[data-testid='tweet']").expect("Invalid tweet selector"));
static ARTICLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("article").expect("Invalid article selector"));
static STATUS_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href*='/status/']").expect("Invalid link selector"));
static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("Invalid anchor selector"));
static TWEET_TEXT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[data-testid='tweetText']").expect("Invalid text selector"));
static LANG_TEXT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div[lang]").expect("Invalid lang text selector"));

/// Tweet containers in document order.
fn tweet_containers(document: &Html) -> Vec<ElementRef<'_>> {
    let mut tweets: Vec<_> = document.select(&TWEET).collect();
    if tweets.is_empty() {
        tweets = document.select(&ARTICLE).collect();
    }
    tweets
}

/// The container's own permalink: the first plain `/user/status/id` link in it.
fn container_status(container: ElementRef<'_>) -> Option<(String, String)> {
    container
        .select(&STATUS_LINK)
        .filter_map(|a| a.value().attr("href"))
        .find_map(BookmarkParser::parse_permalink)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parser for bookmark timeline HTML.
pub struct BookmarkParser;

impl BookmarkParser {
    /// Posts on a timeline page, deduplicated by ID, in document order.
    pub fn post_refs(html: &str) -> Vec<PostRef> {
        let document = Html::parse_document(html);
        let containers = tweet_containers(&document);

        if containers.is_empty() {
            tracing::debug!(
                "No tweet containers found (selectors: data-testid=tweet, article). \
                 The page may not have rendered yet."
            );
            return Vec::new();
        }

        let mut seen = HashSet::new();
        let mut posts = Vec::new();
        for container in containers {
            let Some((author, id)) = container_status(container) else {
                tracing::debug!("Tweet missing status link, skipping");
                continue;
            };
            if seen.insert(id.clone()) {
                posts.push(PostRef::new(author, id));
            }
        }

        tracing::debug!(count = posts.len(), "Parsed posts from timeline");
        posts
    }

    /// Parse a status link into `(username, id)`.
    ///
    /// Accepts relative paths (`/user/status/123?s=20`) and absolute x.com or
    /// twitter.com URLs. Sub-pages such as `/photo/1` still yield the post.
    pub fn parse_status_path(href: &str) -> Option<(String, String)> {
        let path = if href.starts_with("http://") || href.starts_with("https://") {
            if !is_internal(href) {
                return None;
            }
            let after_scheme = href.split_once("://").map_or(href, |(_, rest)| rest);
            after_scheme.split_once('/').map_or("", |(_, path)| path)
        } else {
            href
        };

        let path = path.split(['?', '#']).next().unwrap_or(path);
        let parts: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        if parts.len() < 3 || parts[1] != "status" {
            return None;
        }

        let (user, id) = (parts[0], parts[2]);
        if user.is_empty() || user == "i" || id.is_empty() || !id.chars().all(|c| c.is_ascii_digit())
        {
            return None;
        }
        Some((user.to_string(), id.to_string()))
    }

    /// Like [`Self::parse_status_path`], but only for the post page itself (no sub-page).
    fn parse_permalink(href: &str) -> Option<(String, String)> {
        let path = href.split(['?', '#']).next().unwrap_or(href);
        let segments = path.trim_end_matches('/').rsplit('/').count();
        let is_sub_page = if path.starts_with("http") {
            // scheme, empty, host, user, status, id
            segments > 6
        } else {
            // empty, user, status, id
            segments > 4
        };
        if is_sub_page {
            return None;
        }
        Self::parse_status_path(href)
    }

    /// Extract the status ID from a post URL (full or relative).
    pub fn extract_post_id(url: &str) -> Option<String> {
        Self::parse_status_path(url).map(|(_, id)| id)
    }
}

/// Parser for a single post page and its replies.
pub struct ThreadParser;

impl ThreadParser {
    /// Outbound links in the replies under `post`.
    ///
    /// Containers before the focal post (the thread it replies to) are ignored.
    /// With `include_post`, the focal post's own links are returned as well.
    pub fn reply_links(html: &str, post: &PostRef, include_post: bool) -> Vec<ReplyLink> {
        let document = Html::parse_document(html);
        let containers = tweet_containers(&document);
        if containers.is_empty() {
            return Vec::new();
        }

        let statuses: Vec<_> = containers.iter().map(|c| container_status(*c)).collect();
        let focal = statuses
            .iter()
            .position(|s| s.as_ref().is_some_and(|(_, id)| *id == post.id))
            .unwrap_or(0);

        let mut links = Vec::new();
        for (index, container) in containers.iter().enumerate().skip(focal) {
            let from_post = index == focal;
            if from_post && !include_post {
                continue;
            }

            let (reply_author, reply_id) = if from_post {
                (post.author.clone(), post.id.clone())
            } else if let Some(status) = &statuses[index] {
                status.clone()
            } else {
                tracing::debug!(index, "Reply without status link, skipping");
                continue;
            };

            let found = Self::container_links(*container);
            if !found.is_empty() {
                tracing::debug!(reply_id, count = found.len(), "Found links in reply");
            }

            links.extend(found.into_iter().map(|(href, display)| ReplyLink {
                reply_id: reply_id.clone(),
                reply_author: reply_author.clone(),
                href,
                display,
                from_post,
            }));
        }

        links
    }

    /// Outbound `(href, display text)` pairs in one tweet container.
    fn container_links(container: ElementRef<'_>) -> Vec<(String, Option<String>)> {
        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for anchor in container.select(&ANCHOR) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            if !is_outbound(href) || !seen.insert(href.to_string()) {
                continue;
            }

            let text = collapse_whitespace(&anchor.text().collect::<String>());
            // The anchor text repeats the destination; don't pick it up again below.
            seen.insert(text.trim_end_matches('…').to_string());
            let display = (!text.is_empty()).then_some(text);
            links.push((href.to_string(), display));
        }

        // URLs written as plain text are not always linkified.
        let text = container
            .select(&TWEET_TEXT)
            .next()
            .or_else(|| container.select(&LANG_TEXT).next())
            .map(|el| el.text().collect::<String>())
            .unwrap_or_default();
        for url in extract_urls(&text) {
            if is_outbound(&url) && seen.insert(url.clone()) {
                links.push((url, None));
            }
        }

        links
    }
}

/// Absolute http(s) link leaving X.
fn is_outbound(href: &str) -> bool {
    (href.starts_with("http://") || href.starts_with("https://"))
        && host_of(href).is_some()
        && !is_internal(href)
}
