//! Harvest report model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::links::{parse_github_repo, GithubRepo};
use crate::resolve::Resolution;
use crate::twitter::{PostRef, ReplyLink};

/// One harvested link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    /// Link as found on the page.
    pub href: String,
    /// Anchor text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    /// Destination after redirects.
    pub final_url: String,
    /// Reply the link was found in.
    pub reply_id: String,
    /// Author of that reply.
    pub reply_author: String,
    /// Found in the bookmarked post rather than a reply.
    #[serde(default)]
    pub from_post: bool,
    /// GitHub repository the link points at.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github: Option<GithubRepo>,
    /// Resolution error, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LinkRecord {
    /// Combine a found link with its resolution.
    ///
    /// The repository is taken from the destination, falling back to the
    /// original link when resolution failed.
    #[must_use]
    pub fn new(link: &ReplyLink, resolution: &Resolution) -> Self {
        let github =
            parse_github_repo(&resolution.final_url).or_else(|| parse_github_repo(&link.href));

        Self {
            href: link.href.clone(),
            display: link.display.clone(),
            final_url: resolution.final_url.clone(),
            reply_id: link.reply_id.clone(),
            reply_author: link.reply_author.clone(),
            from_post: link.from_post,
            github,
            error: resolution.error.clone(),
        }
    }

    fn key(&self) -> (&str, &str) {
        (&self.href, &self.reply_id)
    }
}

/// A bookmarked post and the links found under it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    /// Status ID.
    pub id: String,
    /// Author handle.
    pub author: String,
    /// Post URL.
    pub url: String,
    /// When the post was last visited.
    pub harvested_at: DateTime<Utc>,
    /// Links found.
    #[serde(default)]
    pub links: Vec<LinkRecord>,
}

impl PostRecord {
    #[must_use]
    pub fn new(post: &PostRef, links: Vec<LinkRecord>) -> Self {
        Self {
            id: post.id.clone(),
            author: post.author.clone(),
            url: post.url.clone(),
            harvested_at: Utc::now(),
            links,
        }
    }

    /// Links that point at GitHub repositories.
    pub fn github_links(&self) -> impl Iterator<Item = &LinkRecord> {
        self.links.iter().filter(|l| l.github.is_some())
    }

    /// Union links from a newer visit; newer data wins per `(href, reply_id)`.
    fn absorb(&mut self, newer: PostRecord) {
        self.author = newer.author;
        self.url = newer.url;
        self.harvested_at = self.harvested_at.max(newer.harvested_at);

        for link in newer.links {
            match self.links.iter_mut().find(|l| l.key() == link.key()) {
                Some(existing) => *existing = link,
                None => self.links.push(link),
            }
        }
    }
}

/// A GitHub repository and where it was mentioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoSummary {
    /// `owner/name`.
    pub full_name: String,
    /// Repository URL.
    pub url: String,
    /// Number of links pointing at it.
    pub mentions: usize,
    /// Post IDs it was found under.
    pub posts: Vec<String>,
}

/// The JSON document written by a harvest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestReport {
    /// When the report was last written.
    pub generated_at: DateTime<Utc>,
    /// Harvested posts.
    #[serde(default)]
    pub posts: Vec<PostRecord>,
    /// GitHub repositories across all posts, most mentioned first.
    #[serde(default)]
    pub github_repos: Vec<RepoSummary>,
}

impl Default for HarvestReport {
    fn default() -> Self {
        Self::new()
    }
}

impl HarvestReport {
    #[must_use]
    pub fn new() -> Self {
        Self {
            generated_at: Utc::now(),
            posts: Vec::new(),
            github_repos: Vec::new(),
        }
    }

    /// Add a post, merging with an existing record for the same ID.
    pub fn add_post(&mut self, record: PostRecord) {
        match self.posts.iter_mut().find(|p| p.id == record.id) {
            Some(existing) => existing.absorb(record),
            None => self.posts.push(record),
        }
        self.rebuild_repos();
    }

    /// Merge a newer report into this one.
    pub fn merge(&mut self, newer: HarvestReport) {
        for record in newer.posts {
            match self.posts.iter_mut().find(|p| p.id == record.id) {
                Some(existing) => existing.absorb(record),
                None => self.posts.push(record),
            }
        }
        self.generated_at = self.generated_at.max(newer.generated_at);
        self.rebuild_repos();
    }

    /// Recompute `github_repos` from the posts.
    pub fn rebuild_repos(&mut self) {
        let mut by_key: HashMap<String, RepoSummary> = HashMap::new();

        for post in &self.posts {
            for repo in post.github_links().filter_map(|l| l.github.as_ref()) {
                let summary = by_key.entry(repo.key()).or_insert_with(|| RepoSummary {
                    full_name: repo.full_name(),
                    url: repo.url(),
                    mentions: 0,
                    posts: Vec::new(),
                });
                summary.mentions += 1;
                if !summary.posts.contains(&post.id) {
                    summary.posts.push(post.id.clone());
                }
            }
        }

        let mut repos: Vec<_> = by_key.into_values().collect();
        repos.sort_by(|a, b| {
            b.mentions
                .cmp(&a.mentions)
                .then_with(|| a.full_name.to_lowercase().cmp(&b.full_name.to_lowercase()))
        });
        self.github_repos = repos;
    }

    /// IDs of all posts in the report.
    #[must_use]
    pub fn post_ids(&self) -> HashSet<String> {
        self.posts.iter().map(|p| p.id.clone()).collect()
    }

    /// Total number of links.
    #[must_use]
    pub fn link_count(&self) -> usize {
        self.posts.iter().map(|p| p.links.len()).sum()
    }
}
