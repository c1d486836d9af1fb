//! GitHub repository recognition.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;
use url::Url;

/// Loose match for `github.com/<owner>/<repo>` in free text, with or without scheme.
///
/// The leading group stands in for a word boundary so subdomains such as
/// `docs.github.com` never match.
static GITHUB_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[^A-Za-z0-9.\-/@])((?:https?://)?(?:www\.)?github\.com/[A-Za-z0-9-]{1,39}/[A-Za-z0-9._-]+)")
        .expect("Invalid GitHub pattern")
});

/// First path segments on github.com that are site pages, not users or orgs.
const RESERVED_OWNERS: &[&str] = &[
    "about",
    "apps",
    "blog",
    "codespaces",
    "collections",
    "contact",
    "customer-stories",
    "enterprise",
    "events",
    "explore",
    "features",
    "login",
    "logout",
    "marketplace",
    "new",
    "notifications",
    "organizations",
    "orgs",
    "pricing",
    "pulls",
    "issues",
    "readme",
    "search",
    "security",
    "sessions",
    "settings",
    "signup",
    "site",
    "sponsors",
    "stars",
    "team",
    "topics",
    "trending",
    "users",
];

/// A reference to a GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GithubRepo {
    /// User or organization login.
    pub owner: String,
    /// Repository name.
    pub name: String,
}

impl GithubRepo {
    /// Validate an owner/name pair and build a repository reference.
    ///
    /// A trailing `.git` and trailing dots are stripped from the name.
    pub fn new(owner: &str, name: &str) -> Option<Self> {
        if !is_valid_owner(owner) {
            return None;
        }

        let name = name.strip_suffix(".git").unwrap_or(name);
        let name = name.trim_end_matches('.');
        if !is_valid_repo_name(name) {
            return None;
        }

        Some(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    /// `owner/name`.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// Canonical repository URL.
    #[must_use]
    pub fn url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.name)
    }

    /// Case-insensitive identity, GitHub treats `Foo/Bar` and `foo/bar` as one repo.
    #[must_use]
    pub fn key(&self) -> String {
        self.full_name().to_lowercase()
    }
}

impl fmt::Display for GithubRepo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Parse a single URL (or schemeless `github.com/...` string) into a repository.
///
/// Deeper paths like `/blob/main/README.md`, query strings and fragments are ignored.
pub fn parse_github_repo(input: &str) -> Option<GithubRepo> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let lower = trimmed.to_ascii_lowercase();
    let candidate = if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let url = Url::parse(&candidate).ok()?;
    if !is_github_host(url.host_str()?) {
        return None;
    }

    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
    let owner = segments.next()?;
    let name = segments.next()?;
    GithubRepo::new(owner, name)
}

/// Find every GitHub repository referenced in free text.
///
/// Results are deduplicated case-insensitively, in order of first appearance.
/// A reference cut off by an ellipsis (`github.com/foo/ba…`) is skipped since
/// the name may be incomplete.
pub fn extract_github_repos(text: &str) -> Vec<GithubRepo> {
    let mut seen = HashSet::new();
    let mut repos = Vec::new();

    for caps in GITHUB_PATTERN.captures_iter(text) {
        let Some(m) = caps.get(1) else { continue };

        if text[m.end()..].starts_with('…') {
            tracing::debug!(candidate = m.as_str(), "Skipping truncated GitHub reference");
            continue;
        }

        if let Some(repo) = parse_github_repo(m.as_str()) {
            if seen.insert(repo.key()) {
                repos.push(repo);
            }
        }
    }

    repos
}

/// Whether a host is github.com.
pub fn is_github_host(host: &str) -> bool {
    host.eq_ignore_ascii_case("github.com") || host.eq_ignore_ascii_case("www.github.com")
}

fn is_valid_owner(owner: &str) -> bool {
    !owner.is_empty()
        && owner.len() <= 39
        && !owner.starts_with('-')
        && owner.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        && !RESERVED_OWNERS.contains(&owner.to_ascii_lowercase().as_str())
}

fn is_valid_repo_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}
