//! URL extraction and host classification.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

use super::github::{is_github_host, parse_github_repo, GithubRepo};

static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>"'`]+"#).expect("Invalid URL pattern"));

/// Characters that end a sentence rather than a URL.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '}', '\'', '"'];

/// Known link shorteners whose real destination needs resolving.
const SHORTENER_HOSTS: &[&str] = &[
    "t.co",
    "bit.ly",
    "buff.ly",
    "cutt.ly",
    "dlvr.it",
    "git.io",
    "goo.gl",
    "is.gd",
    "lnkd.in",
    "ow.ly",
    "rb.gy",
    "shorturl.at",
    "tiny.cc",
    "tinyurl.com",
];

/// X's own hosts. Links to them are navigation, not outbound links.
const INTERNAL_HOSTS: &[&str] = &["x.com", "twitter.com"];

/// What a URL points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkKind {
    /// A GitHub repository page.
    GithubRepo(GithubRepo),
    /// github.com, but not a repository (profile, docs, marketing).
    Github,
    /// A link shortener.
    Shortener,
    /// An X / Twitter page.
    Internal,
    /// Anything else.
    External,
}

impl LinkKind {
    /// Short label for logs and console output.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::GithubRepo(_) => "github-repo",
            Self::Github => "github",
            Self::Shortener => "shortener",
            Self::Internal => "internal",
            Self::External => "external",
        }
    }
}

/// Extract every `http(s)` URL from text, in order, without duplicates.
///
/// URLs cut off with `…` are dropped; the visible part is not the real link.
pub fn extract_urls(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    URL_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(TRAILING_PUNCTUATION))
        .filter(|url| {
            if url.contains('…') {
                tracing::debug!(url, "Skipping truncated URL");
                return false;
            }
            url.len() > "https://".len()
        })
        .filter(|url| seen.insert(url.to_string()))
        .map(ToString::to_string)
        .collect()
}

/// Lowercased host of a URL, if it parses.
pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
}

/// Whether the URL points at X / Twitter itself.
pub fn is_internal(url: &str) -> bool {
    host_of(url).is_some_and(|host| {
        INTERNAL_HOSTS
            .iter()
            .any(|h| host == *h || host.ends_with(&format!(".{h}")))
    })
}

/// Whether the URL is on a known shortener.
pub fn is_shortener(url: &str) -> bool {
    host_of(url).is_some_and(|host| SHORTENER_HOSTS.contains(&host.as_str()))
}

/// Classify a URL. Unparseable input is `External`.
pub fn classify(url: &str) -> LinkKind {
    if let Some(repo) = parse_github_repo(url) {
        return LinkKind::GithubRepo(repo);
    }

    let Some(host) = host_of(url) else {
        return LinkKind::External;
    };

    if is_github_host(&host) {
        LinkKind::Github
    } else if SHORTENER_HOSTS.contains(&host.as_str()) {
        LinkKind::Shortener
    } else if is_internal(url) {
        LinkKind::Internal
    } else {
        LinkKind::External
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_urls_trims_punctuation() {
        let text = "Repo: https://github.com/a/b. Docs (https://example.com/docs), \
                    again https://github.com/a/b and https://example.com/long/pa…";
        assert_eq!(
            extract_urls(text),
            vec!["https://github.com/a/b", "https://example.com/docs"]
        );
    }

    #[test]
    fn test_extract_urls_ignores_bare_scheme() {
        assert!(extract_urls("just https:// nothing").is_empty());
        assert!(extract_urls("no links here").is_empty());
    }

    #[test]
    fn test_internal_and_shortener_hosts() {
        assert!(is_internal("https://x.com/user/status/1"));
        assert!(is_internal("https://mobile.twitter.com/user"));
        assert!(!is_internal("https://t.co/abc"));
        assert!(!is_internal("https://netflix.com"));
        assert!(is_shortener("https://t.co/abc"));
        assert!(is_shortener("https://BIT.LY/xyz"));
        assert!(!is_shortener("https://example.com"));
    }

    #[test]
    fn test_classify() {
        assert!(matches!(
            classify("https://github.com/tokio-rs/axum/tree/main"),
            LinkKind::GithubRepo(r) if r.full_name() == "tokio-rs/axum"
        ));
        assert_eq!(classify("https://github.com/trending"), LinkKind::Github);
        assert_eq!(classify("https://t.co/xyz"), LinkKind::Shortener);
        assert_eq!(classify("https://x.com/home"), LinkKind::Internal);
        assert_eq!(classify("https://crates.io/crates/url"), LinkKind::External);
        assert_eq!(classify("::garbage::"), LinkKind::External);
        assert_eq!(classify("https://t.co/xyz").label(), "shortener");
    }
}
