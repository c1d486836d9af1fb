//! Link classification.
//!
//! Extracts URLs from free text and recognizes GitHub repository links.

mod github;
mod urls;

pub use github::{extract_github_repos, is_github_host, parse_github_repo, GithubRepo};
pub use urls::{classify, extract_urls, host_of, is_internal, is_shortener, LinkKind};
