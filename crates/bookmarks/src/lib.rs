//! X bookmark harvester.
//!
//! This crate provides:
//! - Scripted login to the X web UI using browser automation
//! - Bookmark timeline scrolling and reply link harvesting
//! - Redirect resolution through a browser tab or plain HTTP
//! - GitHub repository recognition
//! - A merged JSON report with a per-repository summary

pub mod auth;
pub mod browser;
pub mod config;
pub mod error;
pub mod links;
pub mod output;
pub mod pipeline;
pub mod resolve;
pub mod twitter;

// Re-export main types
pub use auth::{Authenticator, Session};
pub use config::{Credentials, HarvestConfig, ResolveMode, Timing};
pub use error::{Error, Result};
pub use links::{classify, extract_github_repos, GithubRepo, LinkKind};
pub use output::{HarvestReport, ReportWriter};
pub use pipeline::{HarvestRun, Harvester};
pub use resolve::{LinkResolver, Resolution};
pub use twitter::{PostRef, ReplyLink};
