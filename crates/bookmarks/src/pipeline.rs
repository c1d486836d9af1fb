//! Harvest pipeline - orchestrates the full login-collect-resolve-write flow.

use std::collections::HashSet;

use crate::auth::Authenticator;
use crate::browser::{ChromeBrowser, LaunchOptions};
use crate::config::{HarvestConfig, ResolveMode};
use crate::error::{Error, Result};
use crate::output::{HarvestReport, LinkRecord, PostRecord, ReportWriter};
use crate::resolve::{resolve_with_hint, BrowserResolver, HttpResolver, LinkResolver};
use crate::twitter::{BookmarkCollector, CollectOptions};

/// Result of a harvest run.
#[derive(Debug, Default)]
pub struct HarvestRun {
    /// Posts found on the bookmarks timeline.
    pub bookmarks_found: usize,
    /// Posts opened.
    pub posts_visited: usize,
    /// Posts skipped because they were already in the report.
    pub posts_skipped: usize,
    /// Links found in replies.
    pub links_found: usize,
    /// Links resolved without error.
    pub links_resolved: usize,
    /// Links pointing at GitHub repositories.
    pub github_links: usize,
    /// Errors encountered.
    pub errors: Vec<String>,
    /// The report as written to disk.
    pub report: HarvestReport,
}

/// Harvest orchestrator.
pub struct Harvester {
    config: HarvestConfig,
}

impl Harvester {
    #[must_use]
    pub fn new(config: HarvestConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    /// Launch a browser, log in, harvest and write the report.
    pub async fn run(&self) -> Result<HarvestRun> {
        self.config.validate()?;

        let writer = ReportWriter::new(&self.config.output, self.config.overwrite);
        let seen = if self.config.skip_seen {
            let ids = writer.load_existing()?.post_ids();
            tracing::debug!(count = ids.len(), "Loaded already harvested posts");
            ids
        } else {
            HashSet::new()
        };

        let browser = ChromeBrowser::launch(&LaunchOptions {
            headless: self.config.headless,
            chrome_path: self.config.chrome_path.clone(),
            ..Default::default()
        })
        .await?;

        let result = self.run_in_browser(&browser, &writer, &seen).await;

        if let Err(e) = browser.close().await {
            tracing::warn!(error = %e, "Failed to close browser");
        }
        result
    }

    /// Log in with a fresh tab and save the session, without harvesting.
    pub async fn login_only(&self) -> Result<()> {
        let browser = ChromeBrowser::launch(&LaunchOptions {
            headless: self.config.headless,
            chrome_path: self.config.chrome_path.clone(),
            ..Default::default()
        })
        .await?;

        let result = async {
            let tab = browser.new_tab("about:blank").await?;
            let auth = Authenticator::new(&tab, &self.config.credentials, &self.config.timing);
            match &self.config.session_path {
                Some(path) => auth.ensure_session(path).await.map(|_| ()),
                None => auth.login().await,
            }
        }
        .await;

        if let Err(e) = browser.close().await {
            tracing::warn!(error = %e, "Failed to close browser");
        }
        result
    }

    async fn run_in_browser(
        &self,
        browser: &ChromeBrowser,
        writer: &ReportWriter,
        seen: &HashSet<String>,
    ) -> Result<HarvestRun> {
        let timing = &self.config.timing;
        let tab = browser.new_tab("about:blank").await?;

        let auth = Authenticator::new(&tab, &self.config.credentials, timing);
        match &self.config.session_path {
            Some(path) => {
                auth.ensure_session(path).await?;
            }
            None => auth.login().await?,
        }

        let mut resolver: Box<dyn LinkResolver> = match self.config.resolve_mode {
            ResolveMode::Browser => Box::new(BrowserResolver::new(
                browser.new_tab("about:blank").await?,
                timing.clone(),
            )),
            ResolveMode::Http => Box::new(HttpResolver::new(timing.resolve_timeout)?),
        };
        tracing::debug!(resolver = resolver.name(), "Resolver ready");

        let collector = BookmarkCollector::new(&tab, CollectOptions::from(&self.config), timing);

        let mut run = HarvestRun::default();
        let report = self
            .harvest(&collector, resolver.as_mut(), seen, &mut run)
            .await?;
        run.report = writer.write(&report)?;

        tracing::info!(
            bookmarks = run.bookmarks_found,
            visited = run.posts_visited,
            skipped = run.posts_skipped,
            links = run.links_found,
            github = run.github_links,
            errors = run.errors.len(),
            "Harvest complete"
        );
        Ok(run)
    }

    /// Collect bookmarks and build the report for this run.
    ///
    /// Per-post and per-link failures are recorded on `run`. Losing the login
    /// mid-run stops visiting posts but keeps what was harvested so far.
    pub async fn harvest(
        &self,
        collector: &BookmarkCollector<'_>,
        resolver: &mut dyn LinkResolver,
        seen: &HashSet<String>,
        run: &mut HarvestRun,
    ) -> Result<HarvestReport> {
        let posts = collector.collect_bookmarks().await?;
        run.bookmarks_found = posts.len();

        let mut report = HarvestReport::new();
        let total = posts.len();

        for (index, post) in posts.into_iter().enumerate() {
            if seen.contains(&post.id) {
                tracing::debug!(id = %post.id, "Already harvested, skipping");
                run.posts_skipped += 1;
                continue;
            }

            tracing::info!(
                id = %post.id,
                author = %post.at_handle(),
                progress = format!("{}/{total}", index + 1),
                "Processing bookmark"
            );

            let links = match collector.harvest_post(&post).await {
                Ok(links) => links,
                Err(Error::Auth(msg)) => {
                    tracing::error!(id = %post.id, error = %msg, "Lost login, stopping");
                    run.errors.push(format!("{}: {msg}", post.id));
                    break;
                }
                Err(e) => {
                    tracing::warn!(id = %post.id, error = %e, "Failed to harvest post");
                    run.errors.push(format!("{}: {e}", post.id));
                    continue;
                }
            };
            run.posts_visited += 1;
            run.links_found += links.len();

            let mut records = Vec::with_capacity(links.len());
            for link in &links {
                let resolution =
                    resolve_with_hint(resolver, &link.href, link.display.as_deref()).await;

                if let Some(err) = &resolution.error {
                    run.errors.push(format!("{}: {}: {err}", post.id, link.href));
                } else {
                    run.links_resolved += 1;
                }

                let record = LinkRecord::new(link, &resolution);
                if let Some(repo) = &record.github {
                    tracing::info!(id = %post.id, repo = %repo, "Found GitHub repository");
                    run.github_links += 1;
                } else if self.config.github_only {
                    continue;
                }
                records.push(record);
            }

            report.add_post(PostRecord::new(&post, records));
        }

        Ok(report)
    }
}
