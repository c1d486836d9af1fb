//! Bookmarks CLI - harvest links from the replies to your X bookmarks.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bookmarks::browser::{ChromeBrowser, LaunchOptions};
use bookmarks::config::{Credentials, HarvestConfig, ResolveMode, Timing};
use bookmarks::links::{classify, extract_github_repos, extract_urls, LinkKind};
use bookmarks::output::{print_summary, ReportWriter};
use bookmarks::pipeline::{HarvestRun, Harvester};
use bookmarks::resolve::{BrowserResolver, HttpResolver, LinkResolver};

/// Bookmarks CLI - Find the repositories people link in replies to your X bookmarks.
#[derive(Parser)]
#[command(name = "bookmarks")]
#[command(about = "Harvest links from replies to X bookmarks")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Browser and login options.
#[derive(Args)]
pub struct BrowserArgs {
    /// X username, handle or email
    #[arg(long, env = "X_USERNAME")]
    username: Option<String>,

    /// X password
    #[arg(long, env = "X_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Email or phone for X's account confirmation prompt
    #[arg(long, env = "X_EMAIL")]
    email: Option<String>,

    /// Saved session (cookies) file
    #[arg(long, env = "BOOKMARKS_SESSION", default_value = ".x-session.json")]
    session: PathBuf,

    /// Always log in with credentials and don't save cookies
    #[arg(long)]
    no_session: bool,

    /// Show the browser window
    #[arg(long, env = "BOOKMARKS_HEADED", value_parser = clap::builder::FalseyValueParser::new())]
    headed: bool,

    /// Chromium/Chrome executable
    #[arg(long, env = "CHROME_PATH")]
    chrome_path: Option<PathBuf>,
}

impl BrowserArgs {
    fn apply(self, config: &mut HarvestConfig) {
        let mut credentials = Credentials::new(
            self.username.unwrap_or_default(),
            self.password.unwrap_or_default(),
        );
        credentials.email = self.email;

        config.credentials = credentials;
        config.session_path = (!self.no_session).then_some(self.session);
        config.headless = !self.headed;
        config.chrome_path = self.chrome_path;
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in, scan bookmarks and write the report
    Harvest {
        #[command(flatten)]
        browser: BrowserArgs,

        /// Report file
        #[arg(short, long, env = "BOOKMARKS_OUTPUT", default_value = "bookmarks.json")]
        output: PathBuf,

        /// Max bookmarks to process
        #[arg(long, default_value = "50")]
        max_bookmarks: usize,

        /// Max timeline scrolls
        #[arg(long, default_value = "40")]
        max_scrolls: usize,

        /// Stop after this many scrolls without new bookmarks
        #[arg(long, default_value = "3")]
        idle_scrolls: usize,

        /// Scrolls per post to load more replies
        #[arg(long, default_value = "2")]
        reply_scrolls: usize,

        /// How to follow short links
        #[arg(long, value_enum, default_value_t = ResolveMode::Browser)]
        resolve: ResolveMode,

        /// Also harvest links in the bookmarked post itself
        #[arg(long)]
        include_post: bool,

        /// Only keep replies by the post's author
        #[arg(long)]
        author_only: bool,

        /// Only keep links to GitHub repositories
        #[arg(long)]
        github_only: bool,

        /// Skip posts already in the report
        #[arg(long)]
        skip_seen: bool,

        /// Replace the report instead of merging into it
        #[arg(long)]
        overwrite: bool,

        /// Repositories to list in the summary
        #[arg(long, default_value = "20")]
        top: usize,
    },

    /// Log in and save the session only
    Login {
        #[command(flatten)]
        browser: BrowserArgs,
    },

    /// Find GitHub repositories in text (argument, file, or stdin)
    Extract {
        /// Text to scan
        text: Option<String>,

        /// Read text from a file
        #[arg(long, conflicts_with = "text")]
        file: Option<PathBuf>,
    },

    /// Resolve links to their final destination
    Resolve {
        /// Links to resolve
        #[arg(required = true)]
        urls: Vec<String>,

        /// How to follow the links
        #[arg(long, value_enum, default_value_t = ResolveMode::Http)]
        mode: ResolveMode,

        /// Show the browser window (browser mode)
        #[arg(long)]
        headed: bool,

        /// Chromium/Chrome executable (browser mode)
        #[arg(long, env = "CHROME_PATH")]
        chrome_path: Option<PathBuf>,
    },

    /// Print the summary of an existing report
    Summary {
        /// Report file
        #[arg(short, long, env = "BOOKMARKS_OUTPUT", default_value = "bookmarks.json")]
        output: PathBuf,

        /// Repositories to list
        #[arg(long, default_value = "20")]
        top: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Values from .env become defaults for the env-backed flags.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    match cli.command {
        Commands::Harvest {
            browser,
            output,
            max_bookmarks,
            max_scrolls,
            idle_scrolls,
            reply_scrolls,
            resolve,
            include_post,
            author_only,
            github_only,
            skip_seen,
            overwrite,
            top,
        } => {
            let mut config = HarvestConfig {
                output,
                max_bookmarks,
                max_scrolls,
                idle_scroll_limit: idle_scrolls,
                reply_scrolls,
                resolve_mode: resolve,
                include_post,
                author_only,
                github_only,
                skip_seen,
                overwrite,
                ..Default::default()
            };
            browser.apply(&mut config);

            tracing::info!(
                output = %config.output.display(),
                max_bookmarks,
                resolve = ?config.resolve_mode,
                headless = config.headless,
                "Starting harvest"
            );
            run_harvest(config, top).await
        }
        Commands::Login { browser } => {
            let mut config = HarvestConfig::default();
            browser.apply(&mut config);
            run_login(config).await
        }
        Commands::Extract { text, file } => run_extract(text, file),
        Commands::Resolve {
            urls,
            mode,
            headed,
            chrome_path,
        } => run_resolve(urls, mode, headed, chrome_path).await,
        Commands::Summary { output, top } => {
            let report = ReportWriter::load(&output)
                .with_context(|| format!("Failed to read report {}", output.display()))?;
            print_summary(&report, top);
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("bookmarks=debug,info")
        } else {
            EnvFilter::new("bookmarks=info,warn")
        }
    });

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run_harvest(config: HarvestConfig, top: usize) -> Result<()> {
    let harvester = Harvester::new(config);
    let run = harvester.run().await.context("Harvest failed")?;

    print_run(&run);
    print_summary(&run.report, top);
    println!(
        "\n{} {}",
        "✅ Report written to".green(),
        harvester.config().output.display()
    );
    Ok(())
}

fn print_run(run: &HarvestRun) {
    println!("\n{}", "🔖 This Run".bold());
    println!("   Bookmarks: {}", run.bookmarks_found);
    println!("   Visited: {}", run.posts_visited);
    if run.posts_skipped > 0 {
        println!("   Skipped (already harvested): {}", run.posts_skipped);
    }
    println!("   Links: {}", run.links_found);
    println!("   Resolved: {}", run.links_resolved);
    println!("   GitHub links: {}", run.github_links);

    if !run.errors.is_empty() {
        println!("   Errors: {}", run.errors.len().to_string().yellow());
        for err in &run.errors {
            eprintln!("     - {err}");
        }
    }
}

async fn run_login(config: HarvestConfig) -> Result<()> {
    println!("🔐 Logging in to X\n");
    let harvester = Harvester::new(config);
    harvester.login_only().await.context("Login failed")?;

    match &harvester.config().session_path {
        Some(path) => println!("✅ Session saved to: {}", path.display()),
        None => println!("✅ Logged in (session not saved)"),
    }
    Ok(())
}

fn run_extract(text: Option<String>, file: Option<PathBuf>) -> Result<()> {
    let text = match (text, file) {
        (Some(text), _) => text,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, None) => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    let repos = extract_github_repos(&text);
    if repos.is_empty() {
        println!("No GitHub repositories found.");
    } else {
        for repo in &repos {
            println!("{} {}", repo.full_name().bold(), repo.url().dimmed());
        }
    }

    let others: Vec<_> = extract_urls(&text)
        .into_iter()
        .filter(|url| !matches!(classify(url), LinkKind::GithubRepo(_)))
        .collect();
    if !others.is_empty() {
        println!("\nOther links:");
        for url in others {
            println!("   {url} ({})", classify(&url).label());
        }
    }

    Ok(())
}

async fn run_resolve(
    urls: Vec<String>,
    mode: ResolveMode,
    headed: bool,
    chrome_path: Option<PathBuf>,
) -> Result<()> {
    let timing = Timing::default();

    match mode {
        ResolveMode::Http => {
            let mut resolver = HttpResolver::new(timing.resolve_timeout)?;
            resolve_all(&mut resolver, &urls).await;
        }
        ResolveMode::Browser => {
            let browser = ChromeBrowser::launch(&LaunchOptions {
                headless: !headed,
                chrome_path,
                ..Default::default()
            })
            .await?;
            let tab = browser.new_tab("about:blank").await?;
            let mut resolver = BrowserResolver::new(tab, timing);
            resolve_all(&mut resolver, &urls).await;
            browser.close().await?;
        }
    }

    Ok(())
}

async fn resolve_all(resolver: &mut dyn LinkResolver, urls: &[String]) {
    for url in urls {
        let resolution = resolver.resolve(url).await;
        let kind = classify(&resolution.final_url);

        match &resolution.error {
            Some(err) => println!("{} {url}\n   {}", "✗".red(), err.red()),
            None => println!(
                "{} {url}\n   → {} ({})",
                "✓".green(),
                resolution.final_url.bold(),
                kind.label()
            ),
        }
    }
}
