//! Console summary of a report.

use colored::Colorize;
use std::fmt::Write;

use super::report::HarvestReport;

/// Render the report summary shown after a run.
pub fn render_summary(report: &HarvestReport, limit: usize) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "\n{}", "📊 Bookmark Harvest".bold());
    let _ = writeln!(out, "   Posts: {}", report.posts.len());
    let _ = writeln!(out, "   Links: {}", report.link_count());
    let failed = report
        .posts
        .iter()
        .flat_map(|p| &p.links)
        .filter(|l| l.error.is_some())
        .count();
    if failed > 0 {
        let _ = writeln!(out, "   Unresolved: {}", failed.to_string().yellow());
    }
    let _ = writeln!(
        out,
        "   GitHub repositories: {}",
        report.github_repos.len().to_string().green()
    );

    if report.github_repos.is_empty() {
        return out;
    }

    let _ = writeln!(out);
    for repo in report.github_repos.iter().take(limit) {
        let _ = writeln!(
            out,
            "   {} {} {}",
            "•".cyan(),
            repo.full_name.bold(),
            format!("({}x)", repo.mentions).dimmed()
        );
        let _ = writeln!(out, "     {}", repo.url.dimmed());
    }

    let hidden = report.github_repos.len().saturating_sub(limit);
    if hidden > 0 {
        let _ = writeln!(out, "   … and {hidden} more");
    }

    out
}

/// Print the report summary to stdout.
pub fn print_summary(report: &HarvestReport, limit: usize) {
    print!("{}", render_summary(report, limit));
}
