//! Report output.
//!
//! Merges harvest results into a JSON report and prints summaries.

mod report;
mod summary;
mod writer;

pub use report::{HarvestReport, LinkRecord, PostRecord, RepoSummary};
pub use summary::{print_summary, render_summary};
pub use writer::{backup_path, ReportWriter};
