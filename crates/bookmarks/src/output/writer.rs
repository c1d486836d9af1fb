//! Persisting reports to disk.

use std::path::{Path, PathBuf};

use super::report::HarvestReport;
use crate::error::Result;

/// Writes harvest reports as JSON, merging into and backing up the previous file.
pub struct ReportWriter {
    path: PathBuf,
    overwrite: bool,
}

impl ReportWriter {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, overwrite: bool) -> Self {
        Self {
            path: path.into(),
            overwrite,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load a report. A missing file is an empty report.
    pub fn load(path: &Path) -> Result<HarvestReport> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let report: HarvestReport = serde_json::from_str(&content)?;
            Ok(report)
        } else {
            Ok(HarvestReport::new())
        }
    }

    /// Load the report at this writer's path.
    pub fn load_existing(&self) -> Result<HarvestReport> {
        Self::load(&self.path)
    }

    /// Write a report and return what ended up on disk.
    ///
    /// Unless overwriting, the report is merged into the existing file. The
    /// previous file is kept as `<stem>.bak.json`.
    pub fn write(&self, report: &HarvestReport) -> Result<HarvestReport> {
        let exists = self.path.exists();

        let merged = if exists && !self.overwrite {
            let mut existing = Self::load(&self.path)?;
            existing.merge(report.clone());
            existing
        } else {
            let mut fresh = report.clone();
            fresh.rebuild_repos();
            fresh
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        if exists {
            let backup = backup_path(&self.path);
            std::fs::copy(&self.path, &backup)?;
            tracing::debug!(backup = %backup.display(), "Backed up previous report");
        }

        let content = serde_json::to_string_pretty(&merged)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;

        tracing::info!(
            path = %self.path.display(),
            posts = merged.posts.len(),
            repos = merged.github_repos.len(),
            "Wrote report"
        );
        Ok(merged)
    }
}

/// `bookmarks.json` → `bookmarks.bak.json`.
pub fn backup_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map_or_else(|| "report".into(), |s| s.to_string_lossy().into_owned());
    path.with_file_name(format!("{stem}.bak.json"))
}
