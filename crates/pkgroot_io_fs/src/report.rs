//! Relocation report models and mutable report builder.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::conf::C_REPORT_PREFIX;
use crate::spec::SpecCopyError;

/// Aggregate counters and diagnostics for one pass or a whole run.
#[derive(Debug, Default, Clone)]
pub struct ReportRelocate {
    /// Total scanned source entries (directories and files).
    pub cnt_scanned: u64,
    /// Number of entries written at the destination (directories created, files copied, links made).
    pub cnt_copied: u64,
    /// Number of entries skipped by strategy or dry-run.
    pub cnt_skipped: u64,
    /// Number of source entries removed (files, links and directories).
    pub cnt_deleted: u64,
    /// Non-fatal warnings collected during traversal/copy/delete.
    pub warnings: Vec<String>,
    /// Per-entry failures.
    pub errors: Vec<SpecCopyError>,
}

impl ReportRelocate {
    /// Number of collected hard errors.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Number of collected warnings.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: ReportRelocate) {
        self.cnt_scanned += other.cnt_scanned;
        self.cnt_copied += other.cnt_copied;
        self.cnt_skipped += other.cnt_skipped;
        self.cnt_deleted += other.cnt_deleted;
        self.warnings.extend(other.warnings);
        self.errors.extend(other.errors);
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_scanned".to_string(), self.cnt_scanned);
        dict_counts.insert("cnt_copied".to_string(), self.cnt_copied);
        dict_counts.insert("cnt_skipped".to_string(), self.cnt_skipped);
        dict_counts.insert("cnt_deleted".to_string(), self.cnt_deleted);
        dict_counts.insert("cnt_errors".to_string(), self.error_count() as u64);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        let dict_counts = self.to_dict();
        format!(
            "{prefix} scanned={} copied={} skipped={} deleted={} errors={} warnings={}",
            dict_counts["cnt_scanned"],
            dict_counts["cnt_copied"],
            dict_counts["cnt_skipped"],
            dict_counts["cnt_deleted"],
            dict_counts["cnt_errors"],
            dict_counts["cnt_warnings"]
        )
    }
}

impl fmt::Display for ReportRelocate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(C_REPORT_PREFIX))
    }
}

/// Mutable accumulator for relocation statistics.
///
/// Warnings and errors are mirrored to `tracing` as they are recorded.
#[derive(Debug, Default, Clone)]
pub struct ReportRelocateBuilder {
    /// See [`ReportRelocate::cnt_scanned`].
    pub cnt_scanned: u64,
    /// See [`ReportRelocate::cnt_copied`].
    pub cnt_copied: u64,
    /// See [`ReportRelocate::cnt_skipped`].
    pub cnt_skipped: u64,
    /// See [`ReportRelocate::cnt_deleted`].
    pub cnt_deleted: u64,
    /// See [`ReportRelocate::errors`].
    pub errors: Vec<SpecCopyError>,
    /// See [`ReportRelocate::warnings`].
    pub warnings: Vec<String>,
}

impl ReportRelocateBuilder {
    pub fn add_scanned(&mut self) {
        self.cnt_scanned += 1;
    }

    pub fn add_copied(&mut self) {
        self.cnt_copied += 1;
    }

    pub fn add_skipped(&mut self) {
        self.cnt_skipped += 1;
    }

    pub fn add_deleted(&mut self) {
        self.cnt_deleted += 1;
    }

    /// Add warning message.
    pub fn add_warning(&mut self, warning: String) {
        tracing::warn!("{warning}");
        self.warnings.push(warning);
    }

    /// Add one path-scoped error.
    pub fn add_error(&mut self, path: PathBuf, exception: String) {
        tracing::error!(path = %path.display(), "{exception}");
        self.errors.push(SpecCopyError { path, exception });
    }

    /// Absorb counters and diagnostics of another builder.
    pub fn merge(&mut self, other: ReportRelocateBuilder) {
        self.cnt_scanned += other.cnt_scanned;
        self.cnt_copied += other.cnt_copied;
        self.cnt_skipped += other.cnt_skipped;
        self.cnt_deleted += other.cnt_deleted;
        self.warnings.extend(other.warnings);
        self.errors.extend(other.errors);
    }

    /// Number of errors recorded so far.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Finalize builder into immutable report.
    pub fn build(self) -> ReportRelocate {
        ReportRelocate {
            cnt_scanned: self.cnt_scanned,
            cnt_copied: self.cnt_copied,
            cnt_skipped: self.cnt_skipped,
            cnt_deleted: self.cnt_deleted,
            errors: self.errors,
            warnings: self.warnings,
        }
    }
}
