//! CLI output formatting for all pipeline stages.
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure — no I/O, no side effects.
//!
//! The `deploy` command can also emit a machine-readable [`DeployReport`]
//! as JSON for CI to pick up (e.g. to post the preview URL on a pull
//! request).
//!
//! # Output Format
//!
//! ```text
//! Build identity
//!     id: abcd123-18
//!     staging dir: abcd123-18-dist
//!
//! Staged dist -> abcd123-18-dist
//!     removed stale staging dir
//!     copied 124 files, 8 directories
//!
//! Rewrote dist/index.html -> abcd123-18-dist/index.html
//!     3 of 48 lines rewritten
//!
//! Published
//!     entry: s3://world.example.rapid/rapid/abcd123-18-rapid.html
//!     tree:  s3://world.example.rapid/rapid/abcd123-18-dist
//! ```

use crate::identity::BuildId;
use crate::publish::RemoteKeys;
use crate::rewrite::RewriteReport;
use crate::stage::StageReport;
use serde::Serialize;
use std::path::Path;

/// Machine-readable summary of one deploy run, emitted with `--json`.
#[derive(Debug, Serialize)]
pub struct DeployReport {
    pub build_id: String,
    pub staging_dir: String,
    pub entry_object: String,
    pub tree_prefix: String,
    pub files_copied: usize,
    pub lines_rewritten: usize,
}

impl DeployReport {
    pub fn new(id: &BuildId, keys: &RemoteKeys, staged: &StageReport, rewrote: &RewriteReport) -> Self {
        Self {
            build_id: id.id.clone(),
            staging_dir: id.staging_dir.clone(),
            entry_object: keys.entry.clone(),
            tree_prefix: keys.tree.clone(),
            files_copied: staged.files_copied,
            lines_rewritten: rewrote.lines_changed,
        }
    }
}

/// Format the resolved build identity.
pub fn format_identity(id: &BuildId) -> Vec<String> {
    vec![
        "Build identity".to_string(),
        format!("    id: {}", id.id),
        format!("    staging dir: {}", id.staging_dir),
    ]
}

/// Format the staging result.
pub fn format_stage(artifact_dir: &Path, staging_dir: &Path, report: &StageReport) -> Vec<String> {
    let mut lines = vec![format!(
        "Staged {} -> {}",
        artifact_dir.display(),
        staging_dir.display()
    )];
    if report.removed_stale {
        lines.push("    removed stale staging dir".to_string());
    }
    if report.raced_existing {
        lines.push("    warning: staging dir already existed, continuing".to_string());
    }
    lines.push(format!(
        "    copied {} files, {} directories",
        report.files_copied, report.dirs_created
    ));
    lines
}

/// Format the rewrite result.
pub fn format_rewrite(src: &Path, dst: &Path, report: &RewriteReport) -> Vec<String> {
    vec![
        format!("Rewrote {} -> {}", src.display(), dst.display()),
        format!(
            "    {} of {} lines rewritten",
            report.lines_changed, report.lines
        ),
    ]
}

/// Format the publish destinations.
pub fn format_publish(keys: &RemoteKeys) -> Vec<String> {
    vec![
        "Published".to_string(),
        format!("    entry: {}", keys.entry),
        format!("    tree:  {}", keys.tree),
    ]
}

pub fn print_identity(id: &BuildId) {
    for line in format_identity(id) {
        println!("{line}");
    }
}

pub fn print_stage(artifact_dir: &Path, staging_dir: &Path, report: &StageReport) {
    for line in format_stage(artifact_dir, staging_dir, report) {
        println!("{line}");
    }
}

pub fn print_rewrite(src: &Path, dst: &Path, report: &RewriteReport) {
    for line in format_rewrite(src, dst, report) {
        println!("{line}");
    }
}

pub fn print_publish(keys: &RemoteKeys) {
    for line in format_publish(keys) {
        println!("{line}");
    }
}
