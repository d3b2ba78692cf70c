//! Entry-point reference rewriting.
//!
//! The compiled entry document ships with relative asset references
//! (`rapid.css`, `'rapid.js'`, an inline `coreContext()` call with a default
//! asset path). Published builds live under a unique key prefix instead, so
//! every reference must be retargeted at `/<prefix>/<staging-dir>/...`
//! before upload. The source document is never mutated; the rewritten copy
//! is written into the staging directory.
//!
//! Rewriting is literal substring replacement, line by line, in table
//! order — no regular expressions, no HTML parsing. Each rule operates on
//! the output of the previous rule on the same line, so the table must be
//! built so that no rule's needle occurs inside an earlier rule's expanded
//! replacement (checked by [`check_table`], and by a test for the built-in
//! table). Lines matching no rule pass through byte-identical, terminators
//! included.
//!
//! The built-in table covers the stock asset names across the entry-point
//! variants that have shipped over time: the stylesheet (`dist/`-relative
//! and bare `href=` forms), the primary/minified/legacy scripts, the
//! `coreContext()` initializer without an asset path, and the pre-existing
//! empty `.assetPath('')` call. Rules whose needle is absent are no-ops, so
//! one table serves old and new entry documents alike. Product renames are
//! a config edit (`[[rewrite.rules]]`), not a code change.

use crate::config::RuleConfig;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RewriteError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("substitution table error: {0}")]
    Table(String),
}

/// A fully expanded substitution rule: find this literal, emit that one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub find: String,
    pub replace: String,
}

/// What the rewriter did, for operator output.
#[derive(Debug, Default, Clone)]
pub struct RewriteReport {
    /// Total lines processed.
    pub lines: usize,
    /// Lines where at least one rule fired.
    pub lines_changed: usize,
}

/// Built-in replacement templates, `{base}` standing for the expanded
/// asset base. Order matters: `dist/`-prefixed needles come before their
/// bare counterparts so the bare rule never re-matches rewritten text.
const BUILTIN_RULES: &[(&str, &str)] = &[
    ("dist/rapid.css", "{base}/rapid.css"),
    ("'dist/rapid.js'", "'{base}/rapid.js'"),
    ("'dist/rapid.legacy.js'", "'{base}/rapid.legacy.js'"),
    ("'rapid.js'", "'{base}/rapid.js'"),
    ("'rapid.min.js'", "'{base}/rapid.min.js'"),
    ("'rapid.legacy.js'", "'{base}/rapid.legacy.js'"),
    ("href='rapid.css'", "href='{base}/rapid.css'"),
    (
        "var id = rapid.coreContext();",
        "var id = rapid.coreContext().assetPath('{base}/');",
    ),
    (".assetPath('')", ".assetPath('{base}/')"),
];

/// The web path all rewritten references resolve under.
pub fn asset_base(prefix: &str, staging_dir: &str) -> String {
    format!("/{prefix}/{staging_dir}")
}

/// Expand a substitution table for one build.
///
/// User rules from config replace the built-in table entirely when present.
/// `{base}` in replacement templates expands to `base`. The expanded table
/// is checked for the double-substitution hazard before use.
pub fn build_table(user_rules: &[RuleConfig], base: &str) -> Result<Vec<Rule>, RewriteError> {
    let rules: Vec<Rule> = if user_rules.is_empty() {
        BUILTIN_RULES
            .iter()
            .map(|(find, replace)| Rule {
                find: (*find).to_string(),
                replace: replace.replace("{base}", base),
            })
            .collect()
    } else {
        user_rules
            .iter()
            .map(|r| Rule {
                find: r.find.clone(),
                replace: r.replace.replace("{base}", base),
            })
            .collect()
    };
    check_table(&rules)?;
    Ok(rules)
}

/// Reject tables where a later rule's needle occurs inside an earlier
/// rule's replacement — that text would be substituted twice.
fn check_table(rules: &[Rule]) -> Result<(), RewriteError> {
    for (i, earlier) in rules.iter().enumerate() {
        for later in &rules[i + 1..] {
            if earlier.replace.contains(&later.find) {
                return Err(RewriteError::Table(format!(
                    "rule {:?} would re-match text inserted by rule {:?}",
                    later.find, earlier.find
                )));
            }
        }
    }
    Ok(())
}

/// Apply every rule, in order, to one line.
pub fn rewrite_line(line: &str, rules: &[Rule]) -> String {
    let mut out = line.to_string();
    for rule in rules {
        if out.contains(&rule.find) {
            out = out.replace(&rule.find, &rule.replace);
        }
    }
    out
}

/// Rewrite `src` into `dst`, line by line.
///
/// Line order and terminators (`\n`, `\r\n`, absent on the final line) are
/// preserved exactly; only rule matches change any bytes. Fails with an I/O
/// error if `src` cannot be read or `dst`'s parent directory is missing —
/// in the pipeline that aborts the run before any upload happens.
pub fn rewrite_file(src: &Path, dst: &Path, rules: &[Rule]) -> Result<RewriteReport, RewriteError> {
    let content = fs::read_to_string(src)?;
    let mut writer = BufWriter::new(fs::File::create(dst)?);
    let mut report = RewriteReport::default();

    for segment in content.split_inclusive('\n') {
        report.lines += 1;
        let (body, terminator) = split_terminator(segment);
        let rewritten = rewrite_line(body, rules);
        if rewritten != body {
            report.lines_changed += 1;
        }
        writer.write_all(rewritten.as_bytes())?;
        writer.write_all(terminator.as_bytes())?;
    }
    writer.flush()?;
    Ok(report)
}

/// Split one `split_inclusive` segment into line body and terminator.
fn split_terminator(segment: &str) -> (&str, &str) {
    if let Some(body) = segment.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = segment.strip_suffix('\n') {
        (body, "\n")
    } else {
        (segment, "")
    }
}
