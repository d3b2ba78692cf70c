//! Artifact staging.
//!
//! Prepares the uniquely named staging directory for one build: any stale
//! directory with the same name is removed outright, a fresh one is created,
//! and the compiled artifact tree is copied into it byte for byte. There are
//! no merge semantics — the staging directory's contents after this stage
//! are exactly the artifact tree, nothing else.
//!
//! Two concurrent runs with the same build identifier would race on this
//! remove-then-create sequence; nothing here coordinates them. The only race
//! tolerated is `create_dir` losing to a just-created directory, which is
//! reported as a warning and staging continues.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum StageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("artifact tree not found: {0} (run the build step first)")]
    MissingArtifacts(PathBuf),
    #[error("permission denied creating staging directory: {0}")]
    PermissionDenied(PathBuf),
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// What the stager did, for operator output.
#[derive(Debug, Default, Clone)]
pub struct StageReport {
    /// Files copied into the staging directory.
    pub files_copied: usize,
    /// Directories created under the staging directory.
    pub dirs_created: usize,
    /// A stale staging directory with the same name existed and was removed.
    pub removed_stale: bool,
    /// `create_dir` lost a race to an already-existing directory (non-fatal).
    pub raced_existing: bool,
}

/// Stage the artifact tree into `staging_dir`.
///
/// `staging_dir` is destroyed and rebuilt; `artifact_dir` is never touched.
/// Missing artifacts are fatal before any mutation. A permission failure
/// creating the staging directory is fatal; the directory already existing
/// at creation time is a soft warning (another process got there first) and
/// the copy proceeds into it.
pub fn stage(artifact_dir: &Path, staging_dir: &Path) -> Result<StageReport, StageError> {
    if !artifact_dir.is_dir() {
        return Err(StageError::MissingArtifacts(artifact_dir.to_path_buf()));
    }

    let mut report = StageReport::default();

    if staging_dir.exists() {
        fs::remove_dir_all(staging_dir)?;
        report.removed_stale = true;
    }

    match fs::create_dir(staging_dir) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            report.raced_existing = true;
        }
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            return Err(StageError::PermissionDenied(staging_dir.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    }

    copy_tree(artifact_dir, staging_dir, &mut report)?;
    Ok(report)
}

/// Recursively copy `src` into `dst`, which must already exist.
///
/// Symlinks are followed; file contents are preserved byte for byte.
fn copy_tree(src: &Path, dst: &Path, report: &mut StageReport) -> Result<(), StageError> {
    for entry in WalkDir::new(src).min_depth(1).follow_links(true) {
        let entry = entry?;
        // min_depth(1) guarantees a non-empty suffix
        let rel = entry
            .path()
            .strip_prefix(src)
            .expect("walked path is under src");
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
            report.dirs_created += 1;
        } else {
            fs::copy(entry.path(), &target)?;
            report.files_copied += 1;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::write_artifact_tree;
    use tempfile::TempDir;

    #[test]
    fn copies_full_tree() {
        let tmp = TempDir::new().unwrap();
        let dist = tmp.path().join("dist");
        write_artifact_tree(&dist);

        let staging = tmp.path().join("abcd123-18-dist");
        let report = stage(&dist, &staging).unwrap();

        assert!(staging.join("index.html").is_file());
        assert!(staging.join("rapid.css").is_file());
        assert!(staging.join("img/icon.svg").is_file());
        assert_eq!(report.files_copied, 4);
        assert_eq!(report.dirs_created, 1);
        assert!(!report.removed_stale);
    }

    #[test]
    fn copy_preserves_bytes() {
        let tmp = TempDir::new().unwrap();
        let dist = tmp.path().join("dist");
        std::fs::create_dir_all(&dist).unwrap();
        let payload: Vec<u8> = (0u8..=255).collect();
        std::fs::write(dist.join("blob.bin"), &payload).unwrap();

        let staging = tmp.path().join("out");
        stage(&dist, &staging).unwrap();
        assert_eq!(std::fs::read(staging.join("blob.bin")).unwrap(), payload);
    }

    #[test]
    fn stale_staging_dir_is_fully_replaced() {
        let tmp = TempDir::new().unwrap();
        let dist = tmp.path().join("dist");
        write_artifact_tree(&dist);

        let staging = tmp.path().join("abcd123-18-dist");
        std::fs::create_dir_all(staging.join("old-subdir")).unwrap();
        std::fs::write(staging.join("leftover.js"), "stale").unwrap();
        std::fs::write(staging.join("index.html"), "stale index").unwrap();

        let report = stage(&dist, &staging).unwrap();

        assert!(report.removed_stale);
        assert!(!staging.join("leftover.js").exists());
        assert!(!staging.join("old-subdir").exists());
        // Same-named file carries the fresh contents, not the stale ones
        let index = std::fs::read_to_string(staging.join("index.html")).unwrap();
        assert_ne!(index, "stale index");
    }

    #[test]
    fn running_twice_is_repeatable() {
        let tmp = TempDir::new().unwrap();
        let dist = tmp.path().join("dist");
        write_artifact_tree(&dist);
        let staging = tmp.path().join("out");

        stage(&dist, &staging).unwrap();
        let second = stage(&dist, &staging).unwrap();

        assert!(second.removed_stale);
        assert_eq!(second.files_copied, 4);
    }

    #[test]
    fn missing_artifact_tree_is_fatal_before_mutation() {
        let tmp = TempDir::new().unwrap();
        let staging = tmp.path().join("out");

        let err = stage(&tmp.path().join("no-such-dist"), &staging).unwrap_err();
        assert!(matches!(err, StageError::MissingArtifacts(_)));
        // Nothing was created
        assert!(!staging.exists());
    }

    #[test]
    #[cfg(unix)]
    fn permission_denied_is_fatal() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let dist = tmp.path().join("dist");
        write_artifact_tree(&dist);

        let locked = tmp.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o555)).unwrap();

        let result = stage(&dist, &locked.join("out"));
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        assert!(matches!(result, Err(StageError::PermissionDenied(_))));
    }
}
