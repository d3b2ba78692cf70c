//! Publication to object storage.
//!
//! Two uploads through the aws CLI, in order: the rewritten entry document
//! to `<bucket>/<prefix>/<id>-<suffix>`, then the staging directory
//! recursively to `<bucket>/<prefix>/<staging-dir>/`. Credentials are the
//! CLI's own ambient configuration (env vars, profile, instance role) —
//! this module never sees them.
//!
//! Each call's own exit status decides success. The uploads are not
//! transactional: if the second fails after the first succeeded, the bucket
//! keeps the entry document with no rollback, and the error carries the
//! aws CLI's captured stdout/stderr verbatim for the operator.

use crate::identity::BuildId;
use crate::runner::{CommandOutput, CommandRunner};
use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("upload to {destination} failed (status {status:?})\nSTDOUT:\n{stdout}\nSTDERR:\n{stderr}")]
    Upload {
        destination: String,
        status: Option<i32>,
        stdout: String,
        stderr: String,
    },
}

/// Where one run's objects land, for operator output and the deploy report.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RemoteKeys {
    /// Entry document object, e.g. `s3://bucket/rapid/abcd123-18-rapid.html`.
    pub entry: String,
    /// Recursive destination for the staged tree, e.g.
    /// `s3://bucket/rapid/abcd123-18-dist`.
    pub tree: String,
}

/// Compute the two upload destinations for a build.
pub fn remote_keys(bucket: &str, prefix: &str, id: &BuildId, entry_suffix: &str) -> RemoteKeys {
    RemoteKeys {
        entry: format!("s3://{bucket}/{prefix}/{}-{entry_suffix}", id.id),
        tree: format!("s3://{bucket}/{prefix}/{}", id.staging_dir),
    }
}

/// Upload the rewritten entry document and the staged tree.
///
/// `entry_file` is the rewritten document inside the staging directory;
/// `staging_dir` is uploaded recursively. The first failure aborts — a
/// failed second upload leaves the first one's object in place.
pub fn publish(
    entry_file: &Path,
    staging_dir: &Path,
    keys: &RemoteKeys,
    runner: &dyn CommandRunner,
) -> Result<(), PublishError> {
    let entry_src = entry_file.to_string_lossy();
    let out = runner.run(
        "aws",
        &["s3", "cp", &entry_src, &keys.entry, "--no-progress"],
    )?;
    check_upload(&keys.entry, out)?;

    let tree_src = staging_dir.to_string_lossy();
    let out = runner.run(
        "aws",
        &[
            "s3",
            "cp",
            &tree_src,
            &keys.tree,
            "--recursive",
            "--no-progress",
        ],
    )?;
    check_upload(&keys.tree, out)?;

    Ok(())
}

/// Turn a non-zero upload exit into an error carrying the captured streams.
///
/// Each call is judged on its own output — never on a previous call's.
fn check_upload(destination: &str, out: CommandOutput) -> Result<(), PublishError> {
    if out.success() {
        return Ok(());
    }
    Err(PublishError::Upload {
        destination: destination.to_string(),
        status: out.status,
        stdout: out.stdout,
        stderr: out.stderr,
    })
}
