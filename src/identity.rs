//! Build identity resolution.
//!
//! A run publishes under a unique Build Identifier: the short source-control
//! revision hash joined with the environment's version tag, e.g.
//! `abcd123-18`. The staging directory takes the identifier plus a `-dist`
//! suffix, and every remote key for the run is namespaced by one or the
//! other, so assets from different builds can never collide in the bucket.
//!
//! Resolution is deterministic (same revision + tag → same identifier) and
//! side-effect free. CI can also hand both names in pre-computed via
//! `build_id`/`staging_dir` config, in which case git is never consulted.

use crate::config::DeployConfig;
use crate::runner::CommandRunner;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("could not resolve the current revision: {0}")]
    Revision(String),
    #[error("identifier component {0:?} contains separators or whitespace")]
    UnsafeToken(String),
}

/// The resolved identity for one run: identifier plus staging directory name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildId {
    /// Unique token naming this build's artifacts, e.g. `abcd123-18`.
    pub id: String,
    /// Local (and remote) directory name for the staged tree, e.g.
    /// `abcd123-18-dist`.
    pub staging_dir: String,
}

impl BuildId {
    /// Assemble an identity from its components, checking each is safe to
    /// use as a path segment and an S3 key segment.
    pub fn new(id: String, staging_dir: String) -> Result<Self, IdentityError> {
        check_token(&id)?;
        check_token(&staging_dir)?;
        Ok(Self { id, staging_dir })
    }
}

/// Resolve the build identity for this run.
///
/// Pre-computed `build_id`/`staging_dir` from config win outright. Otherwise
/// the short revision hash is queried through `runner` and joined with the
/// version tag. A failed revision query is a configuration error (not inside
/// a repository, or no commits yet) and aborts before anything is touched.
pub fn resolve(config: &DeployConfig, runner: &dyn CommandRunner) -> Result<BuildId, IdentityError> {
    if let Some(id) = &config.build_id {
        let staging_dir = config
            .staging_dir
            .clone()
            .unwrap_or_else(|| format!("{id}-dist"));
        return BuildId::new(id.clone(), staging_dir);
    }

    let hash = revision_short_hash(runner)?;
    let id = format!("{hash}-{tag}", tag = config.version_tag);
    let staging_dir = format!("{id}-dist");
    BuildId::new(id, staging_dir)
}

/// Query the short hash of the current revision via `git rev-parse`.
fn revision_short_hash(runner: &dyn CommandRunner) -> Result<String, IdentityError> {
    let out = runner.run("git", &["rev-parse", "--short", "HEAD"])?;
    if !out.success() {
        return Err(IdentityError::Revision(if out.stderr.trim().is_empty() {
            format!("git rev-parse exited with status {:?}", out.status)
        } else {
            out.stderr.trim().to_string()
        }));
    }
    let hash = out.stdout.trim().to_string();
    if hash.is_empty() {
        return Err(IdentityError::Revision(
            "git rev-parse produced no output".into(),
        ));
    }
    Ok(hash)
}

/// Identifiers become path segments and URL path segments verbatim.
fn check_token(token: &str) -> Result<(), IdentityError> {
    if token.is_empty()
        || token.contains(['/', '\\'])
        || token.contains(char::is_whitespace)
        || token.contains(char::is_control)
    {
        return Err(IdentityError::UnsafeToken(token.to_string()));
    }
    Ok(())
}
