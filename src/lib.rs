//! # Stagehand
//!
//! A deploy tool for web build artifacts: it names a build after its source
//! revision, stages the compiled output under that unique name, retargets the
//! entry document's asset references at the staged paths, and publishes the
//! result to an S3 bucket. One binary replaces the drifting pile of
//! near-duplicate deploy scripts that tends to grow around a web app's CI.
//!
//! # Architecture: Four-Stage Pipeline
//!
//! A deploy runs four strictly sequential stages:
//!
//! ```text
//! 1. Identify   git + version tag  →  abcd123-18 / abcd123-18-dist
//! 2. Stage      dist/              →  abcd123-18-dist/         (clean copy)
//! 3. Rewrite    dist/index.html    →  abcd123-18-dist/index.html
//! 4. Publish    staging dir        →  s3://<bucket>/<prefix>/...
//! ```
//!
//! Every stage is also its own subcommand, so CI can run them separately
//! (e.g. stage and rewrite on one runner, publish on another with
//! credentials). No stage starts before the previous completed; nothing is
//! retried; a failed upload leaves whatever already landed in the bucket in
//! place — deploys are namespaced by build identifier precisely so a partial
//! publish can never corrupt a previous build.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `deploy.toml` loading, env/CLI layering, one-shot validation |
//! | [`identity`] | Build identifier resolution from revision hash + version tag |
//! | [`stage`] | Destroy-and-recreate staging directory, recursive artifact copy |
//! | [`rewrite`] | Substitution-table rewriting of the entry document |
//! | [`publish`] | Uploads via the aws CLI, per-call exit-status checking |
//! | [`runner`] | `CommandRunner` capability over external processes |
//! | [`output`] | CLI output formatting + the JSON deploy report |
//!
//! # Design Decisions
//!
//! ## External tools stay external
//!
//! git, the package build, and the aws CLI are invoked as processes through
//! [`runner::CommandRunner`] rather than linked as libraries. Credentials in
//! particular are entirely the aws CLI's ambient configuration — this crate
//! never reads a secret. The trait seam exists so every pipeline stage is
//! testable with scripted exit codes and output streams.
//!
//! ## Substitution table over templating
//!
//! Asset retargeting is an ordered list of literal find/replace pairs, not a
//! template engine. The entry document is build output we do not control;
//! literal substrings are the only stable thing about it across product
//! versions. The table is configuration data (`[[rewrite.rules]]`), so a
//! product rename is a config edit.
//!
//! ## Explicit config, resolved once
//!
//! Bucket, prefix, tag, and identity overrides are gathered into one
//! validated [`config::DeployConfig`] before anything runs. Pipeline stages
//! take values, never read the environment, and fail before the first
//! filesystem mutation when configuration is unusable.

pub mod config;
pub mod identity;
pub mod output;
pub mod publish;
pub mod rewrite;
pub mod runner;
pub mod stage;

#[cfg(test)]
pub(crate) mod test_helpers;
