//! Deployment configuration module.
//!
//! Handles loading and validating `deploy.toml`. Every value the pipeline
//! needs — bucket, key prefix, version tag, artifact locations — is gathered
//! into one [`DeployConfig`] up front and validated once, before any
//! filesystem mutation. The pipeline stages never read the environment on
//! their own.
//!
//! ## Layering
//!
//! Values are resolved in order, later wins:
//!
//! ```text
//! stock defaults  →  deploy.toml  →  environment  →  CLI flags
//! ```
//!
//! Recognized environment variables (matching CI secrets/vars):
//!
//! ```text
//! STAGEHAND_BUCKET        S3 bucket name
//! STAGEHAND_PREFIX        key prefix / web root
//! STAGEHAND_VERSION_TAG   runtime/version tag mixed into the build id
//! STAGEHAND_BUILD_ID      pre-computed build identifier (skips git)
//! STAGEHAND_STAGING_DIR   pre-computed staging directory name
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! bucket = "world.example.rapid"   # Required: S3 bucket to publish to
//! prefix = "rapid"                 # Key prefix under the bucket
//! version_tag = "18"               # Mixed into the build identifier
//! artifact_dir = "dist"            # Compiled output tree (build step's output)
//! entry_point = "index.html"       # Entry document inside artifact_dir
//! entry_object_suffix = "rapid.html" # Remote entry object: <id>-<suffix>
//! build_command = ["npm", "run", "all"]  # Optional pre-stage build
//!
//! # Optional: replace the built-in substitution table entirely.
//! # `{base}` expands to /<prefix>/<staging-dir>
//! [[rewrite.rules]]
//! find = "href='rapid.css'"
//! replace = "href='{base}/rapid.css'"
//! ```
//!
//! Config files are sparse — specify only what you override. Unknown keys
//! are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// One run's deployment configuration.
///
/// All fields have defaults except `bucket` and `version_tag`, which
/// validation requires (the tag may be omitted when a pre-computed
/// `build_id` is supplied instead).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeployConfig {
    /// S3 bucket the publish targets. Required.
    pub bucket: String,
    /// Key prefix under the bucket; also the web root asset URLs resolve under.
    pub prefix: String,
    /// Version/runtime tag combined with the revision hash into the build id.
    pub version_tag: String,
    /// Pre-computed build identifier. When set, the revision query is skipped
    /// and identity resolution is delegated to the caller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_id: Option<String>,
    /// Pre-computed staging directory name. Defaults to `<build_id>-dist`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staging_dir: Option<String>,
    /// Directory holding the compiled artifact tree (the build step's output).
    pub artifact_dir: String,
    /// Entry-point document filename inside `artifact_dir`.
    pub entry_point: String,
    /// Remote entry object is named `<build-id>-<entry_object_suffix>`.
    pub entry_object_suffix: String,
    /// Optional argv to produce the artifact tree before staging.
    /// Empty means the tree must already exist.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub build_command: Vec<String>,
    /// Reference-rewriting settings.
    pub rewrite: RewriteConfig,
}

/// Reference-rewriting settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RewriteConfig {
    /// Substitution rules applied to the entry-point document, in order.
    /// Empty means the built-in table for the product's asset names.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RuleConfig>,
}

/// A single literal-substring substitution rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    /// Literal substring to find (no pattern matching).
    pub find: String,
    /// Replacement template; `{base}` expands to `/<prefix>/<staging-dir>`.
    pub replace: String,
}

fn default_prefix() -> String {
    "rapid".to_string()
}

fn default_artifact_dir() -> String {
    "dist".to_string()
}

fn default_entry_point() -> String {
    "index.html".to_string()
}

fn default_entry_object_suffix() -> String {
    "rapid.html".to_string()
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            prefix: default_prefix(),
            version_tag: String::new(),
            build_id: None,
            staging_dir: None,
            artifact_dir: default_artifact_dir(),
            entry_point: default_entry_point(),
            entry_object_suffix: default_entry_object_suffix(),
            build_command: Vec::new(),
            rewrite: RewriteConfig::default(),
        }
    }
}

impl DeployConfig {
    /// Validate that required values are present and key-safe.
    ///
    /// Runs once before the pipeline starts; nothing is mutated on disk or
    /// remotely until this passes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket.is_empty() {
            return Err(ConfigError::Validation(
                "bucket is required (deploy.toml, STAGEHAND_BUCKET, or --bucket)".into(),
            ));
        }
        if self.version_tag.is_empty() && self.build_id.is_none() {
            return Err(ConfigError::Validation(
                "version_tag is required unless build_id is supplied".into(),
            ));
        }
        if self.prefix.is_empty() {
            return Err(ConfigError::Validation("prefix must not be empty".into()));
        }
        for (name, value) in [
            ("bucket", &self.bucket),
            ("prefix", &self.prefix),
            ("entry_object_suffix", &self.entry_object_suffix),
        ] {
            if value.contains('/') || value.contains(char::is_whitespace) {
                return Err(ConfigError::Validation(format!(
                    "{name} must not contain slashes or whitespace: {value:?}"
                )));
            }
        }
        if self.entry_point.is_empty() || self.artifact_dir.is_empty() {
            return Err(ConfigError::Validation(
                "artifact_dir and entry_point must not be empty".into(),
            ));
        }
        for rule in &self.rewrite.rules {
            if rule.find.is_empty() {
                return Err(ConfigError::Validation(
                    "rewrite rule with empty `find` string".into(),
                ));
            }
        }
        Ok(())
    }

    /// Overlay environment-supplied values on top of the current config.
    ///
    /// `lookup` abstracts `std::env::var` so tests can inject a map instead
    /// of mutating process-global state.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("STAGEHAND_BUCKET") {
            self.bucket = v;
        }
        if let Some(v) = lookup("STAGEHAND_PREFIX") {
            self.prefix = v;
        }
        if let Some(v) = lookup("STAGEHAND_VERSION_TAG") {
            self.version_tag = v;
        }
        if let Some(v) = lookup("STAGEHAND_BUILD_ID") {
            self.build_id = Some(v);
        }
        if let Some(v) = lookup("STAGEHAND_STAGING_DIR") {
            self.staging_dir = Some(v);
        }
    }
}

/// Load config from `deploy.toml` in the given directory.
///
/// Returns stock defaults if no file exists. User values override defaults
/// field by field; unknown keys are rejected.
pub fn load_config(dir: &Path) -> Result<DeployConfig, ConfigError> {
    let config_path = dir.join("deploy.toml");
    if !config_path.exists() {
        return Ok(DeployConfig::default());
    }
    let content = fs::read_to_string(&config_path)?;
    let config: DeployConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Returns a fully-commented stock `deploy.toml` with all keys documented.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Stagehand Deployment Configuration
# ==================================
# All settings may also be supplied via environment variables
# (STAGEHAND_BUCKET, STAGEHAND_PREFIX, STAGEHAND_VERSION_TAG,
# STAGEHAND_BUILD_ID, STAGEHAND_STAGING_DIR) or CLI flags; later
# sources win. Unknown keys cause an error.

# S3 bucket to publish to. Required.
bucket = ""

# Key prefix under the bucket. Uploaded objects land at
# <bucket>/<prefix>/... and rewritten asset URLs resolve under /<prefix>/.
prefix = "rapid"

# Version or runtime tag mixed into the build identifier
# (e.g. the Node major version in CI). The identifier becomes
# <git-short-hash>-<version_tag>.
version_tag = ""

# Pre-computed identity. When build_id is set the git revision query is
# skipped entirely; staging_dir defaults to "<build_id>-dist".
# build_id = "abcd123-18"
# staging_dir = "abcd123-18-dist"

# Compiled output tree produced by the external build step.
artifact_dir = "dist"

# Entry-point document inside artifact_dir.
entry_point = "index.html"

# The remote entry object is named <build-id>-<entry_object_suffix>,
# uploaded at <bucket>/<prefix>/.
entry_object_suffix = "rapid.html"

# Optional command to produce the artifact tree before staging.
# Omit to require that artifact_dir already exists.
# build_command = ["npm", "run", "all"]

# ---------------------------------------------------------------------------
# Reference rewriting
# ---------------------------------------------------------------------------
# The entry-point document is rewritten line by line so every asset
# reference points under /<prefix>/<staging-dir>/. Omit [[rewrite.rules]]
# to use the built-in table for the stock asset names (rapid.css,
# rapid.js, rapid.legacy.js, the coreContext() initializer). Supplying
# any rule replaces the built-in table entirely.
#
# `{base}` in `replace` expands to /<prefix>/<staging-dir>.
# Rules apply in order; a rule's `find` text must never occur inside an
# earlier rule's expanded replacement or it will be substituted twice.
#
# [[rewrite.rules]]
# find = "href='rapid.css'"
# replace = "href='{base}/rapid.css'"
"##
}
