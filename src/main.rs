use clap::{Parser, Subcommand};
use stagehand::runner::{CommandRunner, ProcessRunner};
use stagehand::{config, identity, output, publish, rewrite, stage};
use std::path::PathBuf;

fn version_string() -> &'static str {
    let on_tag = env!("BUILD_ON_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("BUILD_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup — trivial, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "stagehand")]
#[command(about = "Stage, rewrite, and publish web build artifacts to S3")]
#[command(long_about = "\
Stage, rewrite, and publish web build artifacts to S3

Each deploy is namespaced by a build identifier derived from the short git
hash and a version tag (e.g. abcd123-18). The compiled artifact tree is
copied into a staging directory named after the identifier, the entry
document's asset references are rewritten to point under
/<prefix>/<staging-dir>/, and both are uploaded:

  s3://<bucket>/<prefix>/<id>-rapid.html      entry document
  s3://<bucket>/<prefix>/<id>-dist/           staged artifact tree

Configuration comes from deploy.toml, the STAGEHAND_* environment
variables, and the flags below — later sources win. Credentials are the
aws CLI's own ambient configuration; stagehand never reads them.

Run 'stagehand gen-config' to generate a documented deploy.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Project root (holds deploy.toml and the artifact tree)
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// S3 bucket to publish to
    #[arg(long, global = true)]
    bucket: Option<String>,

    /// Key prefix under the bucket
    #[arg(long, global = true)]
    prefix: Option<String>,

    /// Version/runtime tag mixed into the build identifier
    #[arg(long, global = true)]
    version_tag: Option<String>,

    /// Pre-computed build identifier (skips the git revision query)
    #[arg(long, global = true)]
    build_id: Option<String>,

    /// Pre-computed staging directory name
    #[arg(long, global = true)]
    staging_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve and print the build identifier and staging directory name
    Identify,
    /// Copy the artifact tree into a clean, uniquely named staging directory
    Stage,
    /// Rewrite the entry document's asset references into the staging directory
    Rewrite,
    /// Upload the entry document and staging directory to the bucket
    Publish,
    /// Run the full pipeline: identify → stage → rewrite → publish
    Deploy {
        /// Emit a machine-readable JSON report on success
        #[arg(long)]
        json: bool,
        /// Skip the configured build_command even if one is set
        #[arg(long)]
        skip_build: bool,
    },
    /// Validate configuration and preconditions without mutating anything
    Check,
    /// Print a stock deploy.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let runner = ProcessRunner;

    match &cli.command {
        Command::Identify => {
            let config = resolve_config(&cli)?;
            let id = identity::resolve(&config, &runner)?;
            output::print_identity(&id);
        }
        Command::Stage => {
            let config = resolve_config(&cli)?;
            let id = identity::resolve(&config, &runner)?;
            let artifact_dir = cli.root.join(&config.artifact_dir);
            let staging_dir = cli.root.join(&id.staging_dir);
            let report = stage::stage(&artifact_dir, &staging_dir)?;
            output::print_stage(&artifact_dir, &staging_dir, &report);
        }
        Command::Rewrite => {
            let config = resolve_config(&cli)?;
            let id = identity::resolve(&config, &runner)?;
            let (src, dst) = entry_paths(&cli, &config, &id);
            let table = rewrite_table(&config, &id)?;
            let report = rewrite::rewrite_file(&src, &dst, &table)?;
            output::print_rewrite(&src, &dst, &report);
        }
        Command::Publish => {
            let config = resolve_config(&cli)?;
            let id = identity::resolve(&config, &runner)?;
            let (_, entry) = entry_paths(&cli, &config, &id);
            let staging_dir = cli.root.join(&id.staging_dir);
            let keys =
                publish::remote_keys(&config.bucket, &config.prefix, &id, &config.entry_object_suffix);
            publish::publish(&entry, &staging_dir, &keys, &runner)?;
            output::print_publish(&keys);
        }
        Command::Deploy { json, skip_build } => {
            let config = resolve_config(&cli)?;

            println!("==> Stage 1: Resolving build identity");
            let id = identity::resolve(&config, &runner)?;
            output::print_identity(&id);

            if !config.build_command.is_empty() && !*skip_build {
                println!("==> Running build command");
                run_build_command(&config.build_command, &runner)?;
            }

            let artifact_dir = cli.root.join(&config.artifact_dir);
            let staging_dir = cli.root.join(&id.staging_dir);
            println!("==> Stage 2: Staging {}", artifact_dir.display());
            let staged = stage::stage(&artifact_dir, &staging_dir)?;
            output::print_stage(&artifact_dir, &staging_dir, &staged);

            println!("==> Stage 3: Rewriting entry document");
            let (src, dst) = entry_paths(&cli, &config, &id);
            let table = rewrite_table(&config, &id)?;
            let rewrote = rewrite::rewrite_file(&src, &dst, &table)?;
            output::print_rewrite(&src, &dst, &rewrote);

            let keys =
                publish::remote_keys(&config.bucket, &config.prefix, &id, &config.entry_object_suffix);
            println!(
                "==> Stage 4: Publishing to s3://{}/{}",
                config.bucket, config.prefix
            );
            publish::publish(&dst, &staging_dir, &keys, &runner)?;
            output::print_publish(&keys);

            println!("==> Deploy complete: {}", keys.entry);
            if *json {
                let report = output::DeployReport::new(&id, &keys, &staged, &rewrote);
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
        }
        Command::Check => {
            println!("==> Checking configuration");
            let config = resolve_config(&cli)?;
            let id = identity::resolve(&config, &runner)?;
            output::print_identity(&id);

            let artifact_dir = cli.root.join(&config.artifact_dir);
            if !artifact_dir.is_dir() {
                if config.build_command.is_empty() {
                    return Err(format!(
                        "artifact tree {} not found and no build_command configured",
                        artifact_dir.display()
                    )
                    .into());
                }
                println!(
                    "artifact tree {} absent; build_command will produce it",
                    artifact_dir.display()
                );
            }
            // Expanding the table surfaces double-substitution hazards in
            // user rules before anything is staged.
            rewrite_table(&config, &id)?;
            println!("==> Configuration is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Resolve the effective config: deploy.toml ← environment ← CLI flags,
/// validated once.
fn resolve_config(cli: &Cli) -> Result<config::DeployConfig, config::ConfigError> {
    let mut config = config::load_config(&cli.root)?;
    config.apply_env(|key| std::env::var(key).ok());
    if let Some(v) = &cli.bucket {
        config.bucket = v.clone();
    }
    if let Some(v) = &cli.prefix {
        config.prefix = v.clone();
    }
    if let Some(v) = &cli.version_tag {
        config.version_tag = v.clone();
    }
    if let Some(v) = &cli.build_id {
        config.build_id = Some(v.clone());
    }
    if let Some(v) = &cli.staging_dir {
        config.staging_dir = Some(v.clone());
    }
    config.validate()?;
    Ok(config)
}

/// Source and destination paths for the entry document.
fn entry_paths(
    cli: &Cli,
    config: &config::DeployConfig,
    id: &identity::BuildId,
) -> (PathBuf, PathBuf) {
    let src = cli.root.join(&config.artifact_dir).join(&config.entry_point);
    let dst = cli.root.join(&id.staging_dir).join(&config.entry_point);
    (src, dst)
}

/// Expand the substitution table for this build.
fn rewrite_table(
    config: &config::DeployConfig,
    id: &identity::BuildId,
) -> Result<Vec<rewrite::Rule>, rewrite::RewriteError> {
    let base = rewrite::asset_base(&config.prefix, &id.staging_dir);
    rewrite::build_table(&config.rewrite.rules, &base)
}

/// Run the configured pre-stage build command, surfacing its streams on
/// failure just like a failed upload.
fn run_build_command(
    argv: &[String],
    runner: &dyn CommandRunner,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some((program, args)) = argv.split_first() else {
        return Ok(());
    };
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let out = runner.run(program, &args)?;
    if !out.success() {
        return Err(format!(
            "build command {argv:?} failed (status {:?})\nSTDOUT:\n{}\nSTDERR:\n{}",
            out.status, out.stdout, out.stderr
        )
        .into());
    }
    Ok(())
}
