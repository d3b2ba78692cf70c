//! External process invocation behind a capability trait.
//!
//! Every external tool the pipeline touches — the revision query, the
//! optional package build, the upload CLI — goes through [`CommandRunner`].
//! Pipeline modules take `&dyn CommandRunner` instead of spawning processes
//! directly, so tests can script exit codes and output streams without git
//! or the aws CLI installed.
//!
//! There is deliberately no timeout layer here: every call blocks until the
//! child exits, matching the synchronous, sequential execution model of the
//! pipeline. A hanging external tool hangs the run.

use std::io;
use std::process::Command;

/// Captured result of one external command invocation.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code if the process exited normally; `None` if killed by signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// True when the process exited with status zero.
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Build a zero-exit output with the given stdout. Handy in tests and
    /// for runners that synthesize results.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }
}

/// Capability to run an external command and capture its outcome.
///
/// `run` returns `Err` only when the command could not be spawned at all
/// (binary missing, permission). A command that ran and failed comes back
/// as `Ok` with a non-zero status — callers decide whether that is fatal.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> io::Result<CommandOutput>;
}

/// The production runner: spawns real processes with captured streams.
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, program: &str, args: &[&str]) -> io::Result<CommandOutput> {
        let out = Command::new(program).args(args).output()?;
        Ok(CommandOutput {
            status: out.status.code(),
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(unix)]
    fn captures_stdout_and_zero_status() {
        let out = ProcessRunner.run("echo", &["hello"]).unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "hello");
        assert!(out.stderr.is_empty());
    }

    #[test]
    #[cfg(unix)]
    fn nonzero_exit_is_ok_but_not_success() {
        let out = ProcessRunner.run("false", &[]).unwrap();
        assert!(!out.success());
        assert_eq!(out.status, Some(1));
    }

    #[test]
    fn missing_binary_is_spawn_error() {
        let err = ProcessRunner.run("definitely-not-a-real-binary-xyz", &[]);
        assert!(err.is_err());
    }

    #[test]
    fn ok_constructor_is_success() {
        let out = CommandOutput::ok("hi");
        assert!(out.success());
        assert_eq!(out.stdout, "hi");
    }
}
