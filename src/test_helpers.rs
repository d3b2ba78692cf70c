//! Shared test utilities for the stagehand test suite.
//!
//! Provides a canned artifact tree for staging tests and a scripted
//! [`CommandRunner`] so pipeline tests never touch git or the aws CLI.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = tempfile::TempDir::new().unwrap();
//! let dist = tmp.path().join("dist");
//! write_artifact_tree(&dist);
//!
//! let runner = ScriptedRunner::new(vec![CommandOutput::ok("abcd123\n")]);
//! // ... drive identity/publish against `runner`, then:
//! assert_eq!(runner.calls(), vec!["git rev-parse --short HEAD"]);
//! ```

use crate::runner::{CommandOutput, CommandRunner};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::path::Path;

/// Stock entry document covering every built-in substitution rule once.
pub const ENTRY_DOCUMENT: &str = "\
<!DOCTYPE html>
<html>
<head>
  <link rel='stylesheet' href='rapid.css'>
</head>
<body>
  <div id='id-container'></div>
  <script src='rapid.js'></script>
  <script>
    var id = rapid.coreContext();
    id.ui().ensureLoaded();
  </script>
</body>
</html>
";

/// Write a small but representative artifact tree: the entry document,
/// one stylesheet, one script, and a nested asset directory.
///
/// Layout (4 files, 1 directory):
///
/// ```text
/// dist/
/// ├── index.html
/// ├── rapid.css
/// ├── rapid.js
/// └── img/
///     └── icon.svg
/// ```
pub fn write_artifact_tree(dist: &Path) {
    std::fs::create_dir_all(dist.join("img")).unwrap();
    std::fs::write(dist.join("index.html"), ENTRY_DOCUMENT).unwrap();
    std::fs::write(dist.join("rapid.css"), "body { margin: 0; }\n").unwrap();
    std::fs::write(dist.join("rapid.js"), "window.rapid = {};\n").unwrap();
    std::fs::write(dist.join("img/icon.svg"), "<svg/>\n").unwrap();
}

/// A [`CommandRunner`] that replays a queue of canned outputs and records
/// every invocation as a `"program arg1 arg2 ..."` string.
///
/// Panics if more commands are run than were scripted — an unexpected
/// external call in a test is a bug, not something to paper over.
pub struct ScriptedRunner {
    outputs: RefCell<VecDeque<CommandOutput>>,
    calls: RefCell<Vec<String>>,
    fail_spawn: bool,
}

impl ScriptedRunner {
    pub fn new(outputs: Vec<CommandOutput>) -> Self {
        Self {
            outputs: RefCell::new(outputs.into()),
            calls: RefCell::new(Vec::new()),
            fail_spawn: false,
        }
    }

    /// A runner whose every `run` fails as if the binary were missing.
    pub fn failing_spawn() -> Self {
        Self {
            outputs: RefCell::new(VecDeque::new()),
            calls: RefCell::new(Vec::new()),
            fail_spawn: true,
        }
    }

    /// Every invocation so far, oldest first.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[&str]) -> io::Result<CommandOutput> {
        let mut line = program.to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        self.calls.borrow_mut().push(line.clone());

        if self.fail_spawn {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{program}: command not found"),
            ));
        }
        let out = self
            .outputs
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| panic!("unscripted command: {line}"));
        Ok(out)
    }
}
