#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::{TempDir, tempdir};

pub const ROSTER_CSV: &str = "\
Character Name,Alias List,Status,Importance,is main character,Personality,Skills
Ari Vale,\"[\"\"Red\"\", \"\"The Fox\"\"]\",active,8,yes,\"{\"\"temper\"\": \"\"calm\"\"}\",\"archery, stealth\"
Sam Ode,,retired,15,no,Cheerful,
ari vale,,Inactive,x,Y,,\"[\"\"cooking\"\"]\"
,,deceased,2,,,
";

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}

/// The CLI binary with logging silenced so stdout/stderr only carry output.
pub fn roster_import() -> Command {
    let mut command = Command::cargo_bin("roster-import").expect("binary exists");
    command.env("RUST_LOG", "off");
    command
}
