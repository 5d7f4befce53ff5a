//! Test utilities and mocks for vcbuild unit tests.
//!
//! The [`MockRunner`] stands in for the MSVC toolchain: it records every
//! stage it is asked to run, returns scripted output and can create the
//! stage's expected artifact, so executor and pipeline tests never spawn a
//! process.
//!
//! # Example
//!
//! ```rust,ignore
//! use crate::test_support::{stage_failed, MockRunner, ProjectFixture};
//!
//! #[test]
//! fn test_example() {
//!     let tmp = TempDir::new().unwrap();
//!     let project = ProjectFixture::new("app").write_to(tmp.path()).unwrap();
//!     let runner = MockRunner::new()
//!         .respond(StageKind::Main, stage_failed(2, "a.cpp(1): error C2065: x"), false);
//!     // Run the executor with &runner...
//! }
//! ```

pub mod fixtures;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{bail, Result};

use crate::builder::executor::{CommandRunner, StageOutput};
use crate::builder::plan::{Stage, StageKind};

// Re-export fixtures for convenience
pub use fixtures::*;

/// Output of a stage that exited 0.
pub fn stage_ok(stdout: impl Into<String>) -> StageOutput {
    StageOutput::new(Some(0), stdout, "")
}

/// Output of a stage that exited with `status`.
pub fn stage_failed(status: i32, stdout: impl Into<String>) -> StageOutput {
    StageOutput::new(Some(status), stdout, "")
}

#[derive(Debug, Clone)]
enum MockResponse {
    Output {
        output: StageOutput,
        create_artifact: bool,
    },
    SpawnError(String),
}

/// Scripted stand-in for the toolchain.
///
/// Stages without a scripted response succeed and produce their artifact.
#[derive(Debug, Default)]
pub struct MockRunner {
    responses: HashMap<StageKind, MockResponse>,
    calls: Mutex<Vec<Stage>>,
}

impl MockRunner {
    pub fn new() -> Self {
        MockRunner::default()
    }

    /// Return `output` for every stage of `kind`.
    pub fn respond(mut self, kind: StageKind, output: StageOutput, create_artifact: bool) -> Self {
        self.responses.insert(
            kind,
            MockResponse::Output {
                output,
                create_artifact,
            },
        );
        self
    }

    /// Fail to start stages of `kind`, as if `cmd.exe` could not be spawned.
    pub fn fail_to_spawn(mut self, kind: StageKind, message: impl Into<String>) -> Self {
        self.responses
            .insert(kind, MockResponse::SpawnError(message.into()));
        self
    }

    /// Every stage run so far, in order.
    pub fn calls(&self) -> Vec<Stage> {
        self.calls.lock().unwrap().clone()
    }

    /// Kinds of the stages run so far, in order.
    pub fn kinds(&self) -> Vec<StageKind> {
        self.calls().iter().map(|s| s.kind).collect()
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, stage: &Stage) -> Result<StageOutput> {
        self.calls.lock().unwrap().push(stage.clone());
        match self.responses.get(&stage.kind) {
            None => {
                touch(&stage.output)?;
                Ok(stage_ok(""))
            }
            Some(MockResponse::Output {
                output,
                create_artifact,
            }) => {
                if *create_artifact {
                    touch(&stage.output)?;
                }
                Ok(output.clone())
            }
            Some(MockResponse::SpawnError(message)) => bail!("failed to spawn `cmd`: {}", message),
        }
    }
}

fn touch(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, b"")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::plan::StageCommand;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn stage(kind: StageKind, output: PathBuf) -> Stage {
        Stage {
            kind,
            input: None,
            commands: vec![StageCommand::new("cl.exe", Path::new("."))],
            output,
        }
    }

    #[test]
    fn test_mock_runner_defaults_to_success() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("build").join("app.exe");
        let runner = MockRunner::new();

        let output = runner.run(&stage(StageKind::Main, out.clone())).unwrap();
        assert!(output.success());
        assert!(out.exists());
        assert_eq!(runner.kinds(), vec![StageKind::Main]);
    }

    #[test]
    fn test_mock_runner_scripted() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("app.res");
        let runner = MockRunner::new()
            .respond(StageKind::Resource, stage_failed(1, "error RC2135"), false)
            .fail_to_spawn(StageKind::Pch, "boom");

        let output = runner.run(&stage(StageKind::Resource, out.clone())).unwrap();
        assert_eq!(output.exit_code, Some(1));
        assert!(!out.exists());

        let err = runner
            .run(&stage(StageKind::Pch, tmp.path().join("x.pch")))
            .unwrap_err();
        assert!(err.to_string().contains("boom"));
        assert_eq!(runner.calls().len(), 2);
    }
}
