//! Stage execution.
//!
//! Runs the stages of a plan in order through a [`CommandRunner`]: the
//! precompiled header, then the resource scripts, then the main compile and
//! link. A failed preparatory stage aborts the build before the main stage.
//! Success of the main stage means exit status 0 and an existing artifact.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::builder::diagnostics::{classify, ClassifiedOutput};
use crate::builder::error::BuildError;
use crate::builder::plan::{Stage, StageKind, Synthesizer};
use crate::builder::toolchain::MsvcEnvironment;
use crate::core::manifest::Arch;
use crate::util::fs::{ensure_dir, remove_files_with_extensions};
use crate::util::process::ProcessBuilder;
use crate::util::shell::{Shell, Status};

/// Intermediates that cl.exe may drop into the working directory.
pub const STRAY_EXTENSIONS: &[&str] = &["obj", "pdb", "idb", "ilk"];

/// Captured result of one stage invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl StageOutput {
    pub fn new(exit_code: Option<i32>, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        StageOutput {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn classify(&self) -> ClassifiedOutput {
        classify(&self.stdout, &self.stderr)
    }
}

/// Runs one stage and captures its output.
///
/// Blocks until the invocation exits.
pub trait CommandRunner {
    fn run(&self, stage: &Stage) -> Result<StageOutput>;
}

/// Runs stages through `cmd.exe` after initializing the MSVC environment.
#[derive(Debug, Clone)]
pub struct VcvarsRunner {
    env: MsvcEnvironment,
    arch: Arch,
}

impl VcvarsRunner {
    pub fn new(env: MsvcEnvironment, arch: Arch) -> Self {
        VcvarsRunner { env, arch }
    }

    /// The process that would run `stage`.
    pub fn process(&self, stage: &Stage) -> ProcessBuilder {
        let mut process = ProcessBuilder::new("cmd")
            .args(["/d", "/s", "/c"])
            .raw_arg(self.env.wrap_command(self.arch, &stage.command_line()));
        if let Some(cwd) = stage.cwd() {
            process = process.cwd(cwd);
        }
        process
    }
}

impl CommandRunner for VcvarsRunner {
    fn run(&self, stage: &Stage) -> Result<StageOutput> {
        let process = self.process(stage);
        tracing::debug!("running {} stage: {}", stage.kind.as_str(), process.display_command());
        let output = process.exec()?;
        Ok(StageOutput::new(
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        ))
    }
}

/// Remove stray intermediates from the top level of `root`.
pub fn sweep_stray_files(root: &Path) -> Vec<String> {
    remove_files_with_extensions(root, STRAY_EXTENSIONS)
}

/// Sweeps stray intermediates from the project root when dropped, so the
/// main stage leaves none behind on any exit path.
struct StrayFileGuard<'a> {
    root: &'a Path,
    shell: &'a Shell,
}

impl Drop for StrayFileGuard<'_> {
    fn drop(&mut self) {
        let removed = sweep_stray_files(self.root);
        if !removed.is_empty() {
            self.shell
                .verbose(format!("cleaned up: {}", removed.join(", ")));
        }
    }
}

/// Outcome of an executed build.
#[derive(Debug, Clone)]
pub struct BuildResult {
    /// Exit status 0 and the artifact exists.
    pub success: bool,
    pub output_path: PathBuf,
    pub exit_code: Option<i32>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Translation units handed to the compiler, including the PCH source.
    pub files_compiled: usize,
    /// Compiled resource artifacts passed to the linker.
    pub resources: Vec<PathBuf>,
    pub duration: Duration,
}

/// Executes synthesized stages.
pub struct BuildExecutor<'a> {
    runner: &'a dyn CommandRunner,
    shell: &'a Shell,
}

impl<'a> BuildExecutor<'a> {
    pub fn new(runner: &'a dyn CommandRunner, shell: &'a Shell) -> Self {
        BuildExecutor { runner, shell }
    }

    /// Run every stage of the plan.
    ///
    /// Preparatory stage failures are returned as errors. A failed main stage
    /// is reported through [`BuildResult::success`] so that its diagnostics
    /// can be shown.
    pub fn execute(&self, synth: &Synthesizer<'_>) -> Result<BuildResult, BuildError> {
        let start = Instant::now();
        let resolved = synth.resolved();
        ensure_dir(&resolved.output_dir())?;
        ensure_dir(&resolved.obj_dir())?;

        let mut warnings = Vec::new();

        if let Some(stage) = synth.pch_stage() {
            let classified = self.run_pch(&stage)?;
            warnings.extend(classified.warnings);
        }

        let resources = self.run_resources(&synth.resource_stages(), &mut warnings)?;

        let main = synth.main_stage(&resources);
        let files_compiled = synth.main_sources().len() + usize::from(synth.pch().is_some());
        self.shell
            .status(Status::Compiling, format!("{} file(s)", files_compiled));

        let output = {
            let _cleanup = StrayFileGuard {
                root: resolved.root(),
                shell: self.shell,
            };
            self.run_stage(&main, "compiling and linking")?
        };

        let classified = output.classify();
        self.echo_other(&classified);
        warnings.extend(classified.warnings);

        let success = output.success() && main.output.exists();
        if output.success() && !success {
            tracing::debug!("toolchain exited 0 but {} is missing", main.output.display());
        }

        Ok(BuildResult {
            success,
            output_path: main.output,
            exit_code: output.exit_code,
            errors: classified.errors,
            warnings,
            files_compiled,
            resources,
            duration: start.elapsed(),
        })
    }

    fn run_stage(&self, stage: &Stage, message: &str) -> Result<StageOutput> {
        self.shell.verbose(stage.command_line());
        let spinner = self.shell.spinner(message);
        let result = self.runner.run(stage);
        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }
        result
    }

    fn echo_other(&self, classified: &ClassifiedOutput) {
        for line in &classified.other {
            self.shell.verbose(line);
        }
    }

    fn run_pch(&self, stage: &Stage) -> Result<ClassifiedOutput, BuildError> {
        if let Some(input) = stage.input.as_deref().filter(|p| !p.is_file()) {
            return Err(BuildError::StageFailure {
                stage: StageKind::Pch,
                reason: format!("precompiled header source {} not found", input.display()),
                errors: Vec::new(),
            });
        }

        self.shell.status(Status::Compiling, "precompiled header");
        let output = self.run_stage(stage, "compiling precompiled header")?;
        let classified = output.classify();
        self.echo_other(&classified);

        let reason = if !output.success() {
            Some(describe_exit(output.exit_code))
        } else if !classified.errors.is_empty() {
            Some("toolchain reported errors".to_string())
        } else if !stage.output.exists() {
            Some(format!("{} was not produced", stage.output.display()))
        } else {
            None
        };

        match reason {
            Some(reason) => Err(BuildError::StageFailure {
                stage: StageKind::Pch,
                reason,
                errors: classified.errors,
            }),
            None => Ok(classified),
        }
    }

    /// Compile each resource script. Missing or failing scripts are reported
    /// and skipped; the stage fails only when nothing compiled.
    fn run_resources(
        &self,
        stages: &[Stage],
        warnings: &mut Vec<String>,
    ) -> Result<Vec<PathBuf>, BuildError> {
        if stages.is_empty() {
            return Ok(Vec::new());
        }

        let mut outputs = Vec::new();
        let mut errors = Vec::new();
        for stage in stages {
            let Some(script) = stage.input.as_deref() else {
                continue;
            };
            if !script.is_file() {
                self.shell
                    .warn(format!("resource script {} not found, skipping", script.display()));
                continue;
            }

            self.shell.status(Status::Compiling, script.display());
            let output = self.run_stage(stage, "compiling resources")?;
            let classified = output.classify();
            self.echo_other(&classified);
            warnings.extend(classified.warnings);

            if output.success() && classified.errors.is_empty() && stage.output.exists() {
                outputs.push(stage.output.clone());
            } else {
                self.shell.warn(format!(
                    "failed to compile {} ({})",
                    script.display(),
                    describe_exit(output.exit_code)
                ));
                errors.extend(classified.errors);
            }
        }

        if outputs.is_empty() {
            return Err(BuildError::StageFailure {
                stage: StageKind::Resource,
                reason: format!("none of {} resource script(s) compiled", stages.len()),
                errors,
            });
        }
        Ok(outputs)
    }
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {}", code),
        None => "terminated by signal".to_string(),
    }
}
