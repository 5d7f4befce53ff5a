//! Build plan synthesis.
//!
//! A BuildPlan lists the toolchain invocations for one build, in execution
//! order: the precompiled header, then each resource script, then the main
//! compile and link. Synthesis is pure. It never touches the filesystem or
//! spawns anything, so the same inputs always yield the same command lines.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::builder::discovery::{resolve_path, SourceSet};
use crate::builder::flags::{self, CompileRole, FlagContext, PchPaths};
use crate::builder::toolchain::DriverKit;
use crate::core::manifest::ProjectType;
use crate::core::resolve::ResolvedConfig;
use crate::util::fs::lexical_normalize;

/// Which part of the build a stage belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Create the precompiled header
    Pch,
    /// Compile one `.rc` script
    Resource,
    /// Compile and link (or archive) the artifact
    Main,
}

impl StageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Pch => "pch",
            StageKind::Resource => "resource",
            StageKind::Main => "main",
        }
    }
}

/// One toolchain program invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageCommand {
    /// The program to run (e.g., "cl.exe", "rc.exe")
    pub program: String,
    /// Arguments, already quoted for the command line
    pub args: Vec<String>,
    /// Working directory (the project root)
    pub cwd: PathBuf,
}

impl StageCommand {
    pub fn new(program: impl Into<String>, cwd: &Path) -> Self {
        StageCommand {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.to_path_buf(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(|a| a.into()));
        self
    }

    /// The command line as the shell sees it.
    pub fn command_line(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.as_str());
        parts.extend(self.args.iter().map(String::as_str));
        parts.join(" ")
    }
}

/// A discrete toolchain invocation: one or more commands run in a single
/// compiler environment, expected to produce `output`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stage {
    pub kind: StageKind,
    /// Primary input; must exist before the stage runs.
    pub input: Option<PathBuf>,
    pub commands: Vec<StageCommand>,
    /// Artifact whose existence marks success.
    pub output: PathBuf,
}

impl Stage {
    /// All commands chained with `&&`.
    pub fn command_line(&self) -> String {
        self.commands
            .iter()
            .map(StageCommand::command_line)
            .collect::<Vec<_>>()
            .join(" && ")
    }

    /// Working directory of the stage.
    pub fn cwd(&self) -> Option<&Path> {
        self.commands.first().map(|c| c.cwd.as_path())
    }
}

/// The complete derived plan for one build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildPlan {
    pub compiler_flags: Vec<String>,
    pub linker_flags: Vec<String>,
    /// Stages in execution order.
    pub stages: Vec<Stage>,
    pub output_path: PathBuf,
}

/// Maps a resolved configuration and source set to toolchain invocations.
#[derive(Debug, Clone)]
pub struct Synthesizer<'a> {
    resolved: &'a ResolvedConfig,
    sources: &'a SourceSet,
    kit: Option<&'a DriverKit>,
    pch: Option<PchPaths>,
}

impl<'a> Synthesizer<'a> {
    pub fn new(
        resolved: &'a ResolvedConfig,
        sources: &'a SourceSet,
        kit: Option<&'a DriverKit>,
    ) -> Self {
        Synthesizer {
            resolved,
            sources,
            kit,
            pch: PchPaths::for_config(resolved),
        }
    }

    pub fn resolved(&self) -> &'a ResolvedConfig {
        self.resolved
    }

    pub fn pch(&self) -> Option<&PchPaths> {
        self.pch.as_ref()
    }

    fn context<'s>(&'s self, role: CompileRole, resource_outputs: &'s [PathBuf]) -> FlagContext<'s> {
        FlagContext {
            resolved: self.resolved,
            sources: self.sources,
            kit: self.kit,
            pch: self.pch.as_ref(),
            role,
            resource_outputs,
        }
    }

    pub fn compiler_flags(&self, role: CompileRole) -> Vec<String> {
        flags::compiler_flags(&self.context(role, &[]))
    }

    /// Linker flags; empty for static libraries, which are archived instead.
    pub fn linker_flags(&self, resource_outputs: &[PathBuf]) -> Vec<String> {
        if self.is_static_lib() {
            return Vec::new();
        }
        flags::linker_flags(&self.context(CompileRole::Main, resource_outputs))
    }

    fn is_static_lib(&self) -> bool {
        self.resolved.config().project.kind == ProjectType::Lib
    }

    fn root(&self) -> &Path {
        self.resolved.root()
    }

    /// The precompiled header stage, if one is configured.
    pub fn pch_stage(&self) -> Option<Stage> {
        let pch = self.pch.as_ref()?;
        let command = StageCommand::new("cl.exe", self.root())
            .arg("/nologo")
            .args(self.compiler_flags(CompileRole::PchCreate))
            .arg("/c")
            .arg(format!("/Yc\"{}\"", pch.header))
            .arg(format!("/Fp\"{}\"", pch.pch.display()))
            .arg(format!("\"{}\"", pch.source.display()));
        Some(Stage {
            kind: StageKind::Pch,
            input: Some(pch.source.clone()),
            commands: vec![command],
            output: pch.pch.clone(),
        })
    }

    /// One stage per configured resource script, when resources are enabled.
    pub fn resource_stages(&self) -> Vec<Stage> {
        let config = self.resolved.config();
        if !config.resources.is_active() {
            return Vec::new();
        }
        let base = resolve_path(self.root(), &config.sources.root);
        let obj_dir = self.resolved.obj_dir();

        config
            .resources
            .files
            .iter()
            .map(|file| {
                let script = resolve_path(&base, file);
                let stem = script
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "resources".to_string());
                let output = obj_dir.join(format!("{}.res", stem));
                let command = StageCommand::new("rc.exe", self.root())
                    .arg("/nologo")
                    .arg(format!("/fo\"{}\"", output.display()))
                    .args(
                        self.sources
                            .include_dirs
                            .iter()
                            .map(|dir| format!("/I\"{}\"", dir.display())),
                    )
                    .arg(format!("\"{}\"", script.display()));
                Stage {
                    kind: StageKind::Resource,
                    input: Some(script),
                    commands: vec![command],
                    output,
                }
            })
            .collect()
    }

    /// Translation units for the main stage; the PCH source is compiled by
    /// its own stage and excluded here.
    pub fn main_sources(&self) -> Vec<&Path> {
        self.sources
            .sources
            .iter()
            .filter(|src| match &self.pch {
                Some(pch) => !same_file(src, &pch.source),
                None => true,
            })
            .map(PathBuf::as_path)
            .collect()
    }

    /// The main compile + link (or compile + archive) stage.
    pub fn main_stage(&self, resource_outputs: &[PathBuf]) -> Stage {
        let output = self.resolved.output_path();
        let sources = self.main_sources();
        let quoted_sources = sources.iter().map(|s| format!("\"{}\"", s.display()));
        let pch_object = self
            .pch
            .as_ref()
            .map(|pch| format!("\"{}\"", pch.object.display()));

        let compile = StageCommand::new("cl.exe", self.root())
            .arg("/nologo")
            .args(self.compiler_flags(CompileRole::Main));

        let commands = if self.is_static_lib() {
            let obj_dir = self.resolved.obj_dir();
            let objects = sources.iter().filter_map(|s| s.file_stem()).map(|stem| {
                format!(
                    "\"{}\"",
                    obj_dir
                        .join(format!("{}.obj", stem.to_string_lossy()))
                        .display()
                )
            });
            let archive = StageCommand::new("lib.exe", self.root())
                .arg("/nologo")
                .arg(format!("/OUT:\"{}\"", output.display()))
                .args(objects)
                .args(pch_object);
            vec![compile.arg("/c").args(quoted_sources), archive]
        } else {
            let link = compile
                .args(quoted_sources)
                .args(pch_object)
                .arg("/link")
                .args(self.linker_flags(resource_outputs));
            vec![link]
        };

        Stage {
            kind: StageKind::Main,
            input: None,
            commands,
            output,
        }
    }

    /// Names of the compiler and linker rules that fire for the main stage.
    ///
    /// Static libraries are archived, so no linker rule fires for them.
    pub fn active_rules(&self) -> (Vec<&'static str>, Vec<&'static str>) {
        let ctx = self.context(CompileRole::Main, &[]);
        let compiler = flags::active_rules(flags::COMPILER_RULES, &ctx);
        let linker = if self.is_static_lib() {
            Vec::new()
        } else {
            flags::active_rules(flags::LINKER_RULES, &ctx)
        };
        (compiler, linker)
    }

    /// The full plan, assuming every resource script compiles.
    pub fn plan(&self) -> BuildPlan {
        let mut stages = Vec::new();
        stages.extend(self.pch_stage());
        let resources = self.resource_stages();
        let resource_outputs: Vec<PathBuf> = resources.iter().map(|s| s.output.clone()).collect();
        stages.extend(resources);
        stages.push(self.main_stage(&resource_outputs));

        BuildPlan {
            compiler_flags: self.compiler_flags(CompileRole::Main),
            linker_flags: self.linker_flags(&resource_outputs),
            stages,
            output_path: self.resolved.output_path(),
        }
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    a == b || lexical_normalize(a) == lexical_normalize(b)
}
