//! Implementation of `vcbuild build`.
//!
//! The pipeline runs configuration resolution, source discovery, toolchain
//! location, synthesis and execution, strictly in that order. Every failure
//! before execution aborts without contacting the toolchain.

use std::path::PathBuf;

use anyhow::Result;

use crate::builder::discovery::{discover, searched_dirs, SourceSet};
use crate::builder::error::BuildError;
use crate::builder::executor::{BuildExecutor, BuildResult, CommandRunner, VcvarsRunner};
use crate::builder::fingerprint::BuildCache;
use crate::builder::plan::{BuildPlan, Synthesizer};
use crate::builder::toolchain::{DriverKit, MsvcEnvironment, ToolchainLocator};
use crate::core::profile::DEFAULT_PROFILE;
use crate::core::resolve::{load, CliOverrides, ResolvedConfig};
use crate::ops::vcbuild_clean::clean_outputs;
use crate::util::context::GlobalContext;
use crate::util::fs::relative_path;
use crate::util::hash::file_fingerprint;
use crate::util::shell::{format_duration, Shell, Status};

/// Warnings shown in normal verbosity before the rest are summarized.
pub const MAX_WARNINGS: usize = 5;

/// Errors shown before the rest are summarized.
pub const MAX_ERRORS: usize = 20;

/// Options for the build command.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Profile to apply (e.g. "debug", "release")
    pub profile: String,
    /// Values from the command line, applied last
    pub overrides: CliOverrides,
    /// Clean before building
    pub rebuild: bool,
    /// Print the stage command lines without running them
    pub dry_run: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            profile: DEFAULT_PROFILE.to_string(),
            overrides: CliOverrides::default(),
            rebuild: false,
            dry_run: false,
        }
    }
}

/// Everything needed to synthesize and run a build.
#[derive(Debug)]
pub struct PreparedBuild {
    pub resolved: ResolvedConfig,
    pub sources: SourceSet,
    pub env: MsvcEnvironment,
    pub kit: Option<DriverKit>,
    /// Where the build cache is stored.
    pub cache_path: PathBuf,
}

impl PreparedBuild {
    pub fn synthesizer(&self) -> Synthesizer<'_> {
        Synthesizer::new(&self.resolved, &self.sources, self.kit.as_ref())
    }

    /// The runner that executes stages through vcvarsall.
    pub fn runner(&self) -> VcvarsRunner {
        VcvarsRunner::new(
            self.env.clone(),
            self.resolved.config().project.architecture,
        )
    }
}

/// Result of a build command.
#[derive(Debug)]
pub enum BuildOutcome {
    /// Dry run; nothing was executed.
    Planned(BuildPlan),
    /// The artifact was produced.
    Built(BuildResult),
}

/// Run the full build pipeline for the project rooted at `ctx`.
pub fn build(ctx: &GlobalContext, opts: &BuildOptions, shell: &Shell) -> Result<BuildOutcome, BuildError> {
    let prepared = prepare(ctx, opts, shell, &ToolchainLocator::from_env())?;
    if opts.dry_run {
        let plan = dry_run(&prepared);
        shell.note(format!("dry run, {} stage(s) not executed", plan.stages.len()));
        return Ok(BuildOutcome::Planned(plan));
    }
    let runner = prepared.runner();
    run(&prepared, &runner, shell).map(BuildOutcome::Built)
}

/// Resolve the configuration, discover sources and locate the toolchain.
pub fn prepare(
    ctx: &GlobalContext,
    opts: &BuildOptions,
    shell: &Shell,
    locator: &ToolchainLocator,
) -> Result<PreparedBuild, BuildError> {
    let resolved = load(
        ctx.project_root(),
        &ctx.config_path(),
        &opts.profile,
        &opts.overrides,
    )?;

    if opts.rebuild && !opts.dry_run {
        clean_outputs(&resolved, &ctx.cache_path(), shell)?;
    }

    let project = &resolved.config().project;
    shell.status(
        Status::Building,
        format!(
            "{} [{}] {} {}",
            resolved.name(),
            resolved.profile(),
            project.architecture,
            project.kind.as_str()
        ),
    );

    let sources = discover(resolved.root(), &resolved.config().sources);
    if sources.is_empty() {
        return Err(BuildError::DiscoveryEmpty {
            searched: searched_dirs(resolved.root(), &resolved.config().sources),
        });
    }
    tracing::debug!(
        "found {} source file(s), {} include dir(s)",
        sources.len(),
        sources.include_dirs.len()
    );

    let env = locator.locate_compiler_environment()?;
    let kit = if resolved.is_driver() {
        Some(locator.locate_driver_kit()?)
    } else {
        None
    };

    Ok(PreparedBuild {
        resolved,
        sources,
        env,
        kit,
        cache_path: ctx.cache_path(),
    })
}

/// Print every stage command line to stdout without running anything.
pub fn dry_run(prepared: &PreparedBuild) -> BuildPlan {
    let synth = prepared.synthesizer();
    trace_rules(&synth);
    let plan = synth.plan();
    for stage in &plan.stages {
        println!("{}", stage.command_line());
    }
    plan
}

/// Execute the prepared build with `runner`, report diagnostics and update
/// the build cache.
pub fn run(
    prepared: &PreparedBuild,
    runner: &dyn CommandRunner,
    shell: &Shell,
) -> Result<BuildResult, BuildError> {
    let synth = prepared.synthesizer();
    trace_rules(&synth);
    let result = BuildExecutor::new(runner, shell).execute(&synth)?;

    report_diagnostics(&result, shell);

    if !result.success {
        return Err(BuildError::CompileLink {
            errors: result.errors.len(),
            warnings: result.warnings.len(),
            exit_code: result.exit_code,
        });
    }

    if let Err(e) = update_cache(prepared) {
        shell.warn(format!("could not update build cache: {:#}", e));
    }

    let root = prepared.resolved.root();
    shell.status(
        Status::Finished,
        format!(
            "{} file(s), {} warning(s), {} error(s) in {}",
            result.files_compiled,
            result.warnings.len(),
            result.errors.len(),
            format_duration(result.duration)
        ),
    );
    shell.detail(relative_path(root, &result.output_path).display());

    Ok(result)
}

fn trace_rules(synth: &Synthesizer<'_>) {
    let (compiler, linker) = synth.active_rules();
    tracing::debug!("compiler rules: {}", compiler.join(", "));
    tracing::debug!("linker rules: {}", linker.join(", "));
}

/// Print classified diagnostics, capped with an overflow count.
///
/// All warnings are shown in verbose mode.
pub fn report_diagnostics(result: &BuildResult, shell: &Shell) {
    let warning_cap = if shell.is_verbose() {
        usize::MAX
    } else {
        MAX_WARNINGS
    };
    for warning in result.warnings.iter().take(warning_cap) {
        shell.warn(warning);
    }
    if let Some(more) = overflow(result.warnings.len(), warning_cap) {
        shell.detail(format!("... and {} more warning(s)", more));
    }

    for error in result.errors.iter().take(MAX_ERRORS) {
        shell.error(error);
    }
    if let Some(more) = overflow(result.errors.len(), MAX_ERRORS) {
        shell.error(format!("... and {} more error(s)", more));
    }
}

fn overflow(total: usize, cap: usize) -> Option<usize> {
    (total > cap).then(|| total - cap)
}

/// Record source and configuration fingerprints of a successful build.
///
/// Staleness is only logged; it never decides what runs.
fn update_cache(prepared: &PreparedBuild) -> Result<()> {
    let mut cache = BuildCache::load(&prepared.cache_path);

    let mut stale = 0;
    for path in &prepared.sources.sources {
        let hash = file_fingerprint(path)?;
        if cache.differs(path, &hash) {
            stale += 1;
        }
        cache.record_hash(path, hash);
    }
    tracing::debug!(
        "{} of {} source file(s) changed since the last build",
        stale,
        prepared.sources.len()
    );

    let fingerprint = prepared.resolved.fingerprint();
    if cache.config_changed(&fingerprint) {
        tracing::debug!("configuration changed since the last build");
    }
    cache.record_config(&fingerprint);
    cache.persist()
}
