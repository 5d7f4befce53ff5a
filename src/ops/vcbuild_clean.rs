//! Implementation of `vcbuild clean`.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::builder::executor::sweep_stray_files;
use crate::builder::fingerprint::BuildCache;
use crate::core::profile::DEFAULT_PROFILE;
use crate::core::resolve::{load, CliOverrides, ResolvedConfig};
use crate::util::context::GlobalContext;
use crate::util::fs::remove_dir_all_if_exists;
use crate::util::shell::{Shell, Status};

/// What a clean removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanSummary {
    /// The output directory, if it existed.
    pub output_dir: Option<PathBuf>,
    /// Names of stray intermediates swept from the project root.
    pub stray_files: Vec<String>,
}

/// Clean the project rooted at `ctx` using the default profile's layout.
pub fn clean(ctx: &GlobalContext, shell: &Shell) -> Result<CleanSummary> {
    let resolved = load(
        ctx.project_root(),
        &ctx.config_path(),
        DEFAULT_PROFILE,
        &CliOverrides::default(),
    )?;
    clean_outputs(&resolved, &ctx.cache_path(), shell)
}

/// Remove the output directory, stray root intermediates and the build cache
/// stored at `cache_path`.
pub fn clean_outputs(
    resolved: &ResolvedConfig,
    cache_path: &Path,
    shell: &Shell,
) -> Result<CleanSummary> {
    let mut summary = CleanSummary::default();

    let output_dir = resolved.output_dir();
    if output_dir.exists() {
        remove_dir_all_if_exists(&output_dir)?;
        shell.status(Status::Removed, output_dir.display());
        summary.output_dir = Some(output_dir);
    } else {
        shell.detail("nothing to clean");
    }

    summary.stray_files = sweep_stray_files(resolved.root());
    if !summary.stray_files.is_empty() {
        shell.detail(format!("cleaned up: {}", summary.stray_files.join(", ")));
    }

    BuildCache::load(cache_path).clear()?;
    Ok(summary)
}
