//! Error taxonomy for a build run.

use std::path::PathBuf;

use crate::builder::plan::StageKind;
use crate::builder::toolchain::ToolchainError;
use crate::core::error::ConfigError;
use crate::util::diagnostic::{suggestions, Diagnostic};

/// Everything that can abort a build.
///
/// Every variant is fatal and maps to a non-zero exit status.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Configuration could not be loaded or failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Discovery produced no translation units.
    #[error("no source files found")]
    DiscoveryEmpty { searched: Vec<PathBuf> },

    /// The compiler environment or driver kit is missing.
    #[error(transparent)]
    ToolchainNotFound(#[from] ToolchainError),

    /// A preparatory stage (PCH or resources) failed; later stages did not run.
    #[error("{} stage failed: {reason}", .stage.as_str())]
    StageFailure {
        stage: StageKind,
        reason: String,
        errors: Vec<String>,
    },

    /// The main compile and link failed or produced no artifact.
    #[error("build failed with {errors} error(s)")]
    CompileLink {
        errors: usize,
        warnings: usize,
        exit_code: Option<i32>,
    },

    /// Filesystem setup or process spawning failed.
    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

impl BuildError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            BuildError::Config(err) => err.to_diagnostic(),
            BuildError::ToolchainNotFound(err) => err.to_diagnostic(),
            BuildError::DiscoveryEmpty { searched } => {
                let mut diag = Diagnostic::error(self.to_string());
                for dir in searched {
                    diag = diag.with_context(format!("searched {}", dir.display()));
                }
                diag.with_suggestion(suggestions::NO_SOURCES)
            }
            BuildError::StageFailure { errors, .. } => {
                let mut diag = Diagnostic::error(self.to_string());
                for line in errors.iter().take(MAX_STAGE_ERRORS) {
                    diag = diag.with_context(line.clone());
                }
                if errors.len() > MAX_STAGE_ERRORS {
                    diag = diag.with_context(format!(
                        "... and {} more error(s)",
                        errors.len() - MAX_STAGE_ERRORS
                    ));
                }
                diag.with_suggestion(suggestions::BUILD_FAILED)
            }
            BuildError::CompileLink { exit_code, .. } => {
                let diag = Diagnostic::error(self.to_string());
                let diag = match exit_code {
                    Some(code) if *code != 0 => {
                        diag.with_context(format!("toolchain exited with status {}", code))
                    }
                    Some(_) => diag.with_context("toolchain reported success but the output is missing"),
                    None => diag.with_context("toolchain was terminated"),
                };
                diag.with_suggestion(suggestions::BUILD_FAILED)
            }
            BuildError::Io(err) => Diagnostic::error(format!("{:#}", err)),
        }
    }
}

const MAX_STAGE_ERRORS: usize = 20;
