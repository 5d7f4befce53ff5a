//! MSVC build pipeline.
//!
//! This module discovers sources, locates the toolchain, synthesizes the
//! stage command lines and runs them.

pub mod diagnostics;
pub mod discovery;
pub mod error;
pub mod executor;
pub mod fingerprint;
pub mod flags;
pub mod plan;
pub mod toolchain;

pub use discovery::{discover, SourceSet};
pub use error::BuildError;
pub use executor::{BuildExecutor, BuildResult, CommandRunner, VcvarsRunner};
pub use fingerprint::BuildCache;
pub use plan::{BuildPlan, Stage, StageKind, Synthesizer};
pub use toolchain::{DriverKit, MsvcEnvironment, ToolchainError, ToolchainLocator};
