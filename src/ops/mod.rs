//! High-level operations.
//!
//! This module contains the implementation of vcbuild commands.

pub mod config_gui;
pub mod vcbuild_build;
pub mod vcbuild_clean;
pub mod vcbuild_init;

pub use config_gui::launch_gui;
pub use vcbuild_build::{build, BuildOptions, BuildOutcome};
pub use vcbuild_clean::{clean, CleanSummary};
pub use vcbuild_init::init_project;
