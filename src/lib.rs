//! vcbuild - A lightweight MSVC build orchestrator for C/C++ projects
//!
//! This crate provides the library behind the `vcbuild` binary: layered
//! configuration resolution, source discovery, toolchain location, command
//! synthesis and stage execution.

pub mod builder;
pub mod core;
pub mod ops;
pub mod util;

/// Test utilities and mocks for vcbuild unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides a scripted toolchain runner and project
/// fixtures.
#[cfg(test)]
pub mod test_support;

pub use core::{CliOverrides, ConfigError, ProjectConfig, ResolvedConfig};
pub use util::context::GlobalContext;
