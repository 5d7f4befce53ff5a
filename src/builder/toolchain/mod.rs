//! MSVC toolchain and Windows Driver Kit discovery.
//!
//! The compiler environment is a `vcvarsall.bat` script; every stage command
//! runs through it so `cl.exe`, `rc.exe` and `lib.exe` resolve from the
//! environment it sets up. Driver builds additionally need a WDK install.
//!
//! Search order:
//! 1. `VCBUILD_VCVARSALL` / `VCBUILD_WDK_ROOT` environment overrides
//! 2. Well-known install locations, first match wins

use std::path::PathBuf;

use crate::util::diagnostic::{suggestions, Diagnostic};

mod detect;
mod msvc;

pub use detect::{latest_kit_version, ToolchainLocator, VCVARSALL_ENV, WDK_ROOT_ENV};
pub use msvc::{kernel_defines, DriverKit, MsvcEnvironment};

/// A required toolchain component could not be found.
#[derive(Debug, thiserror::Error)]
pub enum ToolchainError {
    #[error("MSVC not found (vcvarsall.bat missing)")]
    CompilerNotFound { searched: Vec<PathBuf> },

    #[error("Windows Driver Kit not found")]
    DriverKitNotFound { searched: Vec<PathBuf> },
}

impl ToolchainError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let (searched, suggestion) = match self {
            ToolchainError::CompilerNotFound { searched } => (searched, suggestions::INSTALL_MSVC),
            ToolchainError::DriverKitNotFound { searched } => (searched, suggestions::INSTALL_WDK),
        };
        let mut diag = Diagnostic::error(self.to_string());
        for path in searched {
            diag = diag.with_context(format!("searched {}", path.display()));
        }
        diag.with_suggestion(suggestion)
    }
}
