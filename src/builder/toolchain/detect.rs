//! Toolchain detection functions.

use std::path::{Path, PathBuf};

use regex::Regex;

use super::{DriverKit, MsvcEnvironment, ToolchainError};

/// Environment variable pointing directly at a `vcvarsall.bat`.
pub const VCVARSALL_ENV: &str = "VCBUILD_VCVARSALL";

/// Environment variable pointing at a Windows Kits root.
pub const WDK_ROOT_ENV: &str = "VCBUILD_WDK_ROOT";

const VCVARSALL_LOCATIONS: &[&str] = &[
    r"C:\Program Files\Microsoft Visual Studio\2022\Enterprise\VC\Auxiliary\Build\vcvarsall.bat",
    r"C:\Program Files\Microsoft Visual Studio\2022\Professional\VC\Auxiliary\Build\vcvarsall.bat",
    r"C:\Program Files\Microsoft Visual Studio\2022\Community\VC\Auxiliary\Build\vcvarsall.bat",
    r"C:\Program Files (x86)\Microsoft Visual Studio\2022\BuildTools\VC\Auxiliary\Build\vcvarsall.bat",
    r"C:\Program Files (x86)\Microsoft Visual Studio\2019\Enterprise\VC\Auxiliary\Build\vcvarsall.bat",
    r"C:\Program Files (x86)\Microsoft Visual Studio\2019\Professional\VC\Auxiliary\Build\vcvarsall.bat",
    r"C:\Program Files (x86)\Microsoft Visual Studio\2019\Community\VC\Auxiliary\Build\vcvarsall.bat",
    r"C:\Program Files (x86)\Microsoft Visual Studio\2019\BuildTools\VC\Auxiliary\Build\vcvarsall.bat",
];

const WDK_LOCATIONS: &[&str] = &[
    r"C:\Program Files (x86)\Windows Kits\10",
    r"C:\Program Files\Windows Kits\10",
];

/// Ordered candidate lists for the compiler environment and driver kit.
///
/// The first existing candidate wins.
#[derive(Debug, Clone, Default)]
pub struct ToolchainLocator {
    vcvarsall_candidates: Vec<PathBuf>,
    kit_candidates: Vec<PathBuf>,
}

impl ToolchainLocator {
    /// Candidates from the environment overrides followed by the well-known
    /// install locations.
    pub fn from_env() -> Self {
        let mut vcvarsall_candidates: Vec<PathBuf> = Vec::new();
        if let Some(path) = std::env::var_os(VCVARSALL_ENV) {
            vcvarsall_candidates.push(PathBuf::from(path));
        }
        vcvarsall_candidates.extend(VCVARSALL_LOCATIONS.iter().map(PathBuf::from));

        let mut kit_candidates: Vec<PathBuf> = Vec::new();
        if let Some(path) = std::env::var_os(WDK_ROOT_ENV) {
            kit_candidates.push(PathBuf::from(path));
        }
        kit_candidates.extend(WDK_LOCATIONS.iter().map(PathBuf::from));

        ToolchainLocator {
            vcvarsall_candidates,
            kit_candidates,
        }
    }

    /// A locator with explicit candidate lists.
    pub fn with_candidates(vcvarsall: Vec<PathBuf>, kits: Vec<PathBuf>) -> Self {
        ToolchainLocator {
            vcvarsall_candidates: vcvarsall,
            kit_candidates: kits,
        }
    }

    /// Find `vcvarsall.bat`.
    pub fn locate_compiler_environment(&self) -> Result<MsvcEnvironment, ToolchainError> {
        for candidate in &self.vcvarsall_candidates {
            tracing::debug!("probing {}", candidate.display());
            if candidate.is_file() {
                tracing::info!("using MSVC environment {}", candidate.display());
                return Ok(MsvcEnvironment::new(candidate.clone()));
            }
        }
        Err(ToolchainError::CompilerNotFound {
            searched: self.vcvarsall_candidates.clone(),
        })
    }

    /// Find a Windows Driver Kit root and its latest kernel-capable version.
    pub fn locate_driver_kit(&self) -> Result<DriverKit, ToolchainError> {
        for root in &self.kit_candidates {
            tracing::debug!("probing WDK root {}", root.display());
            if let Some(version) = latest_kit_version(root) {
                tracing::info!("using WDK {} at {}", version, root.display());
                return Ok(DriverKit::new(root.clone(), version));
            }
        }
        Err(ToolchainError::DriverKitNotFound {
            searched: self.kit_candidates.clone(),
        })
    }
}

/// Latest version under `<root>/Include` that has kernel-mode headers.
///
/// Versions compare as plain strings, which orders `10.0.22621.0` after
/// `10.0.19041.0` but would misorder components of different widths.
pub fn latest_kit_version(root: &Path) -> Option<String> {
    let include = root.join("Include");
    let entries = std::fs::read_dir(&include).ok()?;
    let version_like = Regex::new(r"^\d+(\.\d+)+$").ok()?;

    entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| version_like.is_match(name))
        .filter(|name| include.join(name).join("km").is_dir())
        .max()
}
