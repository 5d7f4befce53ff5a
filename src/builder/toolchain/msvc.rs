//! MSVC environment and kernel-mode tables.

use std::path::{Path, PathBuf};

use crate::core::manifest::{Arch, DriverSection, DriverType};

/// A located `vcvarsall.bat`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsvcEnvironment {
    vcvarsall: PathBuf,
}

impl MsvcEnvironment {
    pub fn new(vcvarsall: impl Into<PathBuf>) -> Self {
        MsvcEnvironment {
            vcvarsall: vcvarsall.into(),
        }
    }

    pub fn vcvarsall(&self) -> &Path {
        &self.vcvarsall
    }

    /// The command string handed to `cmd /d /s /c`.
    ///
    /// With `/s`, cmd strips exactly the outer pair of quotes and runs the
    /// rest, so quoted paths inside `command_line` survive.
    pub fn wrap_command(&self, arch: Arch, command_line: &str) -> String {
        format!(
            "\"\"{}\" {} >nul 2>&1 && {}\"",
            self.vcvarsall.display(),
            arch,
            command_line
        )
    }
}

/// A located Windows Driver Kit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverKit {
    root: PathBuf,
    version: String,
}

impl DriverKit {
    pub fn new(root: impl Into<PathBuf>, version: impl Into<String>) -> Self {
        DriverKit {
            root: root.into(),
            version: version.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Kernel include directories, in search order.
    pub fn include_dirs(&self, driver: &DriverSection) -> Vec<PathBuf> {
        let include = self.root.join("Include").join(&self.version);
        let mut dirs = vec![
            include.join("km"),
            include.join("km").join("crt"),
            include.join("shared"),
        ];
        if driver.kind == DriverType::Kmdf {
            dirs.push(
                self.root
                    .join("Include")
                    .join("wdf")
                    .join("kmdf")
                    .join(&driver.kmdf_version),
            );
        }
        dirs
    }

    /// Kernel library directories for `arch`.
    pub fn lib_dirs(&self, arch: Arch, driver: &DriverSection) -> Vec<PathBuf> {
        let mut dirs = vec![self
            .root
            .join("Lib")
            .join(&self.version)
            .join("km")
            .join(arch.as_str())];
        if driver.kind == DriverType::Kmdf {
            dirs.push(
                self.root
                    .join("Lib")
                    .join("wdf")
                    .join("kmdf")
                    .join(arch.as_str())
                    .join(&driver.kmdf_version),
            );
        }
        dirs
    }
}

fn arch_defines(arch: Arch) -> &'static [&'static str] {
    match arch {
        Arch::X64 => &["_AMD64_", "_WIN64", "AMD64"],
        Arch::X86 => &["_X86_", "i386"],
        Arch::Arm64 => &["_ARM64_", "ARM64", "_WIN64"],
    }
}

/// Preprocessor defines every kernel-mode translation unit needs.
pub fn kernel_defines(arch: Arch, driver: &DriverSection) -> Vec<String> {
    let (winnt, ntddi) = driver.os_versions();

    let mut defines = vec!["_KERNEL_MODE".to_string()];
    defines.extend(arch_defines(arch).iter().map(|d| d.to_string()));
    defines.push(format!("_WIN32_WINNT={}", winnt));
    defines.push(format!("NTDDI_VERSION={}", ntddi));
    defines.push("POOL_NX_OPTIN=1".to_string());

    if driver.kind == DriverType::Kmdf {
        let (major, minor) = driver.kmdf_version_parts();
        defines.push(format!("KMDF_VERSION_MAJOR={}", major));
        defines.push(format!("KMDF_VERSION_MINOR={}", minor));
    }
    defines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::defaults;

    fn driver() -> DriverSection {
        serde_json::from_value(defaults()["driver"].clone()).unwrap()
    }

    #[test]
    fn test_wrap_command() {
        let env = MsvcEnvironment::new(r"C:\VS\vcvarsall.bat");
        assert_eq!(
            env.wrap_command(Arch::X64, r#"cl.exe /nologo "src\main.cpp""#),
            r#"""C:\VS\vcvarsall.bat" x64 >nul 2>&1 && cl.exe /nologo "src\main.cpp"""#
        );
    }

    #[test]
    fn test_kernel_defines_wdm_x64() {
        let defines = kernel_defines(Arch::X64, &driver());
        assert_eq!(
            defines,
            vec![
                "_KERNEL_MODE",
                "_AMD64_",
                "_WIN64",
                "AMD64",
                "_WIN32_WINNT=0x0A00",
                "NTDDI_VERSION=0x0A000000",
                "POOL_NX_OPTIN=1",
            ]
        );
    }

    #[test]
    fn test_kernel_defines_kmdf_and_fallback() {
        let mut d = driver();
        d.kind = DriverType::Kmdf;
        d.target_os = "win98".into();
        d.kmdf_version = "1.31".into();

        let defines = kernel_defines(Arch::X86, &d);
        assert!(defines.contains(&"_X86_".to_string()));
        assert!(defines.contains(&"NTDDI_VERSION=0x0A000000".to_string()));
        assert!(defines.contains(&"KMDF_VERSION_MAJOR=1".to_string()));
        assert!(defines.contains(&"KMDF_VERSION_MINOR=31".to_string()));
    }

    #[test]
    fn test_kit_directories() {
        let kit = DriverKit::new("/wdk", "10.0.22621.0");
        let mut d = driver();

        let includes = kit.include_dirs(&d);
        assert_eq!(includes.len(), 3);
        assert!(includes[0].ends_with("Include/10.0.22621.0/km"));

        d.kind = DriverType::Kmdf;
        let libs = kit.lib_dirs(Arch::Arm64, &d);
        assert_eq!(
            libs,
            vec![
                PathBuf::from("/wdk/Lib/10.0.22621.0/km/arm64"),
                PathBuf::from("/wdk/Lib/wdf/kmdf/arm64/1.15"),
            ]
        );
        assert!(kit.include_dirs(&d)[3].ends_with("Include/wdf/kmdf/1.15"));
    }
}
