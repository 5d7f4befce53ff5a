//! Typed view of a validated `vcbuild.json`.
//!
//! The resolver merges and validates the raw JSON tree first. Only then is it
//! deserialized into these sections, so every enumerated field here is known
//! to hold one of its allowed values.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::profile::{AutoDefault, AutoOr, ProfileKind};

/// Kind of artifact a project produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    Exe,
    Dll,
    Lib,
    /// Kernel-mode driver.
    Sys,
}

impl ProjectType {
    /// File extension of the produced artifact, including the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ProjectType::Exe => ".exe",
            ProjectType::Dll => ".dll",
            ProjectType::Lib => ".lib",
            ProjectType::Sys => ".sys",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectType::Exe => "exe",
            ProjectType::Dll => "dll",
            ProjectType::Lib => "lib",
            ProjectType::Sys => "sys",
        }
    }
}

/// Target architecture, passed verbatim to `vcvarsall.bat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    X86,
    X64,
    Arm64,
}

impl Arch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::X86 => "x86",
            Arch::X64 => "x64",
            Arch::Arm64 => "arm64",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// C or C++ language standard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LanguageStandard {
    #[serde(rename = "c11")]
    C11,
    #[serde(rename = "c17")]
    C17,
    #[serde(rename = "c++14")]
    Cpp14,
    #[serde(rename = "c++17")]
    Cpp17,
    #[serde(rename = "c++20")]
    Cpp20,
    #[serde(rename = "c++23")]
    Cpp23,
    #[serde(rename = "c++latest")]
    CppLatest,
}

impl LanguageStandard {
    /// Value for the MSVC `/std:` flag.
    ///
    /// cl.exe has no `/std:c++23` switch yet; C++23 maps to `c++latest`.
    pub fn as_msvc_flag_value(&self) -> &'static str {
        match self {
            LanguageStandard::C11 => "c11",
            LanguageStandard::C17 => "c17",
            LanguageStandard::Cpp14 => "c++14",
            LanguageStandard::Cpp17 => "c++17",
            LanguageStandard::Cpp20 => "c++20",
            LanguageStandard::Cpp23 | LanguageStandard::CppLatest => "c++latest",
        }
    }
}

/// MSVC runtime library selection.
///
/// Controls /MD vs /MT. Kernel drivers link no CRT at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MsvcRuntime {
    /// Dynamic CRT (/MD, /MDd) - default
    #[default]
    Dynamic,
    /// Static CRT (/MT, /MTd)
    Static,
}

impl MsvcRuntime {
    /// Get the compiler flag for this runtime (release mode).
    pub fn as_flag(&self) -> &'static str {
        match self {
            MsvcRuntime::Dynamic => "/MD",
            MsvcRuntime::Static => "/MT",
        }
    }

    /// Get the compiler flag for this runtime (debug mode).
    pub fn as_debug_flag(&self) -> &'static str {
        match self {
            MsvcRuntime::Dynamic => "/MDd",
            MsvcRuntime::Static => "/MTd",
        }
    }
}

/// Optimization level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptLevel {
    None,
    Size,
    Speed,
    /// Speed plus whole-program optimization.
    Full,
}

impl AutoDefault for OptLevel {
    fn for_profile(kind: ProfileKind) -> Self {
        match kind {
            ProfileKind::Optimized => OptLevel::Full,
            ProfileKind::Unoptimized => OptLevel::None,
        }
    }
}

/// Amount of debug information emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebugInfo {
    None,
    Minimal,
    /// Program database plus runtime checks.
    Full,
}

impl AutoDefault for DebugInfo {
    fn for_profile(kind: ProfileKind) -> Self {
        match kind {
            ProfileKind::Optimized => DebugInfo::Minimal,
            ProfileKind::Unoptimized => DebugInfo::Full,
        }
    }
}

/// An on/off switch that may also be left as `"auto"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Toggle {
    Off,
    On,
}

impl Toggle {
    pub fn is_on(self) -> bool {
        self == Toggle::On
    }
}

impl AutoDefault for Toggle {
    fn for_profile(kind: ProfileKind) -> Self {
        match kind {
            ProfileKind::Optimized => Toggle::On,
            ProfileKind::Unoptimized => Toggle::Off,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FloatingPoint {
    Precise,
    Fast,
    Strict,
}

impl FloatingPoint {
    pub fn as_flag(&self) -> &'static str {
        match self {
            FloatingPoint::Precise => "/fp:precise",
            FloatingPoint::Fast => "/fp:fast",
            FloatingPoint::Strict => "/fp:strict",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallingConvention {
    Cdecl,
    Stdcall,
    Fastcall,
    Vectorcall,
}

impl CallingConvention {
    pub fn as_flag(&self) -> &'static str {
        match self {
            CallingConvention::Cdecl => "/Gd",
            CallingConvention::Stdcall => "/Gz",
            CallingConvention::Fastcall => "/Gr",
            CallingConvention::Vectorcall => "/Gv",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterSet {
    Unicode,
    Mbcs,
    None,
}

impl CharacterSet {
    /// Preprocessor defines selecting the character set.
    pub fn defines(&self) -> &'static [&'static str] {
        match self {
            CharacterSet::Unicode => &["UNICODE", "_UNICODE"],
            CharacterSet::Mbcs => &["_MBCS"],
            CharacterSet::None => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subsystem {
    Console,
    Windows,
    Native,
    EfiApplication,
    BootApplication,
    Posix,
}

impl Subsystem {
    /// Value for `/SUBSYSTEM:`.
    pub fn as_linker_value(&self) -> &'static str {
        match self {
            Subsystem::Console => "CONSOLE",
            Subsystem::Windows => "WINDOWS",
            Subsystem::Native => "NATIVE",
            Subsystem::EfiApplication => "EFI_APPLICATION",
            Subsystem::BootApplication => "BOOT_APPLICATION",
            Subsystem::Posix => "POSIX",
        }
    }
}

/// Kernel driver framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverType {
    /// Windows Driver Model
    Wdm,
    /// Kernel-Mode Driver Framework
    Kmdf,
}

/// A warning number to disable, written either as `4996` or `"4996"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WarningCode {
    Number(u32),
    Text(String),
}

impl fmt::Display for WarningCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningCode::Number(n) => write!(f, "{}", n),
            WarningCode::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSection {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: ProjectType,
    pub output_dir: PathBuf,
    pub output_name: Option<String>,
    pub architecture: Arch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningsConfig {
    pub level: u8,
    pub as_errors: bool,
    #[serde(default)]
    pub disabled: Vec<WarningCode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conformance {
    /// `true` keeps MSVC's permissive mode; `false` emits `/permissive-`.
    pub permissive: bool,
    pub cplusplus_macro: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerSecurity {
    pub buffer_checks: bool,
    pub control_flow_guard: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerSection {
    pub standard: LanguageStandard,
    pub runtime: MsvcRuntime,
    pub optimization: AutoOr<OptLevel>,
    pub warnings: WarningsConfig,
    #[serde(default)]
    pub defines: Vec<String>,
    pub conformance: Conformance,
    pub security: CompilerSecurity,
    pub debug_info: AutoOr<DebugInfo>,
    pub parallel: bool,
    pub exceptions: bool,
    pub rtti: bool,
    pub floating_point: FloatingPoint,
    pub calling_convention: CallingConvention,
    pub character_set: CharacterSet,
    #[serde(default)]
    pub additional_flags: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkerSecurity {
    pub aslr: bool,
    pub dep: bool,
    pub cfg: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkerSection {
    #[serde(default)]
    pub libraries: Vec<String>,
    #[serde(default)]
    pub library_paths: Vec<PathBuf>,
    pub subsystem: Subsystem,
    pub entry_point: Option<String>,
    pub def_file: Option<PathBuf>,
    pub stack_size: Option<u32>,
    pub heap_size: Option<u32>,
    pub generate_map: bool,
    pub security: LinkerSecurity,
    pub lto: AutoOr<Toggle>,
    pub strip_unreferenced: AutoOr<Toggle>,
    #[serde(default)]
    pub additional_flags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcesSection {
    pub root: PathBuf,
    #[serde(default)]
    pub include_dirs: Vec<PathBuf>,
    #[serde(default)]
    pub source_dirs: Vec<PathBuf>,
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    #[serde(default)]
    pub explicit_sources: Vec<PathBuf>,
    #[serde(default)]
    pub external_dirs: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PchSection {
    pub enabled: bool,
    pub header: Option<String>,
    pub source: Option<PathBuf>,
}

impl PchSection {
    /// Header and source, when both are configured and PCH is enabled.
    pub fn active(&self) -> Option<(&str, &PathBuf)> {
        if !self.enabled {
            return None;
        }
        match (self.header.as_deref(), self.source.as_ref()) {
            (Some(header), Some(source)) if !header.is_empty() => Some((header, source)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcesSection {
    pub enabled: bool,
    #[serde(default)]
    pub files: Vec<PathBuf>,
}

impl ResourcesSection {
    /// Whether a resource stage should run at all.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.files.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverSection {
    pub enabled: bool,
    #[serde(rename = "type")]
    pub kind: DriverType,
    pub entry_point: String,
    pub target_os: String,
    pub minifilter: bool,
    pub integrity_check: bool,
    pub kmdf_version: String,
}

/// Target OS used when `driver.target_os` is not in the table.
pub const DEFAULT_TARGET_OS: &str = "win10";

const TARGET_OS_VERSIONS: &[(&str, &str, &str)] = &[
    ("win7", "0x0601", "0x06010000"),
    ("win8", "0x0602", "0x06020000"),
    ("win81", "0x0603", "0x06030000"),
    ("win10", "0x0A00", "0x0A000000"),
    ("win11", "0x0A00", "0x0A00000B"),
];

/// `(_WIN32_WINNT, NTDDI_VERSION)` for a target OS name.
pub fn target_os_versions(target_os: &str) -> Option<(&'static str, &'static str)> {
    TARGET_OS_VERSIONS
        .iter()
        .find(|(name, _, _)| *name == target_os)
        .map(|(_, winnt, ntddi)| (*winnt, *ntddi))
}

impl DriverSection {
    /// Version constants for `target_os`, or those of the default target.
    pub fn os_versions(&self) -> (&'static str, &'static str) {
        target_os_versions(&self.target_os).unwrap_or(("0x0A00", "0x0A000000"))
    }

    /// KMDF `(major, minor)` parsed from `kmdf_version`, defaulting to 1.15.
    pub fn kmdf_version_parts(&self) -> (u32, u32) {
        let mut parts = self.kmdf_version.split('.').map(str::parse::<u32>);
        match (parts.next(), parts.next()) {
            (Some(Ok(major)), Some(Ok(minor))) => (major, minor),
            (Some(Ok(major)), None) => (major, 0),
            _ => (1, 15),
        }
    }
}

/// All sections the build reads, deserialized from the merged tree.
///
/// `profiles` and unknown top-level keys are ignored here; the raw tree is
/// kept alongside in `ResolvedConfig`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub project: ProjectSection,
    pub compiler: CompilerSection,
    pub linker: LinkerSection,
    pub sources: SourcesSection,
    pub pch: PchSection,
    pub resources: ResourcesSection,
    pub driver: DriverSection,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::defaults;
    use serde_json::json;

    #[test]
    fn test_defaults_deserialize() {
        let config: ProjectConfig = serde_json::from_value(defaults()).unwrap();
        assert_eq!(config.project.kind, ProjectType::Exe);
        assert_eq!(config.project.architecture, Arch::X64);
        assert_eq!(config.compiler.standard, LanguageStandard::Cpp20);
        assert!(config.compiler.optimization.is_auto());
        assert!(config.linker.lto.is_auto());
        assert_eq!(config.driver.kind, DriverType::Wdm);
        assert_eq!(config.pch.active(), None);
        assert!(!config.resources.is_active());
    }

    #[test]
    fn test_enum_spellings() {
        let std: LanguageStandard = serde_json::from_value(json!("c++latest")).unwrap();
        assert_eq!(std, LanguageStandard::CppLatest);
        assert_eq!(LanguageStandard::Cpp23.as_msvc_flag_value(), "c++latest");

        let sub: Subsystem = serde_json::from_value(json!("efi_application")).unwrap();
        assert_eq!(sub.as_linker_value(), "EFI_APPLICATION");
    }

    #[test]
    fn test_warning_codes_accept_numbers_and_strings() {
        let codes: Vec<WarningCode> = serde_json::from_value(json!([4996, "4100"])).unwrap();
        let rendered: Vec<String> = codes.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["4996", "4100"]);
    }

    #[test]
    fn test_pch_requires_header_and_source() {
        let mut pch = PchSection {
            enabled: true,
            header: Some("pch.h".into()),
            source: None,
        };
        assert_eq!(pch.active(), None);

        pch.source = Some(PathBuf::from("src/pch.cpp"));
        assert!(pch.active().is_some());

        pch.enabled = false;
        assert_eq!(pch.active(), None);
    }

    #[test]
    fn test_kmdf_version_parts() {
        let mut driver: DriverSection =
            serde_json::from_value(defaults()["driver"].clone()).unwrap();
        assert_eq!(driver.kmdf_version_parts(), (1, 15));

        driver.kmdf_version = "1.33".into();
        assert_eq!(driver.kmdf_version_parts(), (1, 33));

        driver.kmdf_version = "garbage".into();
        assert_eq!(driver.kmdf_version_parts(), (1, 15));
    }

    #[test]
    fn test_target_os_table() {
        assert_eq!(target_os_versions("win7"), Some(("0x0601", "0x06010000")));
        assert_eq!(target_os_versions("win11"), Some(("0x0A00", "0x0A00000B")));
        assert_eq!(target_os_versions("vista"), None);
        assert_eq!(target_os_versions(DEFAULT_TARGET_OS), Some(("0x0A00", "0x0A000000")));
    }
}
