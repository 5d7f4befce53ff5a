//! Test fixtures for common test scenarios.
//!
//! This module provides pre-built project layouts and configuration
//! generators for vcbuild tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use crate::core::merge::deep_merge;
use crate::core::resolve::{load, CliOverrides, ResolvedConfig};
use crate::util::context::{GlobalContext, CONFIG_FILENAME};

/// Fixture for a complete project directory.
#[derive(Debug, Clone)]
pub struct ProjectFixture {
    /// Project (and directory) name.
    pub name: String,
    /// vcbuild.json content; `None` writes no configuration file.
    pub config: Option<Value>,
    /// Files to write (path relative to project root -> content).
    pub files: BTreeMap<PathBuf, String>,
}

impl ProjectFixture {
    /// A console executable with a single `src/main.cpp`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let mut files = BTreeMap::new();
        files.insert(PathBuf::from("src/main.cpp"), sources::hello_world());
        ProjectFixture {
            config: Some(configs::minimal(&name)),
            name,
            files,
        }
    }

    /// A project with a configuration file but no sources.
    pub fn empty(name: impl Into<String>) -> Self {
        let name = name.into();
        ProjectFixture {
            config: Some(configs::minimal(&name)),
            name,
            files: BTreeMap::new(),
        }
    }

    /// A WDM kernel driver with a single `src/driver.c`.
    pub fn driver(name: impl Into<String>) -> Self {
        let name = name.into();
        let mut files = BTreeMap::new();
        files.insert(PathBuf::from("src/driver.c"), sources::driver_entry());
        ProjectFixture {
            config: Some(configs::driver(&name, "wdm")),
            name,
            files,
        }
    }

    /// Deep-merge `overlay` into the configuration file.
    pub fn with_config(mut self, overlay: Value) -> Self {
        let base = self.config.take().unwrap_or_else(|| json!({}));
        self.config = Some(deep_merge(base, &overlay));
        self
    }

    /// Do not write a vcbuild.json.
    pub fn without_config(mut self) -> Self {
        self.config = None;
        self
    }

    /// Add a translation unit.
    pub fn with_source(self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.with_file(path, content)
    }

    /// Add any other file (headers, resource scripts, .def files).
    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    /// Write the fixture to `base/<name>`.
    pub fn write_to(&self, base: &Path) -> std::io::Result<FixtureProject> {
        let root = base.join(&self.name);
        std::fs::create_dir_all(&root)?;

        if let Some(config) = &self.config {
            let content = serde_json::to_string_pretty(config).map_err(std::io::Error::other)?;
            std::fs::write(root.join(CONFIG_FILENAME), content)?;
        }

        for (path, content) in &self.files {
            let full = root.join(path);
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(full, content)?;
        }

        Ok(FixtureProject { root })
    }
}

/// A fixture written to disk.
#[derive(Debug, Clone)]
pub struct FixtureProject {
    root: PathBuf,
}

impl FixtureProject {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILENAME)
    }

    /// A context as if vcbuild were started in the project root.
    pub fn context(&self) -> GlobalContext {
        GlobalContext::with_cwd(self.root.clone())
    }

    /// Resolve the configuration for `profile` without CLI overrides.
    pub fn resolve(&self, profile: &str) -> ResolvedConfig {
        self.resolve_with(profile, &CliOverrides::default())
    }

    pub fn resolve_with(&self, profile: &str, overrides: &CliOverrides) -> ResolvedConfig {
        load(&self.root, &self.config_path(), profile, overrides)
            .unwrap_or_else(|e| panic!("fixture config should resolve: {e}"))
    }
}

/// Configuration file generators.
pub mod configs {
    use serde_json::{json, Value};

    /// The smallest useful configuration.
    pub fn minimal(name: &str) -> Value {
        json!({
            "project": {"name": name, "type": "exe"}
        })
    }

    /// A kernel driver configuration.
    pub fn driver(name: &str, driver_type: &str) -> Value {
        json!({
            "project": {"name": name, "type": "sys"},
            "driver": {"enabled": true, "type": driver_type}
        })
    }
}

/// Source file generators.
pub mod sources {
    pub fn hello_world() -> String {
        "#include <cstdio>\n\nint main() {\n    std::puts(\"hello\");\n    return 0;\n}\n"
            .to_string()
    }

    pub fn driver_entry() -> String {
        r#"#include <ntddk.h>

NTSTATUS DriverEntry(PDRIVER_OBJECT driver, PUNICODE_STRING path) {
    UNREFERENCED_PARAMETER(driver);
    UNREFERENCED_PARAMETER(path);
    return STATUS_SUCCESS;
}
"#
        .to_string()
    }
}

/// Toolchain output samples.
pub mod compiler_outputs {
    use crate::builder::executor::StageOutput;

    pub fn compile_success() -> StageOutput {
        StageOutput::new(Some(0), "main.cpp\n", "")
    }

    pub fn compile_with_warnings(warnings: &[&str]) -> StageOutput {
        StageOutput::new(Some(0), format!("main.cpp\n{}\n", warnings.join("\n")), "")
    }

    pub fn compile_error(file: &str, line: u32, message: &str) -> StageOutput {
        StageOutput::new(
            Some(2),
            format!("{}({}): error C2065: {}\n", file, line, message),
            "",
        )
    }

    pub fn link_unresolved(symbol: &str) -> StageOutput {
        StageOutput::new(
            Some(1120),
            format!(
                "main.obj : error LNK2019: unresolved external symbol {}\n\
                 build\\app.exe : fatal error LNK1120: 1 unresolved externals\n",
                symbol
            ),
            "",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fixture_writes_project() {
        let tmp = TempDir::new().unwrap();
        let project = ProjectFixture::new("app")
            .with_file("include/app.h", "#pragma once\n")
            .write_to(tmp.path())
            .unwrap();

        assert!(project.config_path().is_file());
        assert!(project.root().join("src/main.cpp").is_file());
        assert!(project.root().join("include/app.h").is_file());

        let resolved = project.resolve("release");
        assert_eq!(resolved.name(), "app");
    }

    #[test]
    fn test_fixture_with_config_merges() {
        let fixture = ProjectFixture::new("app").with_config(json!({"project": {"type": "dll"}}));
        let config = fixture.config.unwrap();
        assert_eq!(config["project"]["name"], "app");
        assert_eq!(config["project"]["type"], "dll");
    }

    #[test]
    fn test_fixture_without_config() {
        let tmp = TempDir::new().unwrap();
        let project = ProjectFixture::new("bare")
            .without_config()
            .write_to(tmp.path())
            .unwrap();
        assert!(!project.config_path().exists());
        assert_eq!(project.resolve("debug").name(), "bare");
    }

    #[test]
    fn test_compiler_output_samples() {
        assert!(compiler_outputs::compile_success().success());
        let out = compiler_outputs::link_unresolved("foo").classify();
        assert_eq!(out.errors.len(), 2);
        assert_eq!(compiler_outputs::compile_with_warnings(&["a.cpp(1): warning C4100: x"]).classify().warnings.len(), 1);
        assert_eq!(compiler_outputs::compile_error("a.cpp", 3, "x").classify().errors.len(), 1);
    }
}
