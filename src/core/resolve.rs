//! Configuration resolution.
//!
//! Layers, lowest precedence first:
//!
//! 1. built-in defaults ([`schema::defaults`])
//! 2. the project's `vcbuild.json`, if present
//! 3. the active profile's block from the merged `profiles` section
//! 4. command-line overrides
//!
//! The merged tree is validated once, defaulted, and finally deserialized into
//! typed sections with every `"auto"` field resolved.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::core::error::{ConfigError, Violation};
use crate::core::manifest::{
    target_os_versions, DebugInfo, OptLevel, ProjectConfig, DEFAULT_TARGET_OS,
};
use crate::core::merge::{get_path, merge_into, set_path};
use crate::core::profile::{self, resolve_auto, AutoOr, ProfileKind};
use crate::core::schema;
use crate::util::fs::lexical_normalize;
use crate::util::hash::Fingerprint;

/// Overrides supplied on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    /// Appended to `compiler.defines`.
    pub defines: Vec<String>,
    pub architecture: Option<String>,
    pub standard: Option<String>,
    pub output_name: Option<String>,
}

impl CliOverrides {
    pub fn is_empty(&self) -> bool {
        self.defines.is_empty()
            && self.architecture.is_none()
            && self.standard.is_none()
            && self.output_name.is_none()
    }

    /// Apply the overrides as the final merge layer.
    ///
    /// Defines accumulate; every other override replaces.
    fn apply(&self, config: &mut Value) {
        if !self.defines.is_empty() {
            let mut defines: Vec<Value> = get_path(config, "compiler.defines")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            defines.extend(self.defines.iter().cloned().map(Value::String));
            set_path(config, "compiler.defines", Value::Array(defines));
        }
        if let Some(arch) = &self.architecture {
            set_path(config, "project.architecture", Value::String(arch.clone()));
        }
        if let Some(standard) = &self.standard {
            set_path(config, "compiler.standard", Value::String(standard.clone()));
        }
        if let Some(output) = &self.output_name {
            set_path(config, "project.output_name", Value::String(output.clone()));
        }
    }
}

/// Code generation settings with `"auto"` already resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codegen {
    pub optimization: OptLevel,
    pub debug_info: DebugInfo,
    pub lto: bool,
    pub strip_unreferenced: bool,
    /// Link the debug CRT (/MDd, /MTd). Only the `debug` profile does.
    pub debug_runtime: bool,
}

/// A fully resolved, validated project configuration.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    root: PathBuf,
    config_path: PathBuf,
    profile: String,
    profile_kind: ProfileKind,
    tree: Value,
    config: ProjectConfig,
    codegen: Codegen,
    name: String,
    output_name: String,
}

impl ResolvedConfig {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn profile_kind(&self) -> ProfileKind {
        self.profile_kind
    }

    /// The merged JSON tree, with defaults filled in and `"auto"` resolved.
    pub fn tree(&self) -> &Value {
        &self.tree
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn codegen(&self) -> Codegen {
        self.codegen
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    /// Whether this is a kernel driver build.
    pub fn is_driver(&self) -> bool {
        self.config.driver.enabled
    }

    /// Absolute build output directory.
    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.config.project.output_dir)
    }

    /// Directory object files are written to.
    pub fn obj_dir(&self) -> PathBuf {
        self.output_dir().join("obj")
    }

    /// Final artifact path.
    pub fn output_path(&self) -> PathBuf {
        self.output_dir().join(&self.output_name)
    }

    /// Fingerprint of the profile and the resolved tree.
    pub fn fingerprint(&self) -> String {
        let mut fp = Fingerprint::new();
        fp.update_str(&self.profile).update_str(&self.tree.to_string());
        fp.finish_short()
    }

    /// Pretty-printed JSON of the resolved tree.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.tree).unwrap_or_else(|_| self.tree.to_string())
    }
}

/// Read the user's configuration file.
///
/// A missing file is not an error and yields `None`.
pub fn read_user_config(path: &Path) -> Result<Option<Value>, ConfigError> {
    if !path.exists() {
        debug!("no {} found, using defaults", path.display());
        return Ok(None);
    }
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    if !value.is_object() {
        return Err(ConfigError::Parse {
            path: path.to_path_buf(),
            message: "top-level value must be a JSON object".to_string(),
        });
    }
    Ok(Some(value))
}

/// Load `vcbuild.json` from `root` and resolve it for `profile`.
pub fn load(
    root: &Path,
    config_path: &Path,
    profile: &str,
    overrides: &CliOverrides,
) -> Result<ResolvedConfig, ConfigError> {
    let user = read_user_config(config_path)?;
    resolve(root, config_path, user.as_ref(), profile, overrides)
}

/// Resolve an already-parsed user configuration.
pub fn resolve(
    root: &Path,
    config_path: &Path,
    user: Option<&Value>,
    profile: &str,
    overrides: &CliOverrides,
) -> Result<ResolvedConfig, ConfigError> {
    let mut tree = schema::defaults();

    if let Some(user) = user {
        merge_into(&mut tree, user);
        debug!("merged {}", config_path.display());
    }

    match profile::profile_overlay(&tree, profile).cloned() {
        Some(overlay) => {
            merge_into(&mut tree, &overlay);
            debug!("applied profile `{}`", profile);
        }
        None => {
            warn!(
                "profile `{}` is not defined (available: {}), only auto defaults apply",
                profile,
                profile::profile_names(&tree).join(", ")
            );
        }
    }

    if !overrides.is_empty() {
        overrides.apply(&mut tree);
        debug!("applied command-line overrides");
    }

    let invalid = |violations: Vec<Violation>| ConfigError::Invalid {
        path: config_path.to_path_buf(),
        violations,
    };

    let mut violations = schema::validate(&tree);
    if let Some(dir) = get_path(&tree, "project.output_dir").and_then(Value::as_str) {
        if lexical_normalize(&root.join(dir)) == lexical_normalize(root) {
            violations.push(Violation::new(
                "project.output_dir",
                "must name a directory inside the project, not the project root",
            ));
        }
    }
    if !violations.is_empty() {
        return Err(invalid(violations));
    }

    let name = get_path(&tree, "project.name")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| directory_name(root));
    set_path(&mut tree, "project.name", Value::String(name.clone()));

    let mut config: ProjectConfig = serde_json::from_value(tree.clone())
        .map_err(|e| invalid(vec![Violation::new("(config)", e.to_string())]))?;

    let output_name = config
        .project
        .output_name
        .clone()
        .unwrap_or_else(|| format!("{}{}", name, config.project.kind.extension()));
    set_path(
        &mut tree,
        "project.output_name",
        Value::String(output_name.clone()),
    );
    config.project.name = Some(name.clone());
    config.project.output_name = Some(output_name.clone());

    if config.driver.enabled && target_os_versions(&config.driver.target_os).is_none() {
        warn!(
            "unknown driver.target_os `{}`, using {}",
            config.driver.target_os, DEFAULT_TARGET_OS
        );
        config.driver.target_os = DEFAULT_TARGET_OS.to_string();
        set_path(
            &mut tree,
            "driver.target_os",
            Value::String(DEFAULT_TARGET_OS.to_string()),
        );
    }

    let profile_kind = ProfileKind::from_name(profile);
    let optimization = resolve_auto(config.compiler.optimization, profile_kind);
    let debug_info = resolve_auto(config.compiler.debug_info, profile_kind);
    let lto = resolve_auto(config.linker.lto, profile_kind);
    let strip = resolve_auto(config.linker.strip_unreferenced, profile_kind);

    config.compiler.optimization = AutoOr::Value(optimization);
    config.compiler.debug_info = AutoOr::Value(debug_info);
    config.linker.lto = AutoOr::Value(lto);
    config.linker.strip_unreferenced = AutoOr::Value(strip);
    write_resolved(&mut tree, &config);

    let codegen = Codegen {
        optimization,
        debug_info,
        lto: lto.is_on(),
        strip_unreferenced: strip.is_on(),
        debug_runtime: profile == profile::DEBUG_PROFILE,
    };

    Ok(ResolvedConfig {
        root: root.to_path_buf(),
        config_path: config_path.to_path_buf(),
        profile: profile.to_string(),
        profile_kind,
        tree,
        config,
        codegen,
        name,
        output_name,
    })
}

/// Write the concrete values of former `"auto"` fields back into the tree.
fn write_resolved(tree: &mut Value, config: &ProjectConfig) {
    let fields = [
        ("compiler.optimization", serde_json::to_value(config.compiler.optimization)),
        ("compiler.debug_info", serde_json::to_value(config.compiler.debug_info)),
        ("linker.lto", serde_json::to_value(config.linker.lto)),
        (
            "linker.strip_unreferenced",
            serde_json::to_value(config.linker.strip_unreferenced),
        ),
    ];
    for (path, value) in fields {
        if let Ok(value) = value {
            set_path(tree, path, value);
        }
    }
}

fn directory_name(root: &Path) -> String {
    root.canonicalize()
        .ok()
        .as_deref()
        .unwrap_or(root)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string())
}
