//! Configuration schema: defaults and validation rules.
//!
//! Validation runs once over the fully merged tree. Fields that are missing,
//! or keys the schema does not know, are skipped. Fields that are present
//! must hold one of their allowed values. Every problem is collected so the
//! user sees all of them in one pass.

use serde_json::{json, Value};

use crate::core::error::Violation;
use crate::core::merge::get_path;

/// Project type that marks a kernel driver artifact.
pub const DRIVER_PROJECT_TYPE: &str = "sys";

/// Fields restricted to a closed set of literal values.
pub const VALID_VALUES: &[(&str, &[&str])] = &[
    ("project.type", &["exe", "dll", "lib", "sys"]),
    ("project.architecture", &["x86", "x64", "arm64"]),
    (
        "compiler.standard",
        &["c11", "c17", "c++14", "c++17", "c++20", "c++23", "c++latest"],
    ),
    ("compiler.runtime", &["dynamic", "static"]),
    (
        "compiler.optimization",
        &["auto", "none", "size", "speed", "full"],
    ),
    ("compiler.debug_info", &["auto", "none", "minimal", "full"]),
    ("compiler.floating_point", &["precise", "fast", "strict"]),
    (
        "compiler.calling_convention",
        &["cdecl", "stdcall", "fastcall", "vectorcall"],
    ),
    ("compiler.character_set", &["unicode", "mbcs", "none"]),
    (
        "linker.subsystem",
        &[
            "console",
            "windows",
            "native",
            "efi_application",
            "boot_application",
            "posix",
        ],
    ),
    ("linker.lto", &["auto", "off", "on"]),
    ("linker.strip_unreferenced", &["auto", "off", "on"]),
    ("driver.type", &["wdm", "kmdf"]),
];

/// An inclusive integer range rule for a numeric field.
#[derive(Debug, Clone, Copy)]
pub struct IntegerRule {
    pub field: &'static str,
    pub min: u64,
    pub max: u64,
    pub nullable: bool,
}

/// Fields that must be integers within a range.
pub const INTEGER_RULES: &[IntegerRule] = &[
    IntegerRule {
        field: "compiler.warnings.level",
        min: 0,
        max: 4,
        nullable: false,
    },
    IntegerRule {
        field: "linker.stack_size",
        min: 1,
        max: u32::MAX as u64,
        nullable: true,
    },
    IntegerRule {
        field: "linker.heap_size",
        min: 1,
        max: u32::MAX as u64,
        nullable: true,
    },
];

/// The built-in defaults every configuration is merged on top of.
pub fn defaults() -> Value {
    json!({
        "project": {
            "name": null,
            "type": "exe",
            "output_dir": "build",
            "output_name": null,
            "architecture": "x64"
        },
        "compiler": {
            "standard": "c++20",
            "runtime": "dynamic",
            "optimization": "auto",
            "warnings": {
                "level": 4,
                "as_errors": false,
                "disabled": []
            },
            "defines": [],
            "conformance": {
                "permissive": false,
                "cplusplus_macro": true
            },
            "security": {
                "buffer_checks": true,
                "control_flow_guard": false
            },
            "debug_info": "auto",
            "parallel": true,
            "exceptions": true,
            "rtti": true,
            "floating_point": "precise",
            "calling_convention": "cdecl",
            "character_set": "unicode",
            "additional_flags": []
        },
        "linker": {
            "libraries": [],
            "library_paths": [],
            "subsystem": "console",
            "entry_point": null,
            "def_file": null,
            "stack_size": null,
            "heap_size": null,
            "generate_map": false,
            "security": {
                "aslr": true,
                "dep": true,
                "cfg": false
            },
            "lto": "auto",
            "strip_unreferenced": "auto",
            "additional_flags": []
        },
        "sources": {
            "root": ".",
            "include_dirs": ["src", "include"],
            "source_dirs": ["src"],
            "extensions": [".cpp", ".cc", ".c", ".cxx"],
            "exclude_patterns": [],
            "explicit_sources": [],
            "external_dirs": []
        },
        "profiles": {
            "debug": {
                "compiler": {
                    "optimization": "none",
                    "defines": ["_DEBUG"],
                    "debug_info": "full"
                },
                "linker": {
                    "lto": "off"
                }
            },
            "release": {
                "compiler": {
                    "optimization": "full",
                    "defines": ["NDEBUG"],
                    "debug_info": "minimal"
                },
                "linker": {
                    "lto": "on",
                    "strip_unreferenced": "on"
                }
            }
        },
        "pch": {
            "enabled": false,
            "header": null,
            "source": null
        },
        "resources": {
            "enabled": false,
            "files": []
        },
        "driver": {
            "enabled": false,
            "type": "wdm",
            "entry_point": "DriverEntry",
            "target_os": "win10",
            "minifilter": false,
            "integrity_check": true,
            "kmdf_version": "1.15"
        }
    })
}

/// Validate a fully merged configuration tree.
///
/// Returns every violation found, in table order.
pub fn validate(config: &Value) -> Vec<Violation> {
    let mut violations = Vec::new();

    for (field, valid) in VALID_VALUES {
        let Some(value) = get_path(config, field) else {
            continue;
        };
        let ok = value.as_str().is_some_and(|s| valid.contains(&s));
        if !ok {
            violations.push(Violation::new(
                *field,
                format!(
                    "invalid value {}, expected one of [{}]",
                    value,
                    valid.join(", ")
                ),
            ));
        }
    }

    for rule in INTEGER_RULES {
        let Some(value) = get_path(config, rule.field) else {
            continue;
        };
        if value.is_null() && rule.nullable {
            continue;
        }
        let in_range = value
            .as_u64()
            .is_some_and(|n| (rule.min..=rule.max).contains(&n));
        if !in_range {
            violations.push(Violation::new(
                rule.field,
                format!(
                    "must be an integer in {}..={}, found {}",
                    rule.min, rule.max, value
                ),
            ));
        }
    }

    let driver_enabled = get_path(config, "driver.enabled")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if driver_enabled {
        let project_type = get_path(config, "project.type").and_then(Value::as_str);
        if project_type != Some(DRIVER_PROJECT_TYPE) {
            violations.push(Violation::new(
                "project.type",
                format!(
                    "driver builds require project.type = \"{}\", found {}",
                    DRIVER_PROJECT_TYPE,
                    project_type.map_or_else(|| "nothing".to_string(), |t| format!("\"{}\"", t))
                ),
            ));
        }
    }

    violations
}
