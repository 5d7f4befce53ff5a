//! Implementation of `vcbuild init`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};

use crate::util::context::CONFIG_FILENAME;
use crate::util::fs::{normalize_path, write_string};

/// The starter configuration written by `init`.
///
/// Only the commonly edited fields are spelled out; everything else comes
/// from the built-in defaults.
pub fn config_template(name: &str) -> Value {
    json!({
        "project": {
            "name": name,
            "type": "exe",
            "architecture": "x64"
        },
        "compiler": {
            "standard": "c++20",
            "defines": []
        },
        "linker": {
            "libraries": [],
            "subsystem": "console"
        },
        "sources": {
            "include_dirs": ["src", "include"],
            "source_dirs": ["src"]
        }
    })
}

/// Write a `vcbuild.json` template into `root`.
///
/// The project is named after the directory. Fails if the file exists.
pub fn init_project(root: &Path) -> Result<PathBuf> {
    let dest = root.join(CONFIG_FILENAME);
    if dest.exists() {
        bail!("`{}` already exists in `{}`", CONFIG_FILENAME, root.display());
    }

    let name = normalize_path(root)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("app")
        .to_string();

    let content = serde_json::to_string_pretty(&config_template(&name))
        .context("failed to serialize configuration template")?;
    write_string(&dest, &(content + "\n"))?;

    tracing::debug!("wrote template for `{}` to {}", name, dest.display());
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::resolve::{load, CliOverrides};
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_resolvable_template() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("hello");
        std::fs::create_dir_all(&root).unwrap();

        let dest = init_project(&root).unwrap();
        assert_eq!(dest, root.join(CONFIG_FILENAME));

        let resolved = load(&root, &dest, "release", &CliOverrides::default()).unwrap();
        assert_eq!(resolved.name(), "hello");
        assert_eq!(resolved.output_name(), "hello.exe");
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILENAME), "{\"keep\": true}").unwrap();

        let err = init_project(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        let content = std::fs::read_to_string(tmp.path().join(CONFIG_FILENAME)).unwrap();
        assert_eq!(content, "{\"keep\": true}");
    }

    #[test]
    fn test_template_shape() {
        let template = config_template("demo");
        assert_eq!(template["project"]["name"], "demo");
        assert_eq!(template["sources"]["source_dirs"], json!(["src"]));
        assert!(template.get("profiles").is_none());
    }
}
