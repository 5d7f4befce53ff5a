//! Launching the companion configuration editor.
//!
//! The editor is a separate program that receives only the path of the
//! configuration file. It is started detached; vcbuild does not wait for it.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::util::process::{find_executable, ProcessBuilder};

/// Base name of the editor executable.
pub const GUI_PROGRAM: &str = "vcbuild_gui";

fn gui_file_name() -> String {
    format!("{}{}", GUI_PROGRAM, std::env::consts::EXE_SUFFIX)
}

/// Locate the editor: next to `exe_dir` first, then on `PATH`.
pub fn find_gui(exe_dir: Option<&Path>) -> Option<PathBuf> {
    let file_name = gui_file_name();
    exe_dir
        .map(|dir| dir.join(&file_name))
        .filter(|path| path.is_file())
        .or_else(|| find_executable(GUI_PROGRAM))
}

/// Directory of the running executable.
pub fn current_exe_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
}

/// Start the editor for `config_path` without waiting for it.
pub fn launch_gui(config_path: &Path) -> Result<PathBuf> {
    let Some(gui) = find_gui(current_exe_dir().as_deref()) else {
        bail!(
            "configuration editor `{}` not found next to vcbuild or on PATH",
            gui_file_name()
        );
    };

    tracing::debug!("launching {} for {}", gui.display(), config_path.display());
    ProcessBuilder::new(&gui).arg(config_path).spawn_detached()?;
    Ok(gui)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_prefers_executable_dir() {
        let tmp = TempDir::new().unwrap();
        let gui = tmp.path().join(gui_file_name());
        std::fs::write(&gui, "").unwrap();

        assert_eq!(find_gui(Some(tmp.path())), Some(gui));
    }

    #[test]
    fn test_missing_next_to_exe_falls_back_to_path() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(
            find_gui(Some(tmp.path())),
            find_executable(GUI_PROGRAM)
        );
    }
}
