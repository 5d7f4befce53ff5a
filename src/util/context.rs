//! Global context for vcbuild operations.
//!
//! Provides centralized access to the project root and the well-known files
//! that live in it.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Name of the project configuration file.
pub const CONFIG_FILENAME: &str = "vcbuild.json";

/// Name of the build cache file, stored in the project root.
pub const CACHE_FILENAME: &str = ".vcbuild_cache.json";

/// Locate the project root for `start`.
///
/// Walks upward to the first directory that contains `vcbuild.json` or a
/// `src/` directory. Returns `None` when no ancestor qualifies.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let start = start.canonicalize().unwrap_or_else(|_| start.to_path_buf());

    start
        .ancestors()
        .find(|dir| dir.join(CONFIG_FILENAME).is_file() || dir.join("src").is_dir())
        .map(Path::to_path_buf)
}

/// Paths shared by every command.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    project_root: PathBuf,
}

impl GlobalContext {
    /// Create a context rooted at the current working directory.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(Self::with_cwd(cwd))
    }

    /// Create a context for an explicit working directory.
    ///
    /// Falls back to `cwd` itself when no project root is found above it.
    pub fn with_cwd(cwd: PathBuf) -> Self {
        let project_root = find_project_root(&cwd).unwrap_or(cwd);
        GlobalContext { project_root }
    }

    /// The resolved project root.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Path to `vcbuild.json` (may not exist).
    pub fn config_path(&self) -> PathBuf {
        self.project_root.join(CONFIG_FILENAME)
    }

    /// Path to the build cache file (may not exist).
    pub fn cache_path(&self) -> PathBuf {
        self.project_root.join(CACHE_FILENAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_finds_config_in_ancestor() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("proj");
        let nested = root.join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(root.join(CONFIG_FILENAME), "{}").unwrap();

        let found = find_project_root(&nested).unwrap();
        assert_eq!(found, root.canonicalize().unwrap());
    }

    #[test]
    fn test_src_dir_marks_root() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("src")).unwrap();

        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf());
        assert_eq!(ctx.project_root(), tmp.path().canonicalize().unwrap());
        assert!(ctx.config_path().ends_with(CONFIG_FILENAME));
        assert!(ctx.cache_path().ends_with(CACHE_FILENAME));
    }
}
