//! Source set discovery.
//!
//! Turns the `sources` section into the concrete list of translation units
//! and include directories for one build.

use std::path::{Component, Path, PathBuf};

use glob::Pattern;
use walkdir::WalkDir;

use crate::core::manifest::SourcesSection;

/// Files and include directories for one build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSet {
    /// Translation units, sorted when discovered, caller order when explicit.
    pub sources: Vec<PathBuf>,
    /// Include directories that exist on disk.
    pub include_dirs: Vec<PathBuf>,
}

impl SourceSet {
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }
}

/// Join `path` onto `base` unless it is absolute, dropping `.` components.
pub fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    base.join(path)
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Directories that were scanned for sources, for error reporting.
pub fn searched_dirs(root: &Path, sources: &SourcesSection) -> Vec<PathBuf> {
    let base = resolve_path(root, &sources.root);
    sources
        .source_dirs
        .iter()
        .chain(&sources.external_dirs)
        .map(|dir| resolve_path(&base, dir))
        .collect()
}

/// Discover sources and include directories under `root`.
///
/// An explicit source list is used verbatim and skips extension and exclude
/// filtering. Otherwise every source directory (plus external directories)
/// is walked recursively.
pub fn discover(root: &Path, sources: &SourcesSection) -> SourceSet {
    let base = resolve_path(root, &sources.root);

    let include_dirs: Vec<PathBuf> = sources
        .include_dirs
        .iter()
        .chain(&sources.external_dirs)
        .map(|dir| resolve_path(&base, dir))
        .filter(|dir| dir.is_dir())
        .collect();

    if !sources.explicit_sources.is_empty() {
        tracing::debug!(
            "using {} explicit source(s)",
            sources.explicit_sources.len()
        );
        let files = sources
            .explicit_sources
            .iter()
            .map(|s| resolve_path(&base, s))
            .collect();
        return SourceSet {
            sources: files,
            include_dirs,
        };
    }

    let extensions: Vec<String> = sources
        .extensions
        .iter()
        .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
        .collect();
    let excludes = compile_patterns(&sources.exclude_patterns);

    let mut files = Vec::new();
    for dir in searched_dirs(root, sources) {
        if !dir.is_dir() {
            tracing::debug!("source directory {} does not exist", dir.display());
            continue;
        }
        for entry in WalkDir::new(&dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            if has_extension(path, &extensions) && !is_excluded(path, &excludes) {
                files.push(path.to_path_buf());
            }
        }
    }

    files.sort();
    files.dedup();

    SourceSet {
        sources: files,
        include_dirs,
    }
}

fn compile_patterns(patterns: &[String]) -> Vec<Pattern> {
    patterns
        .iter()
        .filter_map(|p| match Pattern::new(p) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                tracing::warn!("ignoring invalid exclude pattern `{}`: {}", p, e);
                None
            }
        })
        .collect()
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
}

/// A pattern may target either the bare file name or the full path.
fn is_excluded(path: &Path, patterns: &[Pattern]) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    patterns
        .iter()
        .any(|p| p.matches(name) || p.matches_path(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::defaults;
    use serde_json::json;
    use tempfile::TempDir;

    fn section(overlay: serde_json::Value) -> SourcesSection {
        let merged = crate::core::merge::deep_merge(defaults()["sources"].clone(), &overlay);
        serde_json::from_value(merged).unwrap()
    }

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "").unwrap();
    }

    #[test]
    fn test_discover_with_exclude() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "src/a.cpp");
        touch(tmp.path(), "src/b_test.cpp");
        touch(tmp.path(), "src/sub/c.cpp");
        touch(tmp.path(), "src/readme.txt");

        let sources = section(json!({
            "source_dirs": ["src"],
            "extensions": [".cpp"],
            "exclude_patterns": ["*_test.cpp"]
        }));
        let set = discover(tmp.path(), &sources);
        assert_eq!(
            set.sources,
            vec![tmp.path().join("src/a.cpp"), tmp.path().join("src/sub/c.cpp")]
        );
    }

    #[test]
    fn test_explicit_sources_bypass_filters() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "src/z.cpp");

        let sources = section(json!({
            "explicit_sources": ["src/z.cpp", "gen/a_test.cpp"],
            "exclude_patterns": ["*_test.cpp"]
        }));
        let set = discover(tmp.path(), &sources);
        assert_eq!(
            set.sources,
            vec![tmp.path().join("src/z.cpp"), tmp.path().join("gen/a_test.cpp")]
        );
    }

    #[test]
    fn test_exclude_matches_full_path() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "src/gen/x.cpp");
        touch(tmp.path(), "src/y.cpp");

        let sources = section(json!({"exclude_patterns": ["*/gen/*"]}));
        let set = discover(tmp.path(), &sources);
        assert_eq!(set.sources, vec![tmp.path().join("src/y.cpp")]);
    }

    #[test]
    fn test_extension_match_ignores_case() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "src/Legacy.CPP");
        touch(tmp.path(), "src/util.c");

        let set = discover(tmp.path(), &section(json!({})));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_include_dirs_filtered_to_existing() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "src/main.cpp");
        touch(tmp.path(), "third_party/lib/x.c");

        let sources = section(json!({"external_dirs": ["third_party"]}));
        let set = discover(tmp.path(), &sources);
        assert_eq!(
            set.include_dirs,
            vec![tmp.path().join("src"), tmp.path().join("third_party")]
        );
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_invalid_pattern_is_skipped() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "src/main.cpp");

        let sources = section(json!({"exclude_patterns": ["[unclosed"]}));
        assert_eq!(discover(tmp.path(), &sources).len(), 1);
    }

    #[test]
    fn test_empty_is_not_an_error() {
        let tmp = TempDir::new().unwrap();
        let set = discover(tmp.path(), &section(json!({})));
        assert!(set.is_empty());
        assert_eq!(searched_dirs(tmp.path(), &section(json!({}))), vec![tmp.path().join("src")]);
    }

    #[test]
    fn test_resolve_path_drops_cur_dir() {
        assert_eq!(
            resolve_path(Path::new("/proj"), Path::new("./src")),
            PathBuf::from("/proj/src")
        );
        assert_eq!(
            resolve_path(Path::new("/proj"), Path::new("/abs/dir")),
            PathBuf::from("/abs/dir")
        );
    }
}
