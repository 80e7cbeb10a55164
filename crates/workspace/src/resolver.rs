//! Expansion of workspace patterns into package directories

use crate::fs::FsProbe;
use crate::glob::GlobPattern;
use monorun_core::constants::MANIFEST_FILENAME;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Expand workspace patterns relative to `root` into the set of directories
/// holding a manifest that is valid JSON. Whether it describes a usable
/// package is decided when the catalog is loaded.
///
/// Patterns starting with `!` remove their matches from the union of the
/// positive patterns.
pub fn resolve_workspaces(
    fs: &dyn FsProbe,
    root: &Path,
    patterns: &[String],
) -> BTreeSet<PathBuf> {
    let mut included = BTreeSet::new();
    let mut excluded = BTreeSet::new();

    for pattern in patterns {
        let (negated, body) = match pattern.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, pattern.as_str()),
        };

        let segments = split_segments(body);
        let mut matches = BTreeSet::new();
        walk(fs, root, &segments, &mut matches);
        tracing::debug!(pattern = %pattern, matches = matches.len(), "Expanded workspace pattern");

        if negated {
            excluded.extend(matches);
        } else {
            included.extend(matches);
        }
    }

    included.retain(|dir| !excluded.contains(dir));
    included
}

fn split_segments(pattern: &str) -> Vec<&str> {
    pattern
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect()
}

fn walk(fs: &dyn FsProbe, dir: &Path, segments: &[&str], out: &mut BTreeSet<PathBuf>) {
    let Some((segment, rest)) = segments.split_first() else {
        if has_manifest(fs, dir) {
            out.insert(dir.to_path_buf());
        }
        return;
    };

    match *segment {
        "**" => {
            for descendant in fs.descendant_directories(dir) {
                walk(fs, &descendant, rest, out);
            }
        }
        "*" => {
            for child in child_directories(fs, dir) {
                walk(fs, &child, rest, out);
            }
        }
        segment if GlobPattern::has_wildcards(segment) => match GlobPattern::new(segment) {
            Ok(glob) => {
                for child in child_directories(fs, dir) {
                    let matched = child
                        .file_name()
                        .map(|name| glob.is_match(&name.to_string_lossy()))
                        .unwrap_or(false);
                    if matched {
                        walk(fs, &child, rest, out);
                    }
                }
            }
            Err(e) => tracing::warn!(segment, error = %e, "Ignoring unusable workspace segment"),
        },
        literal => {
            let child = dir.join(literal);
            if fs.is_directory(&child) {
                walk(fs, &child, rest, out);
            }
        }
    }
}

fn child_directories(fs: &dyn FsProbe, dir: &Path) -> Vec<PathBuf> {
    let mut children: Vec<PathBuf> = fs
        .list_entries(dir)
        .into_iter()
        .map(|name| dir.join(name))
        .filter(|child| fs.is_directory(child))
        .collect();
    children.sort();
    children
}

fn has_manifest(fs: &dyn FsProbe, dir: &Path) -> bool {
    if !fs.is_directory(dir) {
        return false;
    }
    let manifest_path = dir.join(MANIFEST_FILENAME);
    match fs.read_to_string(&manifest_path) {
        Ok(content) => serde_json::from_str::<serde_json::Value>(&content).is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{LocalFs, MemoryFs};
    use std::fs;
    use tempfile::TempDir;

    fn patterns(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn sample_fs() -> MemoryFs {
        MemoryFs::new()
            .with_file("/ws/package.json", r#"{"name": "root", "workspaces": []}"#)
            .with_file("/ws/packages/core/package.json", r#"{"name": "core"}"#)
            .with_file("/ws/packages/plugin-x/package.json", r#"{"name": "plugin-x"}"#)
            .with_file("/ws/packages/broken/package.json", "{ not json")
            .with_dir("/ws/packages/empty")
            .with_file("/ws/apps/web/package.json", r#"{"name": "web"}"#)
            .with_file("/ws/apps/nested/deep/api/package.json", r#"{"name": "api"}"#)
            .with_file("/ws/apps/node_modules/dep/package.json", r#"{"name": "dep"}"#)
            .with_file("/ws/packages/core/README.md", "readme")
    }

    #[test]
    fn test_single_star_matches_immediate_children() {
        let found = resolve_workspaces(&sample_fs(), Path::new("/ws"), &patterns(&["packages/*"]));
        assert_eq!(
            found.into_iter().collect::<Vec<_>>(),
            vec![
                PathBuf::from("/ws/packages/core"),
                PathBuf::from("/ws/packages/plugin-x")
            ]
        );
    }

    #[test]
    fn test_globstar_matches_any_depth_including_current() {
        let found = resolve_workspaces(&sample_fs(), Path::new("/ws"), &patterns(&["apps/**"]));
        assert_eq!(
            found.into_iter().collect::<Vec<_>>(),
            vec![
                PathBuf::from("/ws/apps/nested/deep/api"),
                PathBuf::from("/ws/apps/web")
            ]
        );

        let fs = MemoryFs::new().with_file("/ws/tool/package.json", r#"{"name": "tool"}"#);
        let found = resolve_workspaces(&fs, Path::new("/ws"), &patterns(&["tool/**"]));
        assert!(found.contains(Path::new("/ws/tool")));
    }

    #[test]
    fn test_globstar_then_literal() {
        let found = resolve_workspaces(&sample_fs(), Path::new("/ws"), &patterns(&["**/api"]));
        assert_eq!(
            found.into_iter().collect::<Vec<_>>(),
            vec![PathBuf::from("/ws/apps/nested/deep/api")]
        );
    }

    #[test]
    fn test_literal_paths_and_missing_directories() {
        let found = resolve_workspaces(
            &sample_fs(),
            Path::new("/ws"),
            &patterns(&["./apps/web", "does/not/exist", "packages/empty"]),
        );
        assert_eq!(
            found.into_iter().collect::<Vec<_>>(),
            vec![PathBuf::from("/ws/apps/web")]
        );
    }

    #[test]
    fn test_overlapping_patterns_deduplicate() {
        let found = resolve_workspaces(
            &sample_fs(),
            Path::new("/ws"),
            &patterns(&["packages/*", "packages/**", "packages/core"]),
        );
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_partial_wildcard_segment_and_negation() {
        let found = resolve_workspaces(
            &sample_fs(),
            Path::new("/ws"),
            &patterns(&["packages/plugin-*"]),
        );
        assert_eq!(
            found.into_iter().collect::<Vec<_>>(),
            vec![PathBuf::from("/ws/packages/plugin-x")]
        );

        let found = resolve_workspaces(
            &sample_fs(),
            Path::new("/ws"),
            &patterns(&["packages/*", "!packages/core"]),
        );
        assert_eq!(
            found.into_iter().collect::<Vec<_>>(),
            vec![PathBuf::from("/ws/packages/plugin-x")]
        );
    }

    #[test]
    fn test_any_json_manifest_counts_regardless_of_field_types() {
        let fs = MemoryFs::new()
            .with_file("/ws/packages/a/package.json", r#"{"name": "a"}"#)
            .with_file("/ws/packages/b/package.json", r#"{"name": "b", "version": 1}"#)
            .with_file(
                "/ws/packages/c/package.json",
                r#"{"name": "c", "scripts": {"postinstall": null}}"#,
            )
            .with_file("/ws/packages/d/package.json", "{ not json");

        let found = resolve_workspaces(&fs, Path::new("/ws"), &patterns(&["packages/*"]));
        assert_eq!(
            found.into_iter().collect::<Vec<_>>(),
            vec![
                PathBuf::from("/ws/packages/a"),
                PathBuf::from("/ws/packages/b"),
                PathBuf::from("/ws/packages/c"),
            ]
        );
    }

    #[test]
    fn test_resolves_on_disk() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        for name in ["a", "b"] {
            fs::create_dir_all(root.join("packages").join(name)).unwrap();
            fs::write(
                root.join("packages").join(name).join("package.json"),
                format!(r#"{{"name": "{name}"}}"#),
            )
            .unwrap();
        }
        fs::create_dir_all(root.join("packages/node_modules/c")).unwrap();
        fs::write(root.join("packages/node_modules/c/package.json"), r#"{"name": "c"}"#).unwrap();
        fs::write(root.join("packages/not-a-dir"), "").unwrap();

        let found = resolve_workspaces(&LocalFs, root, &patterns(&["packages/**"]));
        assert_eq!(
            found.into_iter().collect::<Vec<_>>(),
            vec![root.join("packages/a"), root.join("packages/b")]
        );
    }
}
