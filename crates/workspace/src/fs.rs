//! Filesystem probing used by workspace discovery

use monorun_core::constants::NODE_MODULES_DIR;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Read-only view of the filesystem.
///
/// Listing never fails: an unreadable directory simply has no entries.
pub trait FsProbe: Send + Sync {
    fn is_directory(&self, path: &Path) -> bool;

    /// Names of the entries directly inside `path`
    fn list_entries(&self, path: &Path) -> Vec<String>;

    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// `dir` itself followed by every directory below it that `**` may
    /// descend into.
    fn descendant_directories(&self, dir: &Path) -> Vec<PathBuf> {
        let mut found = Vec::new();
        let mut stack = vec![dir.to_path_buf()];
        while let Some(current) = stack.pop() {
            let mut children: Vec<PathBuf> = self
                .list_entries(&current)
                .into_iter()
                .filter(|name| !is_skipped_under_globstar(name))
                .map(|name| current.join(name))
                .filter(|child| self.is_directory(child))
                .collect();
            children.sort();
            children.reverse();
            found.push(current);
            stack.extend(children);
        }
        found
    }
}

/// `**` never walks into installed dependencies or hidden directories
pub fn is_skipped_under_globstar(name: &str) -> bool {
    name == NODE_MODULES_DIR || name.starts_with('.')
}

/// The real filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl FsProbe for LocalFs {
    fn is_directory(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn list_entries(&self, path: &Path) -> Vec<String> {
        match std::fs::read_dir(path) {
            Ok(entries) => entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .collect(),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Cannot list directory");
                Vec::new()
            }
        }
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn descendant_directories(&self, dir: &Path) -> Vec<PathBuf> {
        WalkDir::new(dir)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !is_skipped_under_globstar(&entry.file_name().to_string_lossy())
            })
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_dir())
            .map(|entry| entry.into_path())
            .collect()
    }
}

/// In-memory filesystem for tests and dry runs.
///
/// Directories are implied by the files placed under them.
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    files: HashMap<PathBuf, String>,
    dirs: std::collections::BTreeSet<PathBuf>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        let path = path.into();
        let mut parent = path.parent();
        while let Some(dir) = parent {
            self.dirs.insert(dir.to_path_buf());
            parent = dir.parent();
        }
        self.files.insert(path, content.into());
        self
    }

    pub fn with_dir(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut current = Some(path.as_path());
        while let Some(dir) = current {
            self.dirs.insert(dir.to_path_buf());
            current = dir.parent();
        }
        self
    }
}

impl FsProbe for MemoryFs {
    fn is_directory(&self, path: &Path) -> bool {
        self.dirs.contains(path)
    }

    fn list_entries(&self, path: &Path) -> Vec<String> {
        self.dirs
            .iter()
            .chain(self.files.keys())
            .filter(|p| p.parent() == Some(path))
            .filter_map(|p| p.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect()
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }
}
