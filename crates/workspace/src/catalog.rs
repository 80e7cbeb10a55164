//! Loading of package records from resolved workspace directories

use crate::filter;
use crate::fs::FsProbe;
use crate::resolver::resolve_workspaces;
use monorun_config::{workspace_patterns, Manifest, SelectionCriteria};
use monorun_core::{constants::MANIFEST_FILENAME, Error, PackageRecord, Result, ResultExt};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

/// Read and parse the manifest in `directory`
pub fn read_manifest(fs: &dyn FsProbe, directory: &Path) -> Result<Manifest> {
    let path = directory.join(MANIFEST_FILENAME);
    let content = fs
        .read_to_string(&path)
        .map_err(|e| Error::file_system(&path, "read", e))?;
    Manifest::from_json(&content).map_err(|e| Error::manifest(&path, e.to_string()))
}

/// Load one record per directory.
///
/// Directories whose manifest is unusable are dropped with a warning, as is
/// the second of two packages sharing a name.
pub fn load_catalog(fs: &dyn FsProbe, directories: &BTreeSet<PathBuf>) -> Vec<PackageRecord> {
    let mut records = Vec::with_capacity(directories.len());
    let mut seen: HashMap<String, PathBuf> = HashMap::new();

    for directory in directories {
        let manifest_path = directory.join(MANIFEST_FILENAME);
        let record = match read_manifest(fs, directory)
            .and_then(|manifest| manifest.into_record(directory, &manifest_path))
        {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(directory = %directory.display(), error = %e, "Skipping package");
                continue;
            }
        };

        if let Some(first) = seen.get(&record.name) {
            tracing::warn!(
                package = %record.name,
                kept = %first.display(),
                skipped = %directory.display(),
                "Duplicate package name; keeping the first"
            );
            continue;
        }

        seen.insert(record.name.clone(), directory.clone());
        records.push(record);
    }

    records
}

/// A discovered workspace: its root, patterns and loaded packages
#[derive(Debug, Clone)]
pub struct Workspace {
    pub root: PathBuf,
    pub patterns: Vec<String>,
    pub packages: Vec<PackageRecord>,
}

impl Workspace {
    /// Read the root manifest under `root` and load every member package
    pub fn discover(fs: &dyn FsProbe, root: &Path) -> Result<Self> {
        let root_manifest = root.join(MANIFEST_FILENAME);
        let content = fs
            .read_to_string(&root_manifest)
            .map_err(|e| Error::file_system(&root_manifest, "read", e))
            .context("cannot read root manifest")?;
        let patterns = workspace_patterns(&content, &root_manifest)?;

        let directories = resolve_workspaces(fs, root, &patterns);
        if directories.is_empty() {
            return Err(Error::discovery(format!(
                "no workspace packages found for patterns {patterns:?} under '{}'",
                root.display()
            )));
        }

        let packages = load_catalog(fs, &directories);
        if packages.is_empty() {
            return Err(Error::discovery(format!(
                "none of the {} workspace directories has a usable manifest",
                directories.len()
            )));
        }

        tracing::info!(
            root = %root.display(),
            packages = packages.len(),
            "Discovered workspace"
        );

        Ok(Self {
            root: root.to_path_buf(),
            patterns,
            packages,
        })
    }

    /// Packages selected by `criteria`; see [`filter::select`]
    pub fn select(&self, criteria: &SelectionCriteria) -> Result<Vec<PackageRecord>> {
        filter::select(self.packages.clone(), criteria, &self.root)
    }
}
