//! Domain types shared across the workspace, planning and execution crates.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// Name to version-range mapping as written in a manifest
pub type VersionMap = IndexMap<String, String>;

/// The four dependency categories a manifest can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DependencyKind {
    Dependencies,
    DevDependencies,
    PeerDependencies,
    OptionalDependencies,
}

impl DependencyKind {
    pub const ALL: [DependencyKind; 4] = [
        DependencyKind::Dependencies,
        DependencyKind::DevDependencies,
        DependencyKind::PeerDependencies,
        DependencyKind::OptionalDependencies,
    ];

    /// Manifest field name for this category
    pub fn field_name(self) -> &'static str {
        match self {
            DependencyKind::Dependencies => "dependencies",
            DependencyKind::DevDependencies => "devDependencies",
            DependencyKind::PeerDependencies => "peerDependencies",
            DependencyKind::OptionalDependencies => "optionalDependencies",
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// Dependency declarations of one package, one map per category.
///
/// Version ranges are kept verbatim; nothing in monorun interprets them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DependencyDeclarations {
    pub dependencies: VersionMap,
    pub dev_dependencies: VersionMap,
    pub peer_dependencies: VersionMap,
    pub optional_dependencies: VersionMap,
}

impl DependencyDeclarations {
    /// Declarations of a single category
    pub fn of_kind(&self, kind: DependencyKind) -> &VersionMap {
        match kind {
            DependencyKind::Dependencies => &self.dependencies,
            DependencyKind::DevDependencies => &self.dev_dependencies,
            DependencyKind::PeerDependencies => &self.peer_dependencies,
            DependencyKind::OptionalDependencies => &self.optional_dependencies,
        }
    }

    /// Union of the dependency names declared under the given categories
    pub fn names<'a, I>(&'a self, kinds: I) -> BTreeSet<&'a str>
    where
        I: IntoIterator<Item = DependencyKind>,
    {
        kinds
            .into_iter()
            .flat_map(|kind| self.of_kind(kind).keys().map(String::as_str))
            .collect()
    }
}

/// One loaded workspace member
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageRecord {
    /// Unique package name, used as graph node key
    pub name: String,
    /// Absolute directory, used as the working directory of its script
    pub directory: PathBuf,
    pub version: Option<String>,
    /// Script name to command string, in manifest order
    pub scripts: IndexMap<String, String>,
    pub dependencies: DependencyDeclarations,
}

impl PackageRecord {
    pub fn new(name: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            directory: directory.into(),
            version: None,
            scripts: IndexMap::new(),
            dependencies: DependencyDeclarations::default(),
        }
    }

    /// Add a script
    pub fn with_script(mut self, name: impl Into<String>, command: impl Into<String>) -> Self {
        self.scripts.insert(name.into(), command.into());
        self
    }

    /// Add a dependency declaration of the given category
    pub fn with_dependency(mut self, kind: DependencyKind, name: impl Into<String>) -> Self {
        let map = match kind {
            DependencyKind::Dependencies => &mut self.dependencies.dependencies,
            DependencyKind::DevDependencies => &mut self.dependencies.dev_dependencies,
            DependencyKind::PeerDependencies => &mut self.dependencies.peer_dependencies,
            DependencyKind::OptionalDependencies => &mut self.dependencies.optional_dependencies,
        };
        map.insert(name.into(), "*".to_string());
        self
    }

    /// Command for the given script, if the package defines it
    pub fn script(&self, name: &str) -> Option<&str> {
        self.scripts.get(name).map(String::as_str)
    }

    pub fn has_script(&self, name: &str) -> bool {
        self.scripts.contains_key(name)
    }
}
