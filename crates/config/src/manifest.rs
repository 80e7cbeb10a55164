//! `package.json` parsing
//!
//! Only the fields monorun reads are modeled; everything else in a manifest
//! is ignored.

use indexmap::IndexMap;
use monorun_core::{
    constants::WORKSPACES_FIELD, DependencyDeclarations, Error, PackageRecord, Result,
};
use serde::Deserialize;
use std::path::Path;

/// A package manifest as written on disk
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub name: Option<String>,
    pub version: Option<String>,
    pub scripts: IndexMap<String, String>,
    #[serde(flatten)]
    pub dependencies: DependencyDeclarations,
}

impl Manifest {
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Turn the manifest into a package record rooted at `directory`.
    ///
    /// Fails when the manifest has no usable name, since the name is the
    /// package's identity everywhere downstream.
    pub fn into_record(self, directory: &Path, manifest_path: &Path) -> Result<PackageRecord> {
        let name = match self.name {
            Some(name) if !name.trim().is_empty() => name,
            _ => return Err(Error::manifest(manifest_path, "missing \"name\" field")),
        };

        Ok(PackageRecord {
            name,
            directory: directory.to_path_buf(),
            version: self.version,
            scripts: self.scripts,
            dependencies: self.dependencies,
        })
    }
}

/// The `workspaces` field of the root manifest.
///
/// npm and yarn v2+ use a plain array; yarn classic also accepts an object
/// whose `packages` key holds the array.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum WorkspacesField {
    Patterns(Vec<String>),
    Object {
        #[serde(default)]
        packages: Vec<String>,
    },
}

impl WorkspacesField {
    pub fn patterns(&self) -> &[String] {
        match self {
            WorkspacesField::Patterns(patterns) => patterns,
            WorkspacesField::Object { packages } => packages,
        }
    }
}

/// Extract the workspace patterns from the root manifest's JSON text
pub fn workspace_patterns(content: &str, manifest_path: &Path) -> Result<Vec<String>> {
    let value: serde_json::Value = serde_json::from_str(content).map_err(|e| {
        Error::configuration(format!(
            "failed to parse root manifest '{}': {e}",
            manifest_path.display()
        ))
    })?;

    let field = value.get(WORKSPACES_FIELD).ok_or_else(|| {
        Error::configuration(format!(
            "root manifest '{}' has no \"{WORKSPACES_FIELD}\" field",
            manifest_path.display()
        ))
    })?;

    let workspaces: WorkspacesField = serde_json::from_value(field.clone()).map_err(|_| {
        Error::configuration(format!(
            "\"{WORKSPACES_FIELD}\" in '{}' must be a pattern array or {{\"packages\": [...]}}",
            manifest_path.display()
        ))
    })?;

    let patterns: Vec<String> = workspaces
        .patterns()
        .iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();

    if patterns.is_empty() {
        return Err(Error::configuration(format!(
            "\"{WORKSPACES_FIELD}\" in '{}' declares no patterns",
            manifest_path.display()
        )));
    }

    tracing::debug!(?patterns, "Read workspace patterns");
    Ok(patterns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn root_path() -> PathBuf {
        PathBuf::from("/ws/package.json")
    }

    #[test]
    fn test_manifest_into_record() {
        let manifest = Manifest::from_json(
            r#"{
                "name": "@acme/web",
                "version": "1.2.3",
                "private": true,
                "scripts": {"build": "vite build", "test": "vitest"},
                "dependencies": {"@acme/ui": "workspace:*"},
                "devDependencies": {"typescript": "^5.0.0"}
            }"#,
        )
        .unwrap();

        let record = manifest
            .into_record(Path::new("/ws/apps/web"), Path::new("/ws/apps/web/package.json"))
            .unwrap();
        assert_eq!(record.name, "@acme/web");
        assert_eq!(record.version.as_deref(), Some("1.2.3"));
        assert_eq!(record.script("build"), Some("vite build"));
        assert!(record.dependencies.dependencies.contains_key("@acme/ui"));
        assert!(record.dependencies.dev_dependencies.contains_key("typescript"));
        assert!(record.dependencies.peer_dependencies.is_empty());
    }

    #[test]
    fn test_manifest_without_name_is_rejected() {
        let manifest = Manifest::from_json(r#"{"scripts": {"build": "make"}}"#).unwrap();
        let err = manifest
            .into_record(Path::new("/ws/a"), Path::new("/ws/a/package.json"))
            .unwrap_err();
        assert!(matches!(err, Error::Manifest { .. }));

        let blank = Manifest::from_json(r#"{"name": "  "}"#).unwrap();
        assert!(blank
            .into_record(Path::new("/ws/a"), Path::new("/ws/a/package.json"))
            .is_err());
    }

    #[test]
    fn test_malformed_manifest_fails_to_parse() {
        assert!(Manifest::from_json("{ not json").is_err());
        assert!(Manifest::from_json(r#"{"name": "a", "scripts": {"build": 1}}"#).is_err());
    }

    #[test]
    fn test_workspaces_array_form() {
        let content = r#"{"workspaces": ["packages/*", "apps/**"]}"#;
        let patterns = workspace_patterns(content, &root_path()).unwrap();
        assert_eq!(patterns, vec!["packages/*", "apps/**"]);
    }

    #[test]
    fn test_workspaces_object_form() {
        let patterns = workspace_patterns(
            r#"{"workspaces": {"packages": ["libs/*"], "nohoist": ["**/react"]}}"#,
            &root_path(),
        )
        .unwrap();
        assert_eq!(patterns, vec!["libs/*"]);
    }

    #[test]
    fn test_missing_or_invalid_workspaces_field() {
        let missing = workspace_patterns(r#"{"name": "root"}"#, &root_path()).unwrap_err();
        assert!(missing.to_string().contains("no \"workspaces\" field"));

        let invalid = workspace_patterns(r#"{"workspaces": "packages/*"}"#, &root_path());
        assert!(matches!(invalid, Err(Error::Configuration { .. })));

        let empty = workspace_patterns(r#"{"workspaces": []}"#, &root_path());
        assert!(empty.is_err());

        assert!(workspace_patterns("nope", &root_path()).is_err());
    }
}
