//! Selection of the packages a run considers

use crate::glob::GlobPattern;
use monorun_config::SelectionCriteria;
use monorun_core::{Error, PackageRecord, Result};
use std::path::Path;

/// Compiled include/exclude patterns
#[derive(Debug, Clone)]
pub struct SelectionFilter {
    only: Vec<GlobPattern>,
    exclude: Vec<GlobPattern>,
}

impl SelectionFilter {
    pub fn new(criteria: &SelectionCriteria) -> Result<Self> {
        let compile = |patterns: &[String]| -> Result<Vec<GlobPattern>> {
            patterns.iter().map(|p| GlobPattern::new(p)).collect()
        };
        Ok(Self {
            only: compile(&criteria.only)?,
            exclude: compile(&criteria.exclude)?,
        })
    }

    /// Whether `record` is selected.
    ///
    /// A pattern matches when it matches the package name, its absolute
    /// directory, or its directory relative to `root`.
    pub fn matches(&self, record: &PackageRecord, root: &Path) -> bool {
        let candidates = candidates(record, root);
        let hit = |glob: &GlobPattern| candidates.iter().any(|c| glob.is_match(c));

        let included = self.only.is_empty() || self.only.iter().any(hit);
        included && !self.exclude.iter().any(hit)
    }
}

fn candidates(record: &PackageRecord, root: &Path) -> Vec<String> {
    let mut out = vec![record.name.clone(), to_slash(&record.directory)];
    if let Ok(relative) = record.directory.strip_prefix(root) {
        if !relative.as_os_str().is_empty() {
            out.push(to_slash(relative));
        }
    }
    out
}

fn to_slash(path: &Path) -> String {
    let s = path.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        s.into_owned()
    } else {
        s.replace(std::path::MAIN_SEPARATOR, "/")
    }
}

/// Narrow `records` down to the selected packages.
///
/// An empty result is an error: there is nothing to plan.
pub fn select(
    records: Vec<PackageRecord>,
    criteria: &SelectionCriteria,
    root: &Path,
) -> Result<Vec<PackageRecord>> {
    let filter = SelectionFilter::new(criteria)?;
    let total = records.len();
    let selected: Vec<PackageRecord> = records
        .into_iter()
        .filter(|record| filter.matches(record, root))
        .collect();

    tracing::debug!(total, selected = selected.len(), "Applied package selection");

    if selected.is_empty() {
        return Err(Error::discovery(format!(
            "no packages matched the selection (only: {:?}, exclude: {:?})",
            criteria.only, criteria.exclude
        )));
    }
    Ok(selected)
}
