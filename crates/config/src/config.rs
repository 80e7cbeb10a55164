//! Centralized run configuration for monorun
//!
//! `RunConfig` is immutable after construction and carries every knob the
//! selection, planning and execution stages read. It is built through
//! `RunConfigBuilder`, which owns the validation rules.

use monorun_core::{constants::DEFAULT_SCRIPT, Error, Result};
use serde::Serialize;
use std::fmt;
use std::num::NonZeroUsize;
use std::path::PathBuf;

/// How the execution engine walks the plan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionMode {
    /// One task at a time in flattened plan order; stop at the first failure
    Sequential,
    /// Tier by tier with a bounded worker pool; a failing tier finishes first
    #[default]
    ParallelByTier,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Sequential => f.write_str("sequential"),
            ExecutionMode::ParallelByTier => f.write_str("parallel-by-tier"),
        }
    }
}

/// Which optional dependency categories produce graph edges.
///
/// `dependencies` and `optionalDependencies` always do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EdgeOptions {
    pub include_dev: bool,
    pub include_peer: bool,
}

impl Default for EdgeOptions {
    fn default() -> Self {
        Self {
            include_dev: true,
            include_peer: true,
        }
    }
}

/// Include/exclude glob patterns matched against package name or directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectionCriteria {
    pub only: Vec<String>,
    pub exclude: Vec<String>,
}

impl SelectionCriteria {
    pub fn is_unrestricted(&self) -> bool {
        self.only.is_empty() && self.exclude.is_empty()
    }
}

/// Resolved configuration for one run
#[derive(Debug, Clone, Serialize)]
pub struct RunConfig {
    /// Workspace root holding the root manifest
    pub root: PathBuf,
    /// Script to run in every selected package
    pub script: String,
    /// Worker pool size per tier
    pub jobs: NonZeroUsize,
    pub edges: EdgeOptions,
    pub selection: SelectionCriteria,
    pub mode: ExecutionMode,
    /// Stop after planning and print what would run
    pub print_only: bool,
    pub debug: bool,
    /// Extra arguments appended to every script command
    pub script_args: Vec<String>,
}

impl RunConfig {
    pub fn builder(root: impl Into<PathBuf>) -> RunConfigBuilder {
        RunConfigBuilder::new(root)
    }
}

/// Default worker count: logical CPUs, never less than one
pub fn default_jobs() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN)
}

/// Builder for `RunConfig`
#[derive(Debug, Clone)]
pub struct RunConfigBuilder {
    root: PathBuf,
    script: Option<String>,
    jobs: Option<usize>,
    edges: EdgeOptions,
    selection: SelectionCriteria,
    mode: ExecutionMode,
    print_only: bool,
    debug: bool,
    script_args: Vec<String>,
}

impl RunConfigBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            script: None,
            jobs: None,
            edges: EdgeOptions::default(),
            selection: SelectionCriteria::default(),
            mode: ExecutionMode::default(),
            print_only: false,
            debug: false,
            script_args: Vec::new(),
        }
    }

    pub fn script(mut self, script: impl Into<String>) -> Self {
        self.script = Some(script.into());
        self
    }

    /// Set the worker pool size; validated in `build`
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = Some(jobs);
        self
    }

    pub fn include_dev(mut self, include: bool) -> Self {
        self.edges.include_dev = include;
        self
    }

    pub fn include_peer(mut self, include: bool) -> Self {
        self.edges.include_peer = include;
        self
    }

    pub fn only<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selection.only.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selection.exclude.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn sequential(self, sequential: bool) -> Self {
        if sequential {
            self.mode(ExecutionMode::Sequential)
        } else {
            self
        }
    }

    pub fn print_only(mut self, print_only: bool) -> Self {
        self.print_only = print_only;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn script_args(mut self, args: Vec<String>) -> Self {
        self.script_args = args;
        self
    }

    /// Validate and build the configuration
    pub fn build(self) -> Result<RunConfig> {
        let script = self.script.unwrap_or_else(|| DEFAULT_SCRIPT.to_string());
        if script.trim().is_empty() {
            return Err(Error::configuration("script name must not be empty"));
        }

        let jobs = match self.jobs {
            Some(n) => NonZeroUsize::new(n).ok_or_else(|| {
                Error::configuration(format!("--jobs must be a positive integer, got {n}"))
            })?,
            None => default_jobs(),
        };

        for pattern in self.selection.only.iter().chain(&self.selection.exclude) {
            if pattern.is_empty() {
                return Err(Error::configuration("selection patterns must not be empty"));
            }
        }

        Ok(RunConfig {
            root: self.root,
            script,
            jobs,
            edges: self.edges,
            selection: self.selection,
            mode: self.mode,
            print_only: self.print_only,
            debug: self.debug,
            script_args: self.script_args,
        })
    }
}
