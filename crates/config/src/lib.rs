//! Run configuration and manifest parsing for monorun
//!
//! `RunConfig` is the single value the rest of the pipeline reads its knobs
//! from; `manifest` turns `package.json` text into package records and
//! workspace patterns.

pub mod config;
pub mod manifest;

pub use config::*;
pub use manifest::*;
