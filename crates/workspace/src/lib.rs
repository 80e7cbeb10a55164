//! Workspace discovery and package selection for monorun
//!
//! This crate turns the root manifest's workspace patterns into loaded
//! package records and narrows them down to the packages a run considers.

pub mod catalog;
pub mod filter;
pub mod fs;
pub mod glob;
pub mod resolver;

pub use catalog::*;
pub use filter::*;
pub use fs::*;
pub use glob::GlobPattern;
pub use resolver::*;
