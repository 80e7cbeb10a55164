//! Core domain types, errors, and constants for `monorun`.
//!
//! Everything downstream of manifest parsing speaks in terms of the types
//! defined here, so the workspace, planning and execution crates never need
//! to agree on anything else.
//!
//! ## Key Components
//!
//! - **`errors`**: the `Error` enum and `Result` alias shared by every crate.
//! - **`types`**: `PackageRecord` and the dependency declarations it carries.
//! - **`constants`**: manifest file names and defaults.

pub mod constants;
pub mod errors;
pub mod types;

pub use self::{
    constants::*,
    errors::{Error, Result, ResultExt},
    types::*,
};
