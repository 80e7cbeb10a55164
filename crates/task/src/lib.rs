//! Dependency graph construction, tier planning and script execution for
//! monorun
//!
//! The flow is `DependencyGraph::build` → `ExecutionPlan::from_graph` →
//! `Executor::execute`, each stage a pure function of the previous one
//! except the last, which runs processes through a `ScriptRunner`.

pub mod executor;
pub mod graph;
pub mod plan;
pub mod runner;

pub use executor::*;
pub use graph::*;
pub use plan::*;
pub use runner::*;
