use crate::display;
use monorun_config::RunConfig;
use monorun_core::Result;
use monorun_task::{
    resolve_tasks, DependencyGraph, ExecutionOptions, ExecutionPlan, Executor, ShellRunner,
};
use monorun_workspace::{LocalFs, Workspace};
use std::sync::Arc;

/// Discover, select, plan and (unless `print_only`) execute
pub async fn run(config: RunConfig) -> Result<()> {
    if config.debug {
        display::print_config(&config)?;
    }

    let workspace = Workspace::discover(&LocalFs, &config.root)?;
    let selected = workspace.select(&config.selection)?;
    tracing::info!(
        selected = selected.len(),
        total = workspace.packages.len(),
        script = %config.script,
        "Selected packages"
    );

    let graph = DependencyGraph::build(&selected, config.edges);
    let plan = ExecutionPlan::from_graph(&graph);

    if config.print_only || config.debug {
        let tasks = resolve_tasks(&plan, &selected, &config.script, &config.script_args)?;
        display::print_plan(&plan, &tasks, &config.script, &workspace.root);
    }

    if config.print_only {
        return Ok(());
    }

    let runner = Arc::new(ShellRunner::new().with_workspace_root(&workspace.root));
    let executor = Executor::new(runner, ExecutionOptions::from_config(&config));
    let report = executor.execute(&plan, &selected).await?;

    display::print_summary(&report, &config.script);
    Ok(())
}
