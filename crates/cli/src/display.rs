use monorun_config::RunConfig;
use monorun_core::Result;
use monorun_task::{ExecutionPlan, PlannedTask, RunReport};
use std::fmt::Write as _;
use std::path::Path;

pub fn print_config(config: &RunConfig) -> Result<()> {
    println!("Resolved configuration:");
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

pub fn print_plan(plan: &ExecutionPlan, tasks: &[Vec<PlannedTask>], script: &str, root: &Path) {
    print!("{}", format_plan(plan, tasks, script, root));
}

/// Render the plan tier by tier with the command each package would run
pub fn format_plan(
    plan: &ExecutionPlan,
    tasks: &[Vec<PlannedTask>],
    script: &str,
    root: &Path,
) -> String {
    let mut out = String::new();
    let runnable = tasks.iter().flatten().filter(|t| t.is_runnable()).count();
    let _ = writeln!(
        out,
        "Execution plan for '{script}': {} packages in {} tiers, {runnable} to run",
        plan.len(),
        plan.tiers.len()
    );

    for (idx, tier) in tasks.iter().enumerate() {
        let is_cycle = plan.has_cycle() && idx + 1 == plan.tiers.len();
        let marker = if is_cycle { " (dependency cycle, order not guaranteed)" } else { "" };
        let _ = writeln!(out, "Tier {}{marker}:", idx + 1);

        for task in tier {
            let location = task
                .directory
                .strip_prefix(root)
                .unwrap_or(&task.directory)
                .display();
            match &task.command {
                Some(command) => {
                    let _ = writeln!(out, "  {} ({location})\n    $ {command}", task.package);
                }
                None => {
                    let _ = writeln!(
                        out,
                        "  {} ({location}) [no '{script}' script, skipped]",
                        task.package
                    );
                }
            }
        }
    }
    out
}

pub fn print_summary(report: &RunReport, script: &str) {
    println!(
        "✓ '{script}' succeeded in {} packages ({} skipped) in {:.2}s",
        report.outcomes.len(),
        report.skipped.len(),
        report.elapsed.as_secs_f64()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_plan_marks_skips_and_cycles() {
        let plan = ExecutionPlan {
            tiers: vec![vec!["a".into()], vec!["b".into(), "c".into()]],
            cycle: Some(vec!["b".into(), "c".into()]),
        };
        let tasks = vec![
            vec![PlannedTask {
                package: "a".into(),
                directory: PathBuf::from("/ws/packages/a"),
                command: Some("tsc -b".into()),
            }],
            vec![
                PlannedTask {
                    package: "b".into(),
                    directory: PathBuf::from("/ws/packages/b"),
                    command: None,
                },
                PlannedTask {
                    package: "c".into(),
                    directory: PathBuf::from("/ws/packages/c"),
                    command: Some("make".into()),
                },
            ],
        ];

        let text = format_plan(&plan, &tasks, "build", Path::new("/ws"));
        assert!(text.starts_with("Execution plan for 'build': 3 packages in 2 tiers, 2 to run"));
        assert!(text.contains("Tier 1:\n  a (packages/a)\n    $ tsc -b"));
        assert!(text.contains("Tier 2 (dependency cycle, order not guaranteed):"));
        assert!(text.contains("b (packages/b) [no 'build' script, skipped]"));
    }
}
