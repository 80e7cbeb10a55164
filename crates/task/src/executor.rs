use crate::plan::ExecutionPlan;
use crate::runner::{command_with_args, ScriptRunner};
use monorun_config::{ExecutionMode, RunConfig};
use monorun_core::{constants::UNKNOWN_EXIT_CODE, Error, PackageRecord, Result};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::Instrument;

/// Lifecycle of one package's task within a run
///
/// `Pending → Running → {Succeeded | Failed}`, or `Pending → Skipped` for
/// packages without the script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Running,
    Succeeded,
    Failed,
    /// The package has no such script; it only holds its place in the plan
    Skipped,
}

impl TaskState {
    pub fn can_transition_to(self, next: TaskState) -> bool {
        matches!(
            (self, next),
            (TaskState::Pending, TaskState::Running)
                | (TaskState::Pending, TaskState::Skipped)
                | (TaskState::Running, TaskState::Succeeded)
                | (TaskState::Running, TaskState::Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Succeeded | TaskState::Failed | TaskState::Skipped)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::Pending => "pending",
            TaskState::Running => "running",
            TaskState::Succeeded => "succeeded",
            TaskState::Failed => "failed",
            TaskState::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Result of running one package's script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    pub package: String,
    pub exit_code: i32,
    pub succeeded: bool,
    pub duration: Duration,
}

impl TaskOutcome {
    pub fn state(&self) -> TaskState {
        if self.succeeded {
            TaskState::Succeeded
        } else {
            TaskState::Failed
        }
    }
}

/// Summary of a run that completed without failures
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Outcomes in completion order
    pub outcomes: Vec<TaskOutcome>,
    /// Packages without the script, in plan order
    pub skipped: Vec<String>,
    /// Final state of every planned package
    pub states: BTreeMap<String, TaskState>,
    pub elapsed: Duration,
}

impl RunReport {
    /// `None` for packages that were not part of the run
    pub fn state_of(&self, package: &str) -> Option<TaskState> {
        self.states.get(package).copied()
    }
}

/// One package's entry in a plan, resolved against its manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedTask {
    pub package: String,
    pub directory: PathBuf,
    /// Full command line, `None` when the package lacks the script
    pub command: Option<String>,
}

impl PlannedTask {
    pub fn is_runnable(&self) -> bool {
        self.command.is_some()
    }
}

/// Resolve every planned package to the command it would run, tier by tier
pub fn resolve_tasks(
    plan: &ExecutionPlan,
    packages: &[PackageRecord],
    script: &str,
    script_args: &[String],
) -> Result<Vec<Vec<PlannedTask>>> {
    let by_name: HashMap<&str, &PackageRecord> =
        packages.iter().map(|p| (p.name.as_str(), p)).collect();

    plan.tiers
        .iter()
        .map(|tier| {
            tier.iter()
                .map(|name| {
                    let package = by_name.get(name.as_str()).ok_or_else(|| {
                        Error::configuration(format!(
                            "Package '{name}' not found in execution plan"
                        ))
                    })?;
                    Ok(PlannedTask {
                        package: name.clone(),
                        directory: package.directory.clone(),
                        command: package
                            .script(script)
                            .map(|command| command_with_args(command, script_args)),
                    })
                })
                .collect()
        })
        .collect()
}

/// Knobs of the execution engine
#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    pub script: String,
    pub mode: ExecutionMode,
    pub jobs: NonZeroUsize,
    pub script_args: Vec<String>,
}

impl ExecutionOptions {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            script: config.script.clone(),
            mode: config.mode,
            jobs: config.jobs,
            script_args: config.script_args.clone(),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|e| Error::worker(format!("failed to acquire lock: {e}")))
}

/// Task states and progress numbering shared by all workers of one run
#[derive(Debug, Default)]
struct TaskBoard {
    states: Mutex<BTreeMap<String, TaskState>>,
    started: AtomicUsize,
    total: AtomicUsize,
    running: AtomicUsize,
    peak_running: AtomicUsize,
}

impl TaskBoard {
    fn reset(&self, tiers: &[Vec<PlannedTask>]) -> Result<()> {
        *lock(&self.states)? = tiers
            .iter()
            .flatten()
            .map(|t| (t.package.clone(), TaskState::Pending))
            .collect();
        let runnable = tiers.iter().flatten().filter(|t| t.is_runnable()).count();
        self.total.store(runnable, Ordering::SeqCst);
        self.started.store(0, Ordering::SeqCst);
        self.running.store(0, Ordering::SeqCst);
        self.peak_running.store(0, Ordering::SeqCst);
        Ok(())
    }

    fn next_position(&self) -> usize {
        self.started.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    fn transition(&self, package: &str, next: TaskState) -> Result<()> {
        let mut states = lock(&self.states)?;
        let current = states.get(package).copied().ok_or_else(|| {
            Error::worker(format!("package '{package}' is not part of this run"))
        })?;
        if !current.can_transition_to(next) {
            return Err(Error::worker(format!(
                "invalid state change for '{package}': {current} -> {next}"
            )));
        }
        states.insert(package.to_string(), next);

        if next == TaskState::Running {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_running.fetch_max(now, Ordering::SeqCst);
        } else if current == TaskState::Running {
            self.running.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn snapshot(&self) -> Result<BTreeMap<String, TaskState>> {
        Ok(lock(&self.states)?.clone())
    }
}

/// Runs the plan's tasks through a `ScriptRunner`
///
/// Task states of the latest run stay readable after `execute` returns,
/// including after a failure.
pub struct Executor {
    runner: Arc<dyn ScriptRunner>,
    options: ExecutionOptions,
    board: Arc<TaskBoard>,
}

impl Executor {
    pub fn new(runner: Arc<dyn ScriptRunner>, options: ExecutionOptions) -> Self {
        Self {
            runner,
            options,
            board: Arc::new(TaskBoard::default()),
        }
    }

    pub fn options(&self) -> &ExecutionOptions {
        &self.options
    }

    /// State of every package planned in the latest run
    pub fn task_states(&self) -> Result<BTreeMap<String, TaskState>> {
        self.board.snapshot()
    }

    /// Largest number of tasks that were `Running` at the same time
    pub fn peak_running(&self) -> usize {
        self.board.peak_running.load(Ordering::SeqCst)
    }

    /// Run the script for every planned package that has it.
    ///
    /// Returns the first task failure as `Error::TaskFailed`.
    pub async fn execute(
        &self,
        plan: &ExecutionPlan,
        packages: &[PackageRecord],
    ) -> Result<RunReport> {
        let tiers = resolve_tasks(
            plan,
            packages,
            &self.options.script,
            &self.options.script_args,
        )?;
        self.board.reset(&tiers)?;
        let total = self.board.total();

        let pipeline_span = tracing::info_span!(
            "pipeline",
            script = %self.options.script,
            mode = %self.options.mode,
            tasks = total
        );

        async move {
            tracing::info!(
                tiers = tiers.len(),
                packages = plan.len(),
                runnable = total,
                jobs = self.options.jobs.get(),
                "Starting script execution"
            );

            let started = Instant::now();
            let mut report = RunReport::default();

            for task in tiers.iter().flatten().filter(|t| !t.is_runnable()) {
                tracing::debug!(
                    package = %task.package,
                    script = %self.options.script,
                    "No such script, skipping"
                );
                self.board.transition(&task.package, TaskState::Skipped)?;
                report.skipped.push(task.package.clone());
            }

            match self.options.mode {
                ExecutionMode::Sequential => self.execute_sequential(&tiers, &mut report).await?,
                ExecutionMode::ParallelByTier => self.execute_tiered(&tiers, &mut report).await?,
            }

            report.elapsed = started.elapsed();
            report.states = self.board.snapshot()?;
            tracing::info!(
                ran = report.outcomes.len(),
                skipped = report.skipped.len(),
                elapsed = ?report.elapsed,
                "Script execution completed successfully"
            );
            Ok::<RunReport, Error>(report)
        }
        .instrument(pipeline_span)
        .await
    }

    async fn execute_sequential(
        &self,
        tiers: &[Vec<PlannedTask>],
        report: &mut RunReport,
    ) -> Result<()> {
        for task in tiers.iter().flatten().filter(|t| t.is_runnable()) {
            let outcome =
                run_task(self.runner.as_ref(), task, &self.options.script, &self.board).await?;
            let failed = !outcome.succeeded;
            let exit_code = outcome.exit_code;
            report.outcomes.push(outcome);

            if failed {
                tracing::error!(package = %task.package, "Stopping after first failure");
                return Err(Error::task_failed(&task.package, &self.options.script, exit_code));
            }
        }
        Ok(())
    }

    async fn execute_tiered(
        &self,
        tiers: &[Vec<PlannedTask>],
        report: &mut RunReport,
    ) -> Result<()> {
        for (tier_idx, tier) in tiers.iter().enumerate() {
            let runnable: Vec<PlannedTask> =
                tier.iter().filter(|t| t.is_runnable()).cloned().collect();
            if runnable.is_empty() {
                tracing::debug!(tier = tier_idx + 1, "Nothing to run in tier");
                continue;
            }

            let tier_span = tracing::info_span!("tier", idx = tier_idx + 1, tasks = runnable.len());
            let (outcomes, failures) = self.run_tier(runnable).instrument(tier_span).await?;
            report.outcomes.extend(outcomes);

            if let Some(first) = failures.first() {
                let failed_names: Vec<&str> =
                    failures.iter().map(|o| o.package.as_str()).collect();
                tracing::error!(
                    tier = tier_idx + 1,
                    failed = ?failed_names,
                    "Tier finished with failures; not starting further tiers"
                );
                return Err(Error::task_failed(
                    &first.package,
                    &self.options.script,
                    first.exit_code,
                ));
            }
        }
        Ok(())
    }

    /// Run one tier with `min(jobs, tasks)` workers claiming tasks from a
    /// shared cursor. Every task runs even if a sibling fails.
    async fn run_tier(
        &self,
        tasks: Vec<PlannedTask>,
    ) -> Result<(Vec<TaskOutcome>, Vec<TaskOutcome>)> {
        let workers = self.options.jobs.get().min(tasks.len());
        tracing::info!(workers, "Starting tier");

        let tasks = Arc::new(tasks);
        let cursor = Arc::new(Mutex::new(0usize));
        let outcomes = Arc::new(Mutex::new(Vec::with_capacity(tasks.len())));
        let failures = Arc::new(Mutex::new(Vec::new()));
        let mut join_set = JoinSet::new();

        for _ in 0..workers {
            let tasks = Arc::clone(&tasks);
            let cursor = Arc::clone(&cursor);
            let outcomes = Arc::clone(&outcomes);
            let failures = Arc::clone(&failures);
            let board = Arc::clone(&self.board);
            let runner = Arc::clone(&self.runner);
            let script = self.options.script.clone();

            join_set.spawn(
                async move {
                    while let Some(index) = claim_next(&cursor, tasks.len())? {
                        let task = &tasks[index];
                        let outcome = run_task(runner.as_ref(), task, &script, &board).await?;
                        if !outcome.succeeded {
                            lock(&failures)?.push(outcome.clone());
                        }
                        lock(&outcomes)?.push(outcome);
                    }
                    Ok::<(), Error>(())
                }
                .in_current_span(),
            );
        }

        // Every worker is joined before an error is reported
        let mut worker_error = None;
        while let Some(result) = join_set.join_next().await {
            let error = match result {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e,
                Err(e) => Error::worker(e.to_string()),
            };
            tracing::error!(error = %error, "Task worker stopped abnormally");
            worker_error.get_or_insert(error);
        }
        if let Some(error) = worker_error {
            return Err(error);
        }

        let outcomes = std::mem::take(&mut *lock(&outcomes)?);
        let failures = std::mem::take(&mut *lock(&failures)?);
        Ok((outcomes, failures))
    }
}

fn claim_next(cursor: &Mutex<usize>, len: usize) -> Result<Option<usize>> {
    let mut next = lock(cursor)?;
    if *next >= len {
        return Ok(None);
    }
    let index = *next;
    *next += 1;
    Ok(Some(index))
}

async fn run_task(
    runner: &dyn ScriptRunner,
    task: &PlannedTask,
    script: &str,
    board: &TaskBoard,
) -> Result<TaskOutcome> {
    let command = task.command.as_deref().unwrap_or_default();
    let position = board.next_position();
    tracing::info!(
        package = %task.package,
        command = %command,
        "[{position}/{}] {} › {script}",
        board.total(),
        task.package
    );
    board.transition(&task.package, TaskState::Running)?;

    let started = Instant::now();
    let exit_code = match runner.run(command, &task.directory).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(package = %task.package, error = %e, "Could not run script");
            UNKNOWN_EXIT_CODE
        }
    };
    let duration = started.elapsed();
    let outcome = TaskOutcome {
        package: task.package.clone(),
        exit_code,
        succeeded: exit_code == 0,
        duration,
    };
    board.transition(&task.package, outcome.state())?;

    if outcome.succeeded {
        tracing::info!(package = %task.package, exit_code, ?duration, "Task succeeded");
    } else {
        tracing::error!(package = %task.package, exit_code, ?duration, "Task failed");
    }
    Ok(outcome)
}
