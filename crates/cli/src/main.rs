use clap::Parser;
use monorun_config::RunConfig;
use monorun_core::{constants::DEFAULT_SCRIPT, Error, Result, ResultExt};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod display;
mod run;

#[derive(Parser, Debug)]
#[command(name = "monorun")]
#[command(about = "Run a script across workspace packages in dependency order", long_about = None)]
#[command(version)]
struct Cli {
    /// Script to run in every selected package
    #[arg(default_value = DEFAULT_SCRIPT)]
    script: String,

    /// Worker pool size per tier (defaults to the number of logical CPUs)
    #[arg(short, long, value_parser = parse_jobs)]
    jobs: Option<usize>,

    /// Ignore devDependencies when ordering packages
    #[arg(long)]
    no_dev: bool,

    /// Ignore peerDependencies when ordering packages
    #[arg(long)]
    no_peer: bool,

    /// Only run packages whose name or directory matches (repeatable)
    #[arg(long = "only", visible_alias = "filter", value_name = "GLOB")]
    only: Vec<String>,

    /// Skip packages whose name or directory matches (repeatable)
    #[arg(long, value_name = "GLOB")]
    exclude: Vec<String>,

    /// Run one package at a time instead of tier by tier
    #[arg(long)]
    sequential: bool,

    /// Print the execution plan without running anything
    #[arg(long)]
    print_only: bool,

    /// Print the resolved configuration, plan and commands, and log verbosely
    #[arg(long)]
    debug: bool,

    /// Workspace root (defaults to the current directory)
    #[arg(short = 'C', long = "cwd", value_name = "DIR")]
    cwd: Option<PathBuf>,

    /// Arguments passed on to every script (after --)
    #[arg(last = true)]
    script_args: Vec<String>,
}

fn parse_jobs(value: &str) -> std::result::Result<usize, String> {
    match value.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(format!("expected a positive integer, got '{value}'")),
    }
}

impl Cli {
    fn into_config(self) -> Result<RunConfig> {
        let root = match self.cwd {
            Some(dir) => dir,
            None => std::env::current_dir()
                .map_err(|e| Error::file_system(".", "current_dir", e))
                .context("cannot determine the working directory")?,
        };
        let root = root
            .canonicalize()
            .map_err(|e| Error::file_system(&root, "canonicalize", e))
            .context("workspace root is not accessible")?;

        let mut builder = RunConfig::builder(root)
            .script(self.script)
            .include_dev(!self.no_dev)
            .include_peer(!self.no_peer)
            .only(self.only)
            .exclude(self.exclude)
            .sequential(self.sequential)
            .print_only(self.print_only)
            .debug(self.debug)
            .script_args(self.script_args);
        if let Some(jobs) = self.jobs {
            builder = builder.jobs(jobs);
        }
        builder.build()
    }
}

fn parse_cli() -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Usage errors exit with 1 like every other configuration error
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    }
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = parse_cli();
    color_eyre::install()?;
    init_tracing(cli.debug);

    let config = cli.into_config()?;
    run::run(config).await?;
    Ok(())
}
