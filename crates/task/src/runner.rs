use async_trait::async_trait;
use monorun_core::{constants::UNKNOWN_EXIT_CODE, Error, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Runs one script command to completion and reports its exit code.
///
/// Output is not captured; the child inherits the parent's streams.
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    async fn run(&self, command: &str, cwd: &Path) -> Result<i32>;
}

/// Runs commands through the platform shell
#[derive(Debug, Clone, Default)]
pub struct ShellRunner {
    /// Extra directories put in front of `PATH` for every command
    extra_path: Vec<PathBuf>,
}

impl ShellRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make binaries installed at the workspace root available to scripts,
    /// the way package managers do for `run`.
    pub fn with_workspace_root(mut self, root: &Path) -> Self {
        self.extra_path.push(root.join("node_modules").join(".bin"));
        self
    }

    fn search_path(&self, cwd: &Path) -> Option<OsString> {
        let mut dirs = vec![cwd.join("node_modules").join(".bin")];
        dirs.extend(self.extra_path.iter().cloned());
        if let Some(current) = std::env::var_os("PATH") {
            dirs.extend(std::env::split_paths(&current));
        }
        std::env::join_paths(dirs).ok()
    }

    fn shell_command(command: &str) -> Command {
        let (shell, flag) = if cfg!(windows) { ("cmd", "/C") } else { ("sh", "-c") };
        let mut cmd = Command::new(shell);
        cmd.arg(flag).arg(command);
        cmd
    }
}

#[async_trait]
impl ScriptRunner for ShellRunner {
    async fn run(&self, command: &str, cwd: &Path) -> Result<i32> {
        let mut cmd = Self::shell_command(command);
        cmd.current_dir(cwd)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if let Some(path) = self.search_path(cwd) {
            cmd.env("PATH", path);
        }

        let status = cmd
            .status()
            .await
            .map_err(|e| Error::command_execution(command, e.to_string()))?;

        Ok(status.code().unwrap_or(UNKNOWN_EXIT_CODE))
    }
}

/// Append user arguments to a script command, quoted for the shell
pub fn command_with_args(command: &str, args: &[String]) -> String {
    if args.is_empty() {
        return command.to_string();
    }
    let quoted: Vec<String> = args
        .iter()
        .map(|arg| {
            shlex::try_quote(arg)
                .map(|q| q.into_owned())
                .unwrap_or_else(|_| arg.clone())
        })
        .collect();
    format!("{} {}", command, quoted.join(" "))
}
