use std::path::PathBuf;

/// Result type alias for monorun operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for monorun operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid flags, unreadable root manifest, bad `workspaces` field
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Nothing to run: no workspace directories or no selected packages
    #[error("discovery error: {message}")]
    Discovery { message: String },

    /// A member manifest could not be used
    #[error("invalid manifest '{path}': {message}")]
    Manifest { path: PathBuf, message: String },

    /// A selection or workspace pattern could not be compiled
    #[error("invalid glob pattern '{pattern}': {message}")]
    Glob { pattern: String, message: String },

    /// A file or directory could not be accessed
    #[error("file system {operation} operation failed for '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// A script process could not be started
    #[error("failed to run command '{command}': {message}")]
    CommandExecution { command: String, message: String },

    /// A worker in the execution pool panicked or its shared state was poisoned
    #[error("task worker failed: {message}")]
    Worker { message: String },

    /// A package's script exited unsuccessfully
    #[error("script '{script}' failed in package '{package}' with exit code {exit_code}")]
    TaskFailed {
        package: String,
        script: String,
        exit_code: i32,
    },
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Json {
            message: error.to_string(),
            source: error,
        }
    }
}

// Helper methods for creating errors with context
impl Error {
    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Create a discovery error
    #[must_use]
    pub fn discovery(message: impl Into<String>) -> Self {
        Error::Discovery {
            message: message.into(),
        }
    }

    /// Create a manifest error
    #[must_use]
    pub fn manifest(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::Manifest {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a glob pattern error
    #[must_use]
    pub fn glob(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Glob {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// Create a file system error with context
    #[must_use]
    pub fn file_system(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Error::FileSystem {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    /// Create a command execution error
    #[must_use]
    pub fn command_execution(command: impl Into<String>, message: impl Into<String>) -> Self {
        Error::CommandExecution {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Create a worker pool error
    #[must_use]
    pub fn worker(message: impl Into<String>) -> Self {
        Error::Worker {
            message: message.into(),
        }
    }

    /// Create a task failure error
    #[must_use]
    pub fn task_failed(
        package: impl Into<String>,
        script: impl Into<String>,
        exit_code: i32,
    ) -> Self {
        Error::TaskFailed {
            package: package.into(),
            script: script.into(),
            exit_code,
        }
    }

    /// Whether this error came from a script rather than from setup
    pub fn is_task_failure(&self) -> bool {
        matches!(self, Error::TaskFailed { .. })
    }
}

/// Turn any error into a configuration error prefixed with `message`
pub trait ResultExt<T> {
    /// Add context to a Result
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a lazy message
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<Error>,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let base_error = e.into();
            Error::Configuration {
                message: format!("{}: {}", message.into(), base_error),
            }
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let base_error = e.into();
            Error::Configuration {
                message: format!("{}: {}", f(), base_error),
            }
        })
    }
}
