/// Constants used throughout the monorun codebase
// Manifest constants
pub const MANIFEST_FILENAME: &str = "package.json";
pub const WORKSPACES_FIELD: &str = "workspaces";

// Script run when none is given on the command line
pub const DEFAULT_SCRIPT: &str = "build";

// Directories never entered while expanding `**`
pub const NODE_MODULES_DIR: &str = "node_modules";

// Exit code reported when a process has no code (killed by a signal) or
// could not be spawned at all
pub const UNKNOWN_EXIT_CODE: i32 = -1;
