// src/constants.rs

//! File names, environment variable names and I/O tunables shared across the crate.

use std::time::Duration;

/// The name of the directory holding cash configuration (inside the system config dir).
pub const CASH_CONFIG_DIR: &str = "cash";

/// The name of the main configuration file (inside the cash config dir).
pub const CONFIG_FILENAME: &str = "config.toml";

/// Environment variable holding the executable search path.
pub const PATH_VAR: &str = "PATH";

/// Size of the buffer used when draining a child's stdout/stderr pipes.
pub const PIPE_READ_BUFFER_SIZE: usize = 8 * 1024;

/// How long a settling process waits for its pipes to reach end of file after exit.
pub const EXIT_DRAIN_GRACE: Duration = Duration::from_millis(250);

/// File that receives environment variables exported for later workflow steps.
pub const GITHUB_ENV: &str = "GITHUB_ENV";

/// File that receives step outputs.
pub const GITHUB_OUTPUT: &str = "GITHUB_OUTPUT";

/// File that receives directories to prepend to `PATH` for later workflow steps.
pub const GITHUB_PATH: &str = "GITHUB_PATH";

/// File that receives the markdown step summary.
pub const GITHUB_STEP_SUMMARY: &str = "GITHUB_STEP_SUMMARY";

/// Set to `1` by the runner when step debug logging is enabled.
pub const RUNNER_DEBUG: &str = "RUNNER_DEBUG";

/// Prefix of the environment variables carrying action inputs.
pub const INPUT_PREFIX: &str = "INPUT_";
