// src/cli.rs

//! Command-line arguments of the `cash` binary.

use anyhow::{Result, anyhow};
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;

/// cash: run a script through sh, bash, powershell or cmd and stream its output.
///
/// Everything after the options is joined with spaces into one script:
///
///    cash echo hello
///    cash --shell bash -- 'for i in 1 2 3; do echo $i; done'
///
/// Defaults come from `~/.config/cash/config.toml`; flags override them.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Interpreter to run the script with (sh, bash, powershell/pwsh, cmd/batch, or a
    /// custom one from the config file).
    #[arg(long, short)]
    pub shell: Option<String>,

    /// Exit with the script's code without reporting a non-zero exit as an error.
    #[arg(long)]
    pub ignore_exit_code: bool,

    /// Working directory of the script. Supports `~` and `$VAR`.
    #[arg(long)]
    pub cwd: Option<String>,

    /// Extra environment variables (e.g., "KEY=VALUE").
    #[arg(long, short, value_delimiter = ',', num_args = 1..)]
    pub env: Vec<String>,

    /// Path to an alternative config file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Wait for the script to finish and print stdout/stderr at once instead of streaming.
    #[arg(long)]
    pub capture: bool,

    /// The script to run.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
    pub script: Vec<String>,
}

impl Cli {
    /// The trailing words joined into one script.
    pub fn script(&self) -> String {
        self.script.join(" ")
    }
}

/// Parses a list of "KEY=VALUE" strings into a map.
pub fn parse_key_value_pairs(pairs: &[String]) -> Result<HashMap<String, String>> {
    let mut map = HashMap::new();
    for pair in pairs {
        match pair.split_once('=') {
            Some((key, value)) => {
                map.insert(key.trim().to_string(), value.to_string());
            }
            None => {
                return Err(anyhow!(
                    "Invalid format for key-value pair: '{}'. Expected 'KEY=VALUE'.",
                    pair
                ));
            }
        }
    }
    Ok(map)
}
