// src/models.rs

//! Plain data shared by the session, the process and the config file.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

// --- PLATFORM MODELS ---

/// The operating system / architecture pair interpreters are checked against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Platform {
    /// OS name as in `std::env::consts::OS` ("linux", "windows", ...).
    pub os: String,
    /// Architecture as in `std::env::consts::ARCH`.
    pub arch: String,
}

impl Platform {
    /// The platform this binary was compiled for.
    pub fn current() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        }
    }

    /// An explicit platform, for checks against a system other than the host.
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }
}

/// Declarative platform predicate for an interpreter.
///
/// Kept as data rather than a closure so custom interpreters can be declared in
/// `config.toml`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PlatformSupport {
    /// Every platform.
    #[default]
    Any,
    /// Windows only.
    Windows,
    /// Anything but Windows.
    Unix,
}

impl PlatformSupport {
    /// Whether an interpreter with this predicate can run on `os`/`arch`.
    pub fn supports(self, os: &str, _arch: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Windows => os == "windows",
            Self::Unix => os != "windows",
        }
    }
}

// --- SPAWN CONFIGURATION ---

/// How one of the child's standard streams is wired.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StdioMode {
    /// Captured through a pipe. The matching channel exists on the `RunningProcess`.
    #[default]
    Piped,
    /// Shared with the parent process. No channel is created.
    Inherit,
    /// Connected to the null device. No channel is created.
    Null,
}

impl StdioMode {
    pub(crate) fn to_stdio(self) -> std::process::Stdio {
        match self {
            Self::Piped => std::process::Stdio::piped(),
            Self::Inherit => std::process::Stdio::inherit(),
            Self::Null => std::process::Stdio::null(),
        }
    }
}

/// Options applied to every process a `Session` spawns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpawnOptions {
    /// Working directory of the child. Inherits the parent's when unset.
    pub cwd: Option<PathBuf>,
    /// Variables added on top of the inherited environment.
    pub env: HashMap<String, String>,
    /// Start from an empty environment instead of the parent's.
    pub env_clear: bool,
    /// Wiring of the child's stdin.
    pub stdin: StdioMode,
    /// Wiring of the child's stdout.
    pub stdout: StdioMode,
    /// Wiring of the child's stderr.
    pub stderr: StdioMode,
}

// --- PROCESS RESULT ---

/// The immutable result of a completed child process.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FinishedProcess {
    /// Name of the interpreter that ran the script.
    pub interpreter: String,
    /// Stdout and stderr in arrival order.
    pub stdall: String,
    /// Everything written to stderr.
    pub stderr: String,
    /// Everything written to stdout.
    pub stdout: String,
    /// Exit code. A process terminated by a signal reports 0.
    pub code: i32,
}

impl FinishedProcess {
    /// True when the exit code is zero.
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

// --- CONFIGURATION FILE MODELS ---

/// A custom interpreter declared in `config.toml`.
///
/// ```toml
/// [interpreters.zsh]
/// candidates = ["zsh"]
/// args = ["-c"]
/// platforms = "unix"
/// ```
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct InterpreterConfig {
    /// Executable names tried in order against the search path. An absolute path is used as is.
    pub candidates: Vec<String>,
    /// Arguments placed between the executable and the script.
    #[serde(default)]
    pub args: Vec<String>,
    /// Platforms the interpreter runs on. Defaults to all.
    #[serde(default)]
    pub platforms: PlatformSupport,
}

/// Represents the deserialized structure of `config.toml`.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct CashConfig {
    /// Name of the interpreter selected for new sessions (e.g. "bash").
    pub interpreter: Option<String>,
    /// Settle non-zero exits successfully.
    #[serde(default)]
    pub ignore_exit_code: bool,
    /// Working directory template. Supports `~` and `$VAR`.
    pub cwd: Option<String>,
    /// Variables added to every spawned process.
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Custom interpreters keyed by name.
    #[serde(default)]
    pub interpreters: HashMap<String, InterpreterConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_support_predicates() {
        assert!(PlatformSupport::Any.supports("linux", "x86_64"));
        assert!(PlatformSupport::Windows.supports("windows", "x86_64"));
        assert!(!PlatformSupport::Windows.supports("macos", "aarch64"));
        assert!(PlatformSupport::Unix.supports("linux", "aarch64"));
        assert!(!PlatformSupport::Unix.supports("windows", "x86"));
    }

    #[test]
    fn test_config_deserializes_custom_interpreters() {
        let content = r#"
            interpreter = "zsh"
            ignore_exit_code = true

            [env]
            CI = "true"

            [interpreters.zsh]
            candidates = ["zsh"]
            args = ["-c"]
            platforms = "unix"
        "#;
        let config: CashConfig = toml::from_str(content).unwrap();
        assert_eq!(config.interpreter.as_deref(), Some("zsh"));
        assert!(config.ignore_exit_code);
        assert_eq!(config.env.get("CI").map(String::as_str), Some("true"));
        let zsh = config.interpreters.get("zsh").unwrap();
        assert_eq!(zsh.candidates, vec!["zsh".to_string()]);
        assert_eq!(zsh.platforms, PlatformSupport::Unix);
    }

    #[test]
    fn test_finished_process_equality_is_by_value() {
        let a = FinishedProcess {
            interpreter: "sh".into(),
            stdall: "hi\n".into(),
            stderr: String::new(),
            stdout: "hi\n".into(),
            code: 0,
        };
        let b = a.clone();
        assert_eq!(a, b);
        assert!(a.success());
    }
}
