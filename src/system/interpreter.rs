// src/system/interpreter.rs

//! Interpreter descriptors and the registry that resolves them against `PATH`.

use crate::{
    constants::PATH_VAR,
    models::{InterpreterConfig, PlatformSupport},
};
use std::{
    collections::HashMap,
    env,
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
};

/// Immutable description of one command-line interpreter and how to hand it a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpreter {
    name: String,
    path: Option<PathBuf>,
    script_args: Vec<String>,
    platforms: PlatformSupport,
}

impl Interpreter {
    /// Builds a descriptor from an already-resolved (or missing) executable path.
    pub fn new(
        name: impl Into<String>,
        path: Option<PathBuf>,
        script_args: Vec<String>,
        platforms: PlatformSupport,
    ) -> Self {
        Self {
            name: name.into(),
            path,
            script_args,
            platforms,
        }
    }

    /// POSIX shell, invoked as `sh -c <script>`.
    pub fn sh(search: &SearchPath) -> Self {
        Self::new(
            "sh",
            search.resolve(&["sh", "sh.exe"]),
            vec!["-c".to_string()],
            PlatformSupport::Any,
        )
    }

    /// Bash, invoked as `bash -c <script>`.
    pub fn bash(search: &SearchPath) -> Self {
        Self::new(
            "bash",
            search.resolve(&["bash", "bash.exe"]),
            vec!["-c".to_string()],
            PlatformSupport::Any,
        )
    }

    /// PowerShell Core first, then Windows PowerShell, invoked with `-Command`.
    pub fn powershell(search: &SearchPath) -> Self {
        Self::new(
            "powershell",
            search.resolve(&["pwsh", "pwsh.exe", "powershell", "powershell.exe"]),
            vec!["-Command".to_string()],
            PlatformSupport::Any,
        )
    }

    /// The native Windows command processor, invoked as `cmd.exe /s <script>`.
    pub fn batch(search: &SearchPath) -> Self {
        Self::new(
            "batch",
            search.resolve(&["cmd.exe"]),
            vec!["/s".to_string()],
            PlatformSupport::Windows,
        )
    }

    /// Builds a descriptor for a custom interpreter declared in `config.toml`.
    pub fn from_config(name: &str, config: &InterpreterConfig, search: &SearchPath) -> Self {
        let candidates: Vec<&str> = config.candidates.iter().map(String::as_str).collect();
        Self::new(
            name,
            search.resolve(&candidates),
            config.args.clone(),
            config.platforms,
        )
    }

    /// Registry key, also reported as [`FinishedProcess::interpreter`](crate::FinishedProcess::interpreter).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The resolved executable, if one was found on the search path.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether this interpreter can run on `os`/`arch`.
    pub fn supports(&self, os: &str, arch: &str) -> bool {
        self.platforms.supports(os, arch)
    }

    /// An interpreter is available exactly when its executable was resolved.
    pub fn available(&self) -> bool {
        self.path.is_some()
    }

    /// Returns `[executable, ...args, script]`, or `None` when the interpreter is unavailable.
    pub fn build_exec_command(&self, script: &str) -> Option<Vec<OsString>> {
        let path = self.path.as_ref()?;
        let mut argv = Vec::with_capacity(self.script_args.len() + 2);
        argv.push(path.as_os_str().to_os_string());
        argv.extend(self.script_args.iter().map(OsString::from));
        argv.push(OsString::from(script));
        Some(argv)
    }
}

// --- Executable search ---

/// A snapshot of the executable search path.
#[derive(Debug, Clone, Default)]
pub struct SearchPath {
    dirs: Vec<PathBuf>,
}

impl SearchPath {
    /// Reads `PATH` from the environment. Relative entries are resolved against the
    /// current directory.
    pub fn from_env() -> Self {
        let cwd = env::current_dir().unwrap_or_default();
        match env::var_os(PATH_VAR) {
            Some(value) => Self::parse(&value, &cwd),
            None => Self::default(),
        }
    }

    /// Splits a `PATH`-like value with the platform separator.
    pub fn parse(value: &OsStr, cwd: &Path) -> Self {
        let dirs = env::split_paths(value)
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(|dir| if dir.is_absolute() { dir } else { cwd.join(dir) })
            .collect();
        Self { dirs }
    }

    /// A search path made of exactly `dirs`, in order.
    pub fn from_dirs(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    /// The directories searched, in priority order.
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Finds the first candidate, in priority order, that exists as an executable file in
    /// any search directory. Candidates given as absolute paths are checked directly.
    pub fn resolve(&self, candidates: &[&str]) -> Option<PathBuf> {
        for candidate in candidates {
            let candidate_path = Path::new(candidate);
            if candidate_path.is_absolute() {
                if is_executable(candidate_path) {
                    return Some(candidate_path.to_path_buf());
                }
                continue;
            }
            if let Some(found) = self
                .dirs
                .iter()
                .map(|dir| dir.join(candidate))
                .find(|path| is_executable(path))
            {
                log::trace!("Resolved '{}' to '{}'", candidate, found.display());
                return Some(found);
            }
        }
        log::debug!("None of {:?} found on the search path", candidates);
        None
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

// --- Registry ---

/// The built-in interpreters plus any custom ones, resolved once at startup.
///
/// Constructed by the host application and passed around explicitly.
#[derive(Debug, Clone)]
pub struct InterpreterRegistry {
    sh: Interpreter,
    bash: Interpreter,
    powershell: Interpreter,
    batch: Interpreter,
    custom: HashMap<String, Interpreter>,
}

impl InterpreterRegistry {
    /// Resolves the four built-in interpreters against the process `PATH`.
    pub fn discover() -> Self {
        Self::with_search_path(&SearchPath::from_env())
    }

    /// Resolves the built-ins against `search` instead of the process `PATH`.
    pub fn with_search_path(search: &SearchPath) -> Self {
        let registry = Self {
            sh: Interpreter::sh(search),
            bash: Interpreter::bash(search),
            powershell: Interpreter::powershell(search),
            batch: Interpreter::batch(search),
            custom: HashMap::new(),
        };
        log::debug!(
            "Interpreters available: {:?}",
            registry
                .iter()
                .filter(|i| i.available())
                .map(Interpreter::name)
                .collect::<Vec<_>>()
        );
        registry
    }

    /// Adds the interpreters declared in `config.toml`. A custom entry shadows a built-in
    /// of the same name.
    pub fn extend_from_config(
        &mut self,
        interpreters: &HashMap<String, InterpreterConfig>,
        search: &SearchPath,
    ) {
        for (name, config) in interpreters {
            self.custom.insert(
                name.clone(),
                Interpreter::from_config(name, config, search),
            );
        }
    }

    /// POSIX `sh`.
    pub fn sh(&self) -> &Interpreter {
        &self.sh
    }

    /// `bash`.
    pub fn bash(&self) -> &Interpreter {
        &self.bash
    }

    /// `pwsh`, falling back to Windows PowerShell.
    pub fn powershell(&self) -> &Interpreter {
        &self.powershell
    }

    /// `cmd.exe`. Windows only.
    pub fn batch(&self) -> &Interpreter {
        &self.batch
    }

    /// Looks an interpreter up by name. `cmd` and `pwsh` are accepted as aliases.
    pub fn get(&self, name: &str) -> Option<&Interpreter> {
        if let Some(custom) = self.custom.get(name) {
            return Some(custom);
        }
        match name {
            "sh" => Some(&self.sh),
            "bash" => Some(&self.bash),
            "powershell" | "pwsh" => Some(&self.powershell),
            "batch" | "cmd" => Some(&self.batch),
            _ => None,
        }
    }

    /// The interpreter used when none is configured: `batch` on Windows, `sh` elsewhere.
    pub fn default_interpreter(&self) -> &Interpreter {
        if cfg!(target_os = "windows") {
            &self.batch
        } else {
            &self.sh
        }
    }

    /// Built-ins first, then custom interpreters in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Interpreter> {
        [&self.sh, &self.bash, &self.powershell, &self.batch]
            .into_iter()
            .chain(self.custom.values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[cfg(unix)]
    fn make_executable(dir: &Path, name: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_unavailable_interpreter_has_no_command() {
        let search = SearchPath::from_dirs(Vec::new());
        let sh = Interpreter::sh(&search);
        assert!(!sh.available());
        assert!(sh.path().is_none());
        assert!(sh.build_exec_command("echo hi").is_none());
    }

    #[test]
    fn test_argument_vectors() {
        let sh = Interpreter::new("sh", Some("/bin/sh".into()), vec!["-c".into()], PlatformSupport::Any);
        let argv = sh.build_exec_command("echo hi").unwrap();
        assert_eq!(argv, vec![OsString::from("/bin/sh"), "-c".into(), "echo hi".into()]);

        let ps = Interpreter::new(
            "powershell",
            Some("/usr/bin/pwsh".into()),
            vec!["-Command".into()],
            PlatformSupport::Any,
        );
        assert_eq!(ps.build_exec_command("ls").unwrap()[1], OsString::from("-Command"));

        let batch = Interpreter::new(
            "batch",
            Some("C:\\Windows\\cmd.exe".into()),
            vec!["/s".into()],
            PlatformSupport::Windows,
        );
        assert_eq!(batch.build_exec_command("dir").unwrap()[1], OsString::from("/s"));
    }

    #[test]
    fn test_batch_is_windows_only() {
        let batch = Interpreter::batch(&SearchPath::default());
        assert!(batch.supports("windows", "x86_64"));
        assert!(!batch.supports("linux", "x86_64"));
        assert!(!batch.supports("macos", "aarch64"));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_respects_candidate_priority() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        // `powershell` sits in an earlier directory than `pwsh`, but `pwsh` has priority.
        make_executable(first.path(), "powershell");
        let pwsh = make_executable(second.path(), "pwsh");

        let search = SearchPath::from_dirs(vec![first.path().into(), second.path().into()]);
        let interpreter = Interpreter::powershell(&search);
        assert_eq!(interpreter.path(), Some(pwsh.as_path()));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_skips_non_executable_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bash"), "not executable").unwrap();
        let search = SearchPath::from_dirs(vec![dir.path().into()]);
        assert!(search.resolve(&["bash"]).is_none());
    }

    #[test]
    fn test_parse_resolves_relative_entries_against_cwd() {
        let joined = env::join_paths(["bin", "/usr/bin"]).unwrap();
        let search = SearchPath::parse(&joined, Path::new("/work"));
        assert_eq!(
            search.dirs(),
            &[PathBuf::from("/work").join("bin"), PathBuf::from("/usr/bin")]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_registry_lookup_and_custom_entries() {
        let dir = TempDir::new().unwrap();
        make_executable(dir.path(), "sh");
        let zsh = make_executable(dir.path(), "zsh");
        let search = SearchPath::from_dirs(vec![dir.path().into()]);

        let mut registry = InterpreterRegistry::with_search_path(&search);
        assert!(registry.sh().available());
        assert!(!registry.bash().available());
        assert_eq!(registry.get("cmd").map(Interpreter::name), Some("batch"));
        assert!(registry.get("fish").is_none());

        let mut custom = HashMap::new();
        custom.insert(
            "zsh".to_string(),
            InterpreterConfig {
                candidates: vec!["zsh".into()],
                args: vec!["-c".into()],
                platforms: PlatformSupport::Unix,
            },
        );
        registry.extend_from_config(&custom, &search);
        let found = registry.get("zsh").unwrap();
        assert_eq!(found.path(), Some(zsh.as_path()));
        assert_eq!(registry.iter().count(), 5);
    }
}
