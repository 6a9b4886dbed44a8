// src/system/session.rs

//! Sessions bind an interpreter to spawn options and turn scripts into processes.

use crate::{
    core::text,
    models::{Platform, SpawnOptions},
    system::{exit::ExitPolicy, interpreter::Interpreter, process::RunningProcess},
};
use std::{fmt::Display, io};
use thiserror::Error;
use tokio::process::Command;

/// Why a session could not be built or a script could not be started.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The interpreter's platform predicate rejects the session platform.
    #[error("Interpreter '{name}' is not supported for {os} ({arch}).")]
    UnsupportedPlatform {
        /// Interpreter name.
        name: String,
        /// Session OS.
        os: String,
        /// Session architecture.
        arch: String,
    },
    /// None of the interpreter's executables was found on the search path.
    #[error("Interpreter '{0}' is not available.")]
    InterpreterUnavailable(String),
    /// No built-in or configured interpreter has this name.
    #[error("Interpreter '{0}' is not defined.")]
    UnknownInterpreter(String),
    /// The OS refused to start the child.
    #[error("Could not spawn '{program}': {source}")]
    Spawn {
        /// The interpreter executable.
        program: String,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}

/// Holds the selected interpreter and the spawn policy, and launches scripts with them.
///
/// ```no_run
/// # async fn demo() -> anyhow::Result<()> {
/// use cash::{InterpreterRegistry, Session};
///
/// let registry = InterpreterRegistry::discover();
/// let session = Session::new(registry.sh())?;
/// let finished = session.exec("echo hi")?.await?;
/// assert_eq!(finished.stdout, "hi\n");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Session {
    interpreter: Interpreter,
    platform: Platform,
    /// Applied to every process this session spawns.
    pub spawn_options: SpawnOptions,
    /// When set, positive exit codes settle successfully instead of failing.
    pub ignore_exit_code: bool,
}

impl Session {
    /// Creates a session for the current platform.
    ///
    /// # Errors
    /// Fails like [`Session::select_interpreter`].
    pub fn new(interpreter: &Interpreter) -> Result<Self, SessionError> {
        Self::for_platform(interpreter, Platform::current())
    }

    /// Creates a session that validates interpreters against `platform` instead of the
    /// host.
    pub fn for_platform(interpreter: &Interpreter, platform: Platform) -> Result<Self, SessionError> {
        validate(interpreter, &platform)?;
        Ok(Self {
            interpreter: interpreter.clone(),
            platform,
            spawn_options: SpawnOptions::default(),
            ignore_exit_code: false,
        })
    }

    /// Replaces the spawn options.
    pub fn with_spawn_options(mut self, spawn_options: SpawnOptions) -> Self {
        self.spawn_options = spawn_options;
        self
    }

    /// Sets [`Session::ignore_exit_code`].
    pub fn with_ignore_exit_code(mut self, ignore_exit_code: bool) -> Self {
        self.ignore_exit_code = ignore_exit_code;
        self
    }

    /// The selected interpreter.
    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    /// The platform interpreters are validated against.
    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Swaps the interpreter. The current one stays selected when validation fails.
    ///
    /// # Errors
    /// `UnsupportedPlatform` if the interpreter rejects this platform,
    /// `InterpreterUnavailable` if its executable was not found.
    pub fn select_interpreter(&mut self, interpreter: &Interpreter) -> Result<(), SessionError> {
        validate(interpreter, &self.platform)?;
        log::debug!("Selected interpreter '{}'", interpreter.name());
        self.interpreter = interpreter.clone();
        Ok(())
    }

    /// Spawns the interpreter with `script` and returns immediately.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// `Spawn` if the OS refuses to start the interpreter.
    pub fn exec(&self, script: &str) -> Result<RunningProcess, SessionError> {
        let name = self.interpreter.name();
        let argv = self
            .interpreter
            .build_exec_command(script)
            .ok_or_else(|| SessionError::InterpreterUnavailable(name.to_string()))?;
        let mut argv = argv.into_iter();
        let program = argv
            .next()
            .ok_or_else(|| SessionError::InterpreterUnavailable(name.to_string()))?;

        let options = &self.spawn_options;
        let mut command = Command::new(&program);
        command
            .args(argv)
            .stdin(options.stdin.to_stdio())
            .stdout(options.stdout.to_stdio())
            .stderr(options.stderr.to_stdio());
        if let Some(cwd) = &options.cwd {
            command.current_dir(dunce::simplified(cwd));
        }
        if options.env_clear {
            command.env_clear();
        }
        command.envs(&options.env);

        log::debug!("Spawning '{}' via '{}'", name, program.to_string_lossy());
        log::trace!("Script: {}", script);
        let child = command.spawn().map_err(|source| SessionError::Spawn {
            program: program.to_string_lossy().into_owned(),
            source,
        })?;

        Ok(RunningProcess::new(
            child,
            name.to_string(),
            ExitPolicy::new(self.ignore_exit_code),
        ))
    }

    /// Interleaves `literals` and `values` into one script and runs it.
    ///
    /// Values are inserted verbatim, without quoting. Use [`text::quote`] on untrusted
    /// values.
    pub fn exec_parts(
        &self,
        literals: &[&str],
        values: &[&dyn Display],
    ) -> Result<RunningProcess, SessionError> {
        self.exec(&text::raw_string(literals, values))
    }
}

fn validate(interpreter: &Interpreter, platform: &Platform) -> Result<(), SessionError> {
    if !interpreter.supports(&platform.os, &platform.arch) {
        return Err(SessionError::UnsupportedPlatform {
            name: interpreter.name().to_string(),
            os: platform.os.clone(),
            arch: platform.arch.clone(),
        });
    }
    if !interpreter.available() {
        return Err(SessionError::InterpreterUnavailable(
            interpreter.name().to_string(),
        ));
    }
    Ok(())
}
