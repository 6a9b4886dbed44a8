// src/core/config_loader.rs

//! # Config Loader
//!
//! Loads `config.toml` from the cash config directory and turns it into an
//! `InterpreterRegistry` and a ready-to-use `Session`.

use crate::{
    constants::{CASH_CONFIG_DIR, CONFIG_FILENAME},
    models::{CashConfig, SpawnOptions},
    system::{
        interpreter::{InterpreterRegistry, SearchPath},
        session::{Session, SessionError},
    },
};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Failures while loading `config.toml` or building a session from it.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The platform has no per-user config directory.
    #[error("Could not find system config directory.")]
    ConfigDirNotFound,
    /// The config file exists but could not be read or written.
    #[error("Could not access config file '{path}': {source}")]
    Io {
        /// File being read or written.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The config file is not valid TOML for [`CashConfig`](crate::models::CashConfig).
    #[error("Failed to parse config.toml: {0}")]
    TomlParse(#[from] toml::de::Error),
    /// The config could not be written back as TOML.
    #[error("Failed to serialize config to TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    /// `~` or `$VAR` in the working directory could not be expanded.
    #[error("Failed to expand working directory '{template}': {message}")]
    Expand {
        /// The unexpanded value.
        template: String,
        /// What shellexpand reported.
        message: String,
    },
    /// The configured interpreter cannot back a session.
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Returns the path to `config.toml` (`~/.config/cash/config.toml` on Linux).
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join(CASH_CONFIG_DIR).join(CONFIG_FILENAME))
        .ok_or(ConfigError::ConfigDirNotFound)
}

/// Reads the configuration at `path`. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<CashConfig, ConfigError> {
    if !path.exists() {
        log::debug!("No config at '{}', using defaults", path.display());
        return Ok(CashConfig::default());
    }
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

/// Writes `config` to `path`, creating the parent directory when needed.
pub fn save_config(path: &Path, config: &CashConfig) -> Result<(), ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let toml_string = toml::to_string_pretty(config)?;
    fs::write(path, toml_string).map_err(io_err)
}

impl CashConfig {
    /// Spawn options described by this configuration. The working directory template
    /// is expanded (`~`, `$VAR`) and simplified.
    pub fn spawn_options(&self) -> Result<SpawnOptions, ConfigError> {
        let cwd = match &self.cwd {
            Some(template) => {
                let expanded =
                    shellexpand::full(template).map_err(|e| ConfigError::Expand {
                        template: template.clone(),
                        message: e.to_string(),
                    })?;
                Some(dunce::simplified(Path::new(expanded.as_ref())).to_path_buf())
            }
            None => None,
        };
        Ok(SpawnOptions {
            cwd,
            env: self.env.clone(),
            ..SpawnOptions::default()
        })
    }

    /// Built-in interpreters resolved against `search`, plus the custom ones declared here.
    pub fn registry(&self, search: &SearchPath) -> InterpreterRegistry {
        let mut registry = InterpreterRegistry::with_search_path(search);
        registry.extend_from_config(&self.interpreters, search);
        registry
    }

    /// A session using the configured interpreter (or the platform default), spawn
    /// options and exit-code tolerance.
    pub fn session(&self, registry: &InterpreterRegistry) -> Result<Session, ConfigError> {
        let interpreter = match &self.interpreter {
            Some(name) => registry
                .get(name)
                .ok_or_else(|| SessionError::UnknownInterpreter(name.clone()))?,
            None => registry.default_interpreter(),
        };
        Ok(Session::new(interpreter)?
            .with_spawn_options(self.spawn_options()?)
            .with_ignore_exit_code(self.ignore_exit_code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, CashConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILENAME);
        let mut config = CashConfig {
            interpreter: Some("bash".into()),
            ignore_exit_code: true,
            ..CashConfig::default()
        };
        config.env.insert("CI".into(), "1".into());

        save_config(&path, &config).unwrap();
        assert_eq!(load_config(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(&path, "interpreter = [").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_spawn_options_expand_cwd() {
        let config = CashConfig {
            cwd: Some("/tmp/./work".into()),
            ..CashConfig::default()
        };
        let options = config.spawn_options().unwrap();
        assert!(options.cwd.unwrap().starts_with("/tmp"));

        let bad = CashConfig {
            cwd: Some("$CASH_SURELY_UNDEFINED_VARIABLE/x".into()),
            ..CashConfig::default()
        };
        assert!(matches!(bad.spawn_options(), Err(ConfigError::Expand { .. })));
    }

    #[test]
    fn test_unknown_interpreter_is_reported() {
        let config = CashConfig {
            interpreter: Some("fish".into()),
            ..CashConfig::default()
        };
        let registry = config.registry(&SearchPath::default());
        let err = config.session(&registry).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Session(SessionError::UnknownInterpreter(name)) if name == "fish"
        ));
    }
}
