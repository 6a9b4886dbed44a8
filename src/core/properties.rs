// src/core/properties.rs

//! Reading and writing env-file properties (`GITHUB_ENV`, `GITHUB_OUTPUT`).
//!
//! Two entry forms are understood:
//!
//! ```text
//! key=single line value
//! key<<DELIMITER
//! multi
//! line
//! DELIMITER
//! ```

use crate::constants::{GITHUB_ENV, GITHUB_OUTPUT};
use lazy_static::lazy_static;
use regex::Regex;
use std::{
    collections::BTreeMap,
    ffi::OsString,
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use thiserror::Error;
use uuid::Uuid;

lazy_static! {
    static ref ENTRY_SEPARATOR: Regex = Regex::new(r"=|<<").expect("valid separator regex");
}

/// Key/value pairs, ordered by key.
pub type Properties = BTreeMap<String, String>;

/// Failures reading or writing a properties file.
#[derive(Error, Debug)]
pub enum PropertiesError {
    /// A heredoc entry never reached its delimiter.
    #[error("Error parsing properties when reading '{key}': unexpected EOF")]
    UnexpectedEof {
        /// Key of the unterminated entry.
        key: String,
    },
    /// The variable naming the properties file is not set.
    #[error("Missing environment variable '{0}'")]
    MissingVariable(String),
    /// Reading or writing the properties file failed.
    #[error("Could not access properties file '{path}': {source}")]
    Io {
        /// The properties file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> PropertiesError + '_ {
    move |source| PropertiesError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Parses env-file content. Lines without a separator are skipped.
///
/// # Errors
/// `UnexpectedEof` when a heredoc entry never sees its closing delimiter.
pub fn parse_properties(data: &str) -> Result<Properties, PropertiesError> {
    let mut properties = Properties::new();
    let mut lines = data.lines();

    while let Some(line) = lines.next() {
        let Some(separator) = ENTRY_SEPARATOR.find(line) else {
            continue;
        };
        let key = line.get(..separator.start()).unwrap_or_default().to_string();
        let rest = line.get(separator.end()..).unwrap_or_default();

        if separator.as_str() == "=" {
            properties.insert(key, rest.to_string());
            continue;
        }

        let mut value = Vec::new();
        let mut terminated = false;
        for body_line in lines.by_ref() {
            if body_line == rest {
                terminated = true;
                break;
            }
            value.push(body_line);
        }
        if !terminated {
            return Err(PropertiesError::UnexpectedEof { key });
        }
        properties.insert(key, value.join("\n"));
    }

    Ok(properties)
}

fn stringify_entry(key: &str, value: &str) -> String {
    if !value.contains('\n') {
        return format!("{key}={value}\n");
    }
    let delimiter = Uuid::new_v4();
    format!("{key}<<{delimiter}\n{value}\n{delimiter}\n")
}

/// Serializes properties, switching to the heredoc form for multi-line values.
pub fn stringify_properties(properties: &Properties) -> String {
    properties
        .iter()
        .map(|(key, value)| stringify_entry(key, value))
        .collect()
}

/// Parses the properties stored in `path`.
pub fn read_properties_file(path: &Path) -> Result<Properties, PropertiesError> {
    let content = fs::read_to_string(path).map_err(io_error(path))?;
    parse_properties(&content)
}

/// Replaces the content of `path` with `properties`.
pub fn save_properties_file(path: &Path, properties: &Properties) -> Result<(), PropertiesError> {
    fs::write(path, stringify_properties(properties)).map_err(io_error(path))
}

/// Appends `properties` to `path`, creating the file and its parent directories if needed.
pub fn append_properties_file(path: &Path, properties: &Properties) -> Result<(), PropertiesError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error(path))?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_error(path))?;
    file.write_all(stringify_properties(properties).as_bytes())
        .map_err(io_error(path))
}

// --- Env-file variants ---

/// The file named by the environment variable `key`.
pub fn env_file(key: &str) -> Result<PathBuf, PropertiesError> {
    env_file_from(key, std::env::var_os(key))
}

fn env_file_from(key: &str, value: Option<OsString>) -> Result<PathBuf, PropertiesError> {
    value
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| PropertiesError::MissingVariable(key.to_string()))
}

/// Reads the properties file named by the variable `key`.
pub fn read_env_file(key: &str) -> Result<Properties, PropertiesError> {
    read_properties_file(&env_file(key)?)
}

/// Overwrites the properties file named by `key`.
pub fn save_env_file(key: &str, properties: &Properties) -> Result<(), PropertiesError> {
    save_properties_file(&env_file(key)?, properties)
}

/// Appends to the properties file named by `key`.
pub fn append_env_file(key: &str, properties: &Properties) -> Result<(), PropertiesError> {
    append_properties_file(&env_file(key)?, properties)
}

/// Variables exported to later steps through `GITHUB_ENV`.
pub fn github_environment() -> Result<Properties, PropertiesError> {
    read_env_file(GITHUB_ENV)
}

/// Step outputs recorded in `GITHUB_OUTPUT`.
pub fn github_outputs() -> Result<Properties, PropertiesError> {
    read_env_file(GITHUB_OUTPUT)
}

/// Exports `key` to the environment of later workflow steps.
///
/// The current process environment is left untouched; pass the value through
/// `SpawnOptions::env` to make it visible to children of this process.
pub fn set_environment_variable(key: &str, value: &str) -> Result<(), PropertiesError> {
    append_env_file(GITHUB_ENV, &Properties::from([(key.to_string(), value.to_string())]))
}

/// Publishes a step output.
pub fn set_output(key: &str, value: &str) -> Result<(), PropertiesError> {
    append_env_file(GITHUB_OUTPUT, &Properties::from([(key.to_string(), value.to_string())]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parses_single_and_multiline_entries() {
        let parsed = parse_properties("foo=bar\nbaz<<delimiter\ndaz\ndelimiter\n").unwrap();
        assert_eq!(parsed.get("foo").map(String::as_str), Some("bar"));
        assert_eq!(parsed.get("baz").map(String::as_str), Some("daz"));
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn test_value_may_contain_separators() {
        let parsed = parse_properties("url=a=b<<c\n").unwrap();
        assert_eq!(parsed.get("url").map(String::as_str), Some("a=b<<c"));
    }

    #[test]
    fn test_heredoc_keeps_inner_lines() {
        let parsed = parse_properties("text<<EOF\nline 1\n\nline=3\nEOF\nafter=1").unwrap();
        assert_eq!(parsed.get("text").map(String::as_str), Some("line 1\n\nline=3"));
        assert_eq!(parsed.get("after").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_unterminated_heredoc_names_the_key() {
        let err = parse_properties("ok=1\nbroken<<EOF\nnever closed\n").unwrap_err();
        assert!(matches!(&err, PropertiesError::UnexpectedEof { key } if key == "broken"));
        assert!(err.to_string().contains("'broken'"));
    }

    #[test]
    fn test_stringify_uses_heredoc_for_multiline() {
        let properties = Properties::from([
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "x\ny".to_string()),
        ]);
        let text = stringify_properties(&properties);
        assert!(text.starts_with("a=1\nb<<"));
        assert_eq!(parse_properties(&text).unwrap(), properties);
    }

    #[test]
    fn test_append_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deep").join("env");

        append_properties_file(&path, &Properties::from([("A".into(), "1".into())])).unwrap();
        append_properties_file(&path, &Properties::from([("B".into(), "2".into())])).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "A=1\nB=2\n");
        let parsed = read_properties_file(&path).unwrap();
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn test_save_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out");
        fs::write(&path, "old=1\n").unwrap();

        save_properties_file(&path, &Properties::from([("new".into(), "2".into())])).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new=2\n");
    }

    #[test]
    fn test_missing_env_variable() {
        let err = env_file_from(GITHUB_OUTPUT, None).unwrap_err();
        assert_eq!(err.to_string(), "Missing environment variable 'GITHUB_OUTPUT'");
        assert!(env_file_from(GITHUB_ENV, Some(OsString::new())).is_err());
        assert_eq!(
            env_file_from(GITHUB_ENV, Some("/tmp/env".into())).unwrap(),
            PathBuf::from("/tmp/env")
        );
    }

    #[test]
    fn test_reading_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = read_properties_file(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, PropertiesError::Io { .. }));
    }
}
