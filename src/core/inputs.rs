// src/core/inputs.rs

//! Action inputs, read from `INPUT_<NAME>` variables.

use crate::constants::INPUT_PREFIX;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use thiserror::Error;

lazy_static! {
    static ref LIST_SEPARATOR: Regex = Regex::new(r"[,\s]+").expect("valid list regex");
    static ref INTEGER_PREFIX: Regex = Regex::new(r"^\s*[+-]?\d+").expect("valid integer regex");
}

/// Words accepted by the boolean parsers, with the value they stand for.
pub const BOOLEAN_VALUES: &[(&str, bool)] = &[
    ("true", true),
    ("y", true),
    ("yes", true),
    ("on", true),
    ("enable", true),
    ("enabled", true),
    ("active", true),
    ("activated", true),
    ("false", false),
    ("n", false),
    ("no", false),
    ("off", false),
    ("disable", false),
    ("disabled", false),
    ("inactive", false),
];

/// Why a raw input value was rejected by a parser.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct InvalidValue(pub String);

/// Why an input could not be read.
#[derive(Error, Debug)]
pub enum InputError {
    /// The input is required but unset or empty.
    #[error("Missing required input '{0}'")]
    Missing(String),
    /// The input is set but its parser rejected it.
    #[error("Unable to parse input '{name}'")]
    Parse {
        /// Input name as the caller spelled it.
        name: String,
        /// The parser's complaint.
        #[source]
        source: InvalidValue,
    },
}

/// Name of the variable carrying input `name`: spaces become `_`, letters are upper-cased.
pub fn input_key(name: &str) -> String {
    format!("{}{}", INPUT_PREFIX, name.replace(' ', "_").to_uppercase())
}

/// A snapshot of the environment that inputs are looked up in.
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    vars: HashMap<String, String>,
}

impl Inputs {
    /// Snapshot of the current process environment.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Builds the lookup table from explicit pairs, as in tests.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// The unparsed value of input `name`.
    pub fn raw(&self, name: &str) -> Option<&str> {
        self.vars.get(&input_key(name)).map(String::as_str)
    }

    /// Reads a required input as text.
    pub fn get(&self, name: &str) -> Result<String, InputError> {
        self.required(name, string)
    }

    /// Reads a required input and converts it with `parser`.
    ///
    /// # Errors
    /// `Missing` when the variable is absent, `Parse` when `parser` rejects the value.
    pub fn required<T, F>(&self, name: &str, parser: F) -> Result<T, InputError>
    where
        F: Fn(&str) -> Result<T, InvalidValue>,
    {
        self.optional(name, parser)?
            .ok_or_else(|| InputError::Missing(name.to_string()))
    }

    /// Reads an optional input. An absent variable yields `None`.
    pub fn optional<T, F>(&self, name: &str, parser: F) -> Result<Option<T>, InputError>
    where
        F: Fn(&str) -> Result<T, InvalidValue>,
    {
        let Some(value) = self.raw(name) else {
            return Ok(None);
        };
        parser(value).map(Some).map_err(|source| {
            log::debug!("Input '{}' rejected: {}", name, source);
            InputError::Parse {
                name: name.to_string(),
                source,
            }
        })
    }
}

// --- Parsers ---

/// Accepts any value unchanged.
pub fn string(value: &str) -> Result<String, InvalidValue> {
    Ok(value.to_string())
}

/// A decimal number. Surrounding whitespace is ignored and a blank value reads as 0.
pub fn number(value: &str) -> Result<f64, InvalidValue> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|n| !n.is_nan())
        .ok_or_else(|| InvalidValue("Could not parse number".into()))
}

/// The leading integer of `value`; trailing characters are ignored (`"42px"` is 42).
pub fn integer(value: &str) -> Result<i64, InvalidValue> {
    INTEGER_PREFIX
        .find(value)
        .and_then(|m| m.as_str().trim_start().parse::<i64>().ok())
        .ok_or_else(|| InvalidValue("Could not parse integer".into()))
}

fn lookup_boolean(value: &str) -> Option<bool> {
    BOOLEAN_VALUES
        .iter()
        .find(|(word, _)| *word == value)
        .map(|(_, b)| *b)
}

/// True only for the truthy words of [`BOOLEAN_VALUES`]; anything else is false.
pub fn boolean(value: &str) -> Result<bool, InvalidValue> {
    Ok(lookup_boolean(value).unwrap_or(false))
}

/// Like [`boolean`], but rejects words outside [`BOOLEAN_VALUES`].
pub fn strict_boolean(value: &str) -> Result<bool, InvalidValue> {
    lookup_boolean(value).ok_or_else(|| {
        let choices = BOOLEAN_VALUES
            .iter()
            .map(|(word, _)| format!("'{word}'"))
            .collect::<Vec<_>>()
            .join(", ");
        InvalidValue(format!(
            "Invalid boolean value '{value}', possible values are {choices}"
        ))
    })
}

/// Splits a value on commas and whitespace and parses every non-empty item with `item`.
pub fn list_of<T, F>(item: F) -> impl Fn(&str) -> Result<Vec<T>, InvalidValue>
where
    F: Fn(&str) -> Result<T, InvalidValue>,
{
    move |value: &str| {
        LIST_SEPARATOR
            .split(value)
            .filter(|piece| !piece.is_empty())
            .map(&item)
            .collect()
    }
}
