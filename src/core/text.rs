// src/core/text.rs

//! Script text helpers: literal interpolation, quoting and indentation trimming.

use lazy_static::lazy_static;
use regex::Regex;
use std::fmt::Display;

lazy_static! {
    static ref LEADING_INDENT: Regex = Regex::new(r"^( +|\t+)").expect("valid indent regex");
}

/// Interleaves literal parts with stringified values:
/// `literals[0] + values[0] + literals[1] + ... `.
///
/// Values are inserted verbatim. A missing trailing literal counts as empty.
pub fn raw_string(literals: &[&str], values: &[&dyn Display]) -> String {
    let mut out = literals.first().copied().unwrap_or_default().to_string();
    for (index, value) in values.iter().enumerate() {
        out.push_str(&value.to_string());
        out.push_str(literals.get(index + 1).copied().unwrap_or_default());
    }
    out
}

/// Quotes a value for safe interpolation into a POSIX shell script.
pub fn quote(value: &str) -> String {
    shlex::try_quote(value)
        .map(|quoted| quoted.into_owned())
        // Only NUL bytes are rejected; they cannot appear in a shell word anyway.
        .unwrap_or_else(|_| format!("'{}'", value.replace('\0', "").replace('\'', "'\\''")))
}

/// Removes the common leading indentation of a block of text.
///
/// Leading and trailing runs of line breaks are stripped, the shortest run of spaces or
/// tabs that starts a line is removed from every line that starts with it, and each line
/// loses its trailing whitespace. Text without indentation is only stripped of the
/// surrounding line breaks.
pub fn trim_indent(content: &str) -> String {
    let text = content
        .trim_start_matches(['\r', '\n'])
        .trim_end_matches(['\r', '\n']);

    let smallest = text
        .split('\n')
        .filter_map(|line| LEADING_INDENT.find(line).map(|m| m.as_str()))
        .min_by_key(|indent| indent.len());

    match smallest {
        None => text.to_string(),
        Some(indent) => text
            .split('\n')
            .map(|line| line.strip_prefix(indent).unwrap_or(line).trim_end())
            .collect::<Vec<_>>()
            .join("\n"),
    }
}
