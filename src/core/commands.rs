// src/core/commands.rs

//! Workflow commands: `::name key=value,...::message` lines read by the runner from stdout.

use std::{
    fmt,
    io::{self, Write},
};
use uuid::Uuid;

/// Location and title attached to `notice`, `warning` and `error` annotations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationProperties {
    /// Custom title shown above the message.
    pub title: Option<String>,
    /// Path of the file the annotation points at.
    pub file: Option<String>,
    /// Start line, 1-based.
    pub line: Option<u32>,
    /// End line, 1-based.
    pub end_line: Option<u32>,
    /// Start column, 1-based.
    pub col: Option<u32>,
    /// End column, 1-based.
    pub end_column: Option<u32>,
}

impl AnnotationProperties {
    fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let numbers = [
            ("line", self.line),
            ("endLine", self.end_line),
            ("col", self.col),
            ("endColumn", self.end_column),
        ];
        [("title", self.title.clone()), ("file", self.file.clone())]
            .into_iter()
            .chain(numbers.into_iter().map(|(k, v)| (k, v.map(|n| n.to_string()))))
            .filter_map(|(key, value)| value.map(|v| (key, v)))
            .collect()
    }
}

/// One workflow command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowCommand {
    /// Command name, written right after the leading `::`.
    pub name: String,
    /// `key=value` pairs in output order. Values are escaped when written.
    pub properties: Vec<(&'static str, String)>,
    /// Text after the second `::`. Escaped when written.
    pub message: String,
}

impl WorkflowCommand {
    /// A command with no properties.
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
            message: message.into(),
        }
    }

    /// Replaces the property list.
    pub fn with_properties(mut self, properties: Vec<(&'static str, String)>) -> Self {
        self.properties = properties;
        self
    }

    /// Writes the command followed by a newline.
    pub fn write_to(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "{self}")
    }

    /// Writes the command to stdout.
    pub fn issue(&self) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        self.write_to(&mut stdout)?;
        stdout.flush()
    }
}

impl fmt::Display for WorkflowCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "::{}", self.name)?;
        for (index, (key, value)) in self.properties.iter().enumerate() {
            let sep = if index == 0 { ' ' } else { ',' };
            write!(f, "{sep}{key}={}", escape_property(value))?;
        }
        write!(f, "::{}", escape_data(&self.message))
    }
}

/// Escapes `%`, CR and LF in a command message.
pub fn escape_data(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Escapes a property value. Adds `:` and `,` to what [`escape_data`] handles.
pub fn escape_property(value: &str) -> String {
    escape_data(value).replace(':', "%3A").replace(',', "%2C")
}

fn annotation_command(name: &str, message: &str, properties: &AnnotationProperties) -> WorkflowCommand {
    WorkflowCommand::new(name, message).with_properties(properties.to_pairs())
}

fn annotation(name: &str, message: &str, properties: &AnnotationProperties) -> io::Result<()> {
    annotation_command(name, message, properties).issue()
}

/// Prints a message only visible when step debug logging is enabled.
pub fn debug(message: &str) -> io::Result<()> {
    WorkflowCommand::new("debug", message).issue()
}

/// Emits a `notice` annotation.
pub fn notice(message: &str, properties: &AnnotationProperties) -> io::Result<()> {
    annotation("notice", message, properties)
}

/// Emits a `warning` annotation.
pub fn warning(message: &str, properties: &AnnotationProperties) -> io::Result<()> {
    annotation("warning", message, properties)
}

/// Alias of [`warning`].
pub use self::warning as warn;

/// Emits an `error` annotation. The step keeps running.
pub fn error(message: &str, properties: &AnnotationProperties) -> io::Result<()> {
    annotation("error", message, properties)
}

/// Emits an `error` annotation and exits with code 1.
pub fn fatal(message: &str, properties: &AnnotationProperties) -> ! {
    if let Err(e) = error(message, properties) {
        log::warn!("Could not emit error annotation: {}", e);
    }
    std::process::exit(1);
}

/// Starts a collapsible group in the log.
pub fn group(title: &str) -> io::Result<()> {
    WorkflowCommand::new("group", title).issue()
}

/// Closes the group opened by [`group`].
pub fn end_group() -> io::Result<()> {
    WorkflowCommand::new("endgroup", "").issue()
}

/// Hides `value` from every later log line.
pub fn add_mask(value: &str) -> io::Result<()> {
    WorkflowCommand::new("add-mask", value).issue()
}

/// Suspends command processing until [`start_commands`] is called with the returned token.
pub fn stop_commands() -> io::Result<String> {
    let token = Uuid::new_v4().to_string();
    WorkflowCommand::new("stop-commands", token.as_str()).issue()?;
    Ok(token)
}

/// Resumes command processing. `token` is the value [`stop_commands`] returned.
pub fn start_commands(token: &str) -> io::Result<()> {
    WorkflowCommand::new(token, "").issue()
}
