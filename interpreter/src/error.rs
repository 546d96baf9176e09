use std::fmt;
use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};
use kmd::parser::ParseError;

/// Errors raised while a pipeline runs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeError {
    #[error("type error in '{command}': expected {expected}, got {got}")]
    TypeError {
        command: String,
        expected: String,
        got: String,
    },
    #[error("expected list input to map, got {got}")]
    ExpectedList { got: String },
    #[error("{command}: {message}")]
    Command { command: String, message: String },
    #[error("mapped branch did not complete: {0}")]
    Task(String),
    #[error("{0}")]
    Custom(String),
}

impl RuntimeError {
    pub fn type_error(command: &str, expected: &str, got: &str) -> Self {
        RuntimeError::TypeError {
            command: command.to_string(),
            expected: expected.to_string(),
            got: got.to_string(),
        }
    }

    pub fn command(command: &str, message: impl Into<String>) -> Self {
        RuntimeError::Command {
            command: command.to_string(),
            message: message.into(),
        }
    }
}

/// A command factory rejecting its argument.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("'{command}' requires an argument")]
    MissingArgument { command: String },
    #[error("invalid argument for '{command}': {message}")]
    InvalidArgument { command: String, message: String },
}

/// Compile errors with source location information.
#[derive(Debug, Clone)]
pub struct CompileError {
    pub message: String,
    pub span: Range<usize>,
    pub file_id: usize,
    pub notes: Vec<String>,
}

impl CompileError {
    pub fn new(message: impl Into<String>, span: Range<usize>, file_id: usize) -> Self {
        CompileError {
            message: message.into(),
            span,
            file_id,
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        Diagnostic::new(Severity::Error)
            .with_message(&self.message)
            .with_labels(vec![Label::primary(self.file_id, self.span.clone())])
            .with_notes(self.notes.clone())
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CompileError {}

/// Any failure of compiling or running a script.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("{}", join_messages(.0))]
    Parse(Vec<ParseError>),
    #[error("{}", join_messages(.0))]
    Compile(Vec<CompileError>),
    /// The failing step's error, as it was raised.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl ScriptError {
    /// Source diagnostics for parse and compile errors; empty for runtime errors.
    pub fn diagnostics(&self) -> Vec<Diagnostic<usize>> {
        match self {
            ScriptError::Parse(errors) => errors.iter().map(ParseError::to_diagnostic).collect(),
            ScriptError::Compile(errors) => {
                errors.iter().map(CompileError::to_diagnostic).collect()
            }
            ScriptError::Runtime(_) => Vec::new(),
        }
    }
}

fn join_messages<E: fmt::Display>(errors: &[E]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
