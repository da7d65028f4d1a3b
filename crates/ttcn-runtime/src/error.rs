use std::fmt;

use thiserror::Error;

/// Position in the TTCN-3 source a generated construct came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Errors terminating the running behaviour.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DynamicError {
    #[error("{location}: None of the branches can be chosen in the {construct}")]
    NoBranchSelectable {
        construct: String,
        location: SourceLocation,
    },
    #[error("Invalid altstep value: {reason}")]
    InvalidAltstepValue { reason: String },
    #[error("Test component stopped")]
    Stopped,
    #[error("Function '{function}' ended without returning a value")]
    MissingReturn { function: String },
    #[error("Cannot assign a {found} value to a variable of type {expected}")]
    RedirectType {
        expected: &'static str,
        found: String,
    },
    #[error("Operation on '{subject}' failed: {message}")]
    Operation { subject: String, message: String },
}

impl DynamicError {
    pub fn no_branch_selectable(construct: impl Into<String>, file: &str, line: u32) -> Self {
        DynamicError::NoBranchSelectable {
            construct: construct.into(),
            location: SourceLocation::new(file, line),
        }
    }

    pub fn operation(subject: impl Into<String>, message: impl Into<String>) -> Self {
        DynamicError::Operation {
            subject: subject.into(),
            message: message.into(),
        }
    }
}
