#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

use crate::ast::Span;

#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    #[error("Syntax error: {message}")]
    #[diagnostic(code(ttcn::parse::syntax))]
    Syntax {
        message: String,
        #[label("here")]
        span: miette::SourceSpan,
        #[source_code]
        src: miette::NamedSource<String>,
    },

    #[error("Invalid literal '{text}': {reason}")]
    #[diagnostic(code(ttcn::parse::literal))]
    InvalidLiteral {
        text: String,
        reason: String,
        #[label("literal")]
        span: miette::SourceSpan,
        #[source_code]
        src: miette::NamedSource<String>,
    },

    #[error("Duplicate definition: {name}")]
    #[diagnostic(
        code(ttcn::parse::duplicate),
        help("definitions of a module share one namespace")
    )]
    Duplicate {
        name: String,
        #[label("duplicate")]
        span: miette::SourceSpan,
        #[source_code]
        src: miette::NamedSource<String>,
    },
}

impl ParseError {
    pub fn syntax(message: impl Into<String>, span: Span, source: &str, filename: &str) -> Self {
        ParseError::Syntax {
            message: message.into(),
            span: (span.start, span.end.saturating_sub(span.start)).into(),
            src: miette::NamedSource::new(filename, source.to_owned()),
        }
    }

    pub fn invalid_literal(
        text: impl Into<String>,
        reason: impl Into<String>,
        span: Span,
    ) -> Self {
        ParseError::InvalidLiteral {
            text: text.into(),
            reason: reason.into(),
            span: (span.start, span.end.saturating_sub(span.start)).into(),
            src: miette::NamedSource::new("", String::new()),
        }
    }

    pub fn duplicate(name: impl Into<String>, span: Span) -> Self {
        ParseError::Duplicate {
            name: name.into(),
            span: (span.start, span.end.saturating_sub(span.start)).into(),
            src: miette::NamedSource::new("", String::new()),
        }
    }

    /// Attach source text and file name to variants built without them.
    ///
    /// AST building only knows byte offsets; the entry point calls this once
    /// so miette can render highlighted snippets.
    pub fn with_source_context(self, source: &str, filename: &str) -> Self {
        match self {
            ParseError::InvalidLiteral {
                text, reason, span, ..
            } => ParseError::InvalidLiteral {
                text,
                reason,
                span,
                src: miette::NamedSource::new(filename, source.to_owned()),
            },
            ParseError::Duplicate { name, span, .. } => ParseError::Duplicate {
                name,
                span,
                src: miette::NamedSource::new(filename, source.to_owned()),
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_syntax_error() {
        let err = ParseError::syntax("unexpected EOF", Span::new(0, 5), "hello", "t.ttcn");
        assert_eq!(err.to_string(), "Syntax error: unexpected EOF");
    }

    #[test]
    fn syntax_convenience_constructor_keeps_offsets() {
        let err = ParseError::syntax("bad token", Span::new(5, 10), "some source code", "f.ttcn");
        match &err {
            ParseError::Syntax { message, span, .. } => {
                assert_eq!(message, "bad token");
                assert_eq!(span.offset(), 5);
                assert_eq!(span.len(), 5);
            }
            _ => panic!("expected Syntax variant"),
        }
    }

    #[test]
    fn display_invalid_literal() {
        let err = ParseError::invalid_literal("99999999999999999999", "out of range", Span::new(0, 20));
        assert_eq!(
            err.to_string(),
            "Invalid literal '99999999999999999999': out of range"
        );
    }

    #[test]
    fn with_source_context_enriches_duplicate() {
        let err = ParseError::duplicate("f_main", Span::new(0, 6));
        match err.with_source_context("function f_main() {}", "demo.ttcn") {
            ParseError::Duplicate { src, name, .. } => {
                assert_eq!(src.name(), "demo.ttcn");
                assert_eq!(name, "f_main");
            }
            _ => panic!("expected Duplicate variant"),
        }
    }
}
