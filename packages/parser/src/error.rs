//! Error types for the markup and script parsers

use std::ops::Range;
use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token at {span:?}: expected {expected}, found {found}")]
    UnexpectedToken {
        span: Range<usize>,
        expected: String,
        found: String,
    },

    #[error("Unexpected end of input: expected {expected}")]
    UnexpectedEof { pos: usize, expected: String },

    #[error("Invalid syntax at {span:?}: {message}")]
    InvalidSyntax { span: Range<usize>, message: String },

    #[error("Lexer error at {span:?}: unrecognized input '{text}'")]
    LexerError { span: Range<usize>, text: String },

    #[error("Unbalanced braces in '{name}' starting at {pos}")]
    UnbalancedBraces { pos: usize, name: String },
}

impl ParseError {
    pub fn unexpected_token(
        span: Range<usize>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::UnexpectedToken {
            span,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn unexpected_eof(pos: usize, expected: impl Into<String>) -> Self {
        Self::UnexpectedEof {
            pos,
            expected: expected.into(),
        }
    }

    pub fn invalid_syntax(span: Range<usize>, message: impl Into<String>) -> Self {
        Self::InvalidSyntax {
            span,
            message: message.into(),
        }
    }

    pub fn span(&self) -> Range<usize> {
        match self {
            ParseError::UnexpectedToken { span, .. }
            | ParseError::InvalidSyntax { span, .. }
            | ParseError::LexerError { span, .. } => span.clone(),
            ParseError::UnexpectedEof { pos, .. } | ParseError::UnbalancedBraces { pos, .. } => {
                *pos..*pos + 1
            }
        }
    }

    /// Shift the error's location by `offset` bytes.
    ///
    /// Method bodies are parsed as standalone snippets; this maps their
    /// positions back into the enclosing script.
    pub fn offset(self, offset: usize) -> Self {
        let shift = |r: Range<usize>| r.start + offset..r.end + offset;
        match self {
            ParseError::UnexpectedToken {
                span,
                expected,
                found,
            } => ParseError::UnexpectedToken {
                span: shift(span),
                expected,
                found,
            },
            ParseError::UnexpectedEof { pos, expected } => ParseError::UnexpectedEof {
                pos: pos + offset,
                expected,
            },
            ParseError::InvalidSyntax { span, message } => ParseError::InvalidSyntax {
                span: shift(span),
                message,
            },
            ParseError::LexerError { span, text } => ParseError::LexerError {
                span: shift(span),
                text,
            },
            ParseError::UnbalancedBraces { pos, name } => ParseError::UnbalancedBraces {
                pos: pos + offset,
                name,
            },
        }
    }

    fn label(&self) -> String {
        match self {
            ParseError::UnexpectedToken { expected, .. }
            | ParseError::UnexpectedEof { expected, .. } => format!("expected {}", expected),
            ParseError::InvalidSyntax { message, .. } => message.clone(),
            ParseError::LexerError { text, .. } => format!("unrecognized '{}'", text),
            ParseError::UnbalancedBraces { .. } => "this block is never closed".to_string(),
        }
    }
}

/// Pretty-print errors with source context using ariadne
#[cfg(feature = "pretty-errors")]
pub fn format_errors(source: &str, filename: &str, errors: &[ParseError]) -> String {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let mut output = Vec::new();

    for error in errors {
        let mut span = error.span();
        span.start = span.start.min(source.len());
        span.end = span.end.clamp(span.start, source.len());

        let report = Report::build(ReportKind::Error, filename, span.start)
            .with_message(error.to_string())
            .with_label(
                Label::new((filename, span))
                    .with_color(Color::Red)
                    .with_message(error.label()),
            )
            .finish();

        if report
            .write((filename, Source::from(source)), &mut output)
            .is_err()
        {
            return "Error formatting failed".to_string();
        }
    }

    String::from_utf8(output).unwrap_or_else(|_| "Error formatting failed".to_string())
}

/// Plain-text fallback when ariadne is not compiled in
#[cfg(not(feature = "pretty-errors"))]
pub fn format_errors(_source: &str, filename: &str, errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(|error| format!("{}: {} ({})\n", filename, error, error.label()))
        .collect()
}
