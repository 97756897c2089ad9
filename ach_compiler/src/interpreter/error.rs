//! Script diagnostics
//!
//! An `ErrorExpression` is both the error value returned by every
//! evaluation entry point and the payload of error nodes embedded in the
//! tree by the parser.

use crate::logging::{codes, Code};
use crate::utils::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed tokens or statements
    Syntax,
    /// Operand kinds an operator cannot combine
    Type,
    UnknownIdentifier,
    /// Parameter binding problems, division by zero, folded overflows
    Semantic,
    /// Call nesting exceeded the depth ceiling
    RecursionLimit,
    /// A compile-time decision depends on runtime memory
    RuntimeIncompatibility,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Syntax => "syntax error",
            Self::Type => "type error",
            Self::UnknownIdentifier => "unknown identifier",
            Self::Semantic => "semantic error",
            Self::RecursionLimit => "recursion limit",
            Self::RuntimeIncompatibility => "runtime incompatibility",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct ErrorExpression {
    pub kind: ErrorKind,
    pub message: String,
    pub span: Span,
    /// The failure this one wraps, if any
    #[source]
    pub inner: Option<Box<ErrorExpression>>,
}

impl ErrorExpression {
    pub fn new(kind: ErrorKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
            inner: None,
        }
    }

    pub fn syntax(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::Syntax, message, span)
    }

    pub fn type_error(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::Type, message, span)
    }

    pub fn unknown_identifier(name: &str, span: Span) -> Self {
        Self::new(
            ErrorKind::UnknownIdentifier,
            format!("Unknown variable: {}", name),
            span,
        )
    }

    pub fn semantic(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::Semantic, message, span)
    }

    pub fn runtime_incompatibility(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::RuntimeIncompatibility, message, span)
    }

    /// Wrap a failure with context from the caller
    pub fn wrap(self, message: impl Into<String>, span: Span) -> Self {
        let kind = if self.is_fatal() {
            ErrorKind::RecursionLimit
        } else {
            self.kind
        };
        Self {
            kind,
            message: message.into(),
            span,
            inner: Some(Box::new(self)),
        }
    }

    /// Innermost error of the chain
    pub fn root_cause(&self) -> &ErrorExpression {
        let mut current = self;
        while let Some(inner) = &current.inner {
            current = inner;
        }
        current
    }

    /// Errors from the outermost wrapper to the root cause
    pub fn chain(&self) -> Vec<&ErrorExpression> {
        let mut links = vec![self];
        let mut current = self;
        while let Some(inner) = &current.inner {
            links.push(inner);
            current = inner;
        }
        links
    }

    /// Recursion failures abort the whole top-level evaluation
    pub fn is_fatal(&self) -> bool {
        self.chain()
            .iter()
            .any(|e| e.kind == ErrorKind::RecursionLimit)
    }

    pub fn shift_lines(&mut self, delta: i64) {
        self.span = self.span.shift_lines(delta);
        if let Some(inner) = &mut self.inner {
            inner.shift_lines(delta);
        }
    }

    pub fn error_code(&self) -> Code {
        match self.kind {
            ErrorKind::Syntax => codes::evaluation::SYNTAX_ERROR,
            ErrorKind::Type => codes::evaluation::TYPE_ERROR,
            ErrorKind::UnknownIdentifier => codes::evaluation::UNKNOWN_IDENTIFIER,
            ErrorKind::Semantic => codes::evaluation::SEMANTIC_ERROR,
            ErrorKind::RecursionLimit => codes::evaluation::RECURSION_LIMIT,
            ErrorKind::RuntimeIncompatibility => codes::evaluation::RUNTIME_INCOMPATIBILITY,
        }
    }

    /// `line:column: message`, followed by the inner chain
    pub fn format_detailed(&self) -> String {
        self.chain()
            .iter()
            .map(|e| format!("{}:{}: {}", e.span.start.line, e.span.start.column, e.message))
            .collect::<Vec<_>>()
            .join("\n  caused by ")
    }
}

/// Diagnostics compare by meaning so moved but unchanged statements are
/// recognised as equal
impl PartialEq for ErrorExpression {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.message == other.message && self.inner == other.inner
    }
}

pub type EvaluationResult<T> = Result<T, ErrorExpression>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::Position;

    fn span_at(line: u32) -> Span {
        Span::single(Position::new(0, line, 1))
    }

    #[test]
    fn test_root_cause_walks_chain() {
        let root = ErrorExpression::semantic("Division by zero", span_at(3));
        let wrapped = root
            .clone()
            .wrap("f call failed", span_at(5))
            .wrap("g call failed", span_at(7));

        assert_eq!(wrapped.root_cause().message, "Division by zero");
        assert_eq!(wrapped.chain().len(), 3);
        assert_eq!(wrapped.kind, ErrorKind::Semantic);
        assert!(!wrapped.is_fatal());
    }

    #[test]
    fn test_recursion_limit_stays_fatal_when_wrapped() {
        let root = ErrorExpression::new(ErrorKind::RecursionLimit, "Maximum recursion depth exceeded", span_at(1));
        let wrapped = root.wrap("f call failed", span_at(2));
        assert!(wrapped.is_fatal());
        assert_eq!(wrapped.error_code(), codes::evaluation::RECURSION_LIMIT);
    }

    #[test]
    fn test_shift_lines_moves_whole_chain() {
        let mut error = ErrorExpression::type_error("bad", span_at(4)).wrap("outer", span_at(6));
        error.shift_lines(2);
        assert_eq!(error.span.start.line, 8);
        assert_eq!(error.root_cause().span.start.line, 6);
        assert!(error.format_detailed().starts_with("8:1: outer"));
    }
}
