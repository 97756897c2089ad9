//! Syntax errors with error code mapping
//!
//! The parser never aborts on these: each one is recorded in the parser's
//! history and embedded in the tree as an error node.

use crate::interpreter::ErrorExpression;
use crate::logging::{codes, Code};
use crate::utils::Span;

pub type SyntaxResult<T> = Result<T, SyntaxError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyntaxError {
    #[error("Expected {expected}, found '{found}'")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("Unexpected end of script, expected {expected}")]
    UnexpectedEndOfInput { expected: String, span: Span },

    #[error("No matching '{delimiter}' found")]
    UnmatchedDelimiter { delimiter: String, span: Span },

    #[error("{message}")]
    InvalidStatement { message: String, span: Span },

    #[error("Expression nesting is too deep")]
    MaxRecursionDepth { span: Span },

    #[error("Function declares {count} parameters, the maximum is {max}")]
    TooManyParameters { count: usize, max: usize, span: Span },

    #[error("Script contains no statements")]
    EmptyTokenStream,
}

impl SyntaxError {
    pub fn unexpected_token(expected: &str, found: &str, span: Span) -> Self {
        Self::UnexpectedToken {
            expected: expected.to_string(),
            found: found.to_string(),
            span,
        }
    }

    pub fn unexpected_end_of_input(expected: &str, span: Span) -> Self {
        Self::UnexpectedEndOfInput {
            expected: expected.to_string(),
            span,
        }
    }

    pub fn unmatched_delimiter(delimiter: &str, span: Span) -> Self {
        Self::UnmatchedDelimiter {
            delimiter: delimiter.to_string(),
            span,
        }
    }

    pub fn invalid_statement(message: &str, span: Span) -> Self {
        Self::InvalidStatement {
            message: message.to_string(),
            span,
        }
    }

    pub fn max_recursion_depth(span: Span) -> Self {
        Self::MaxRecursionDepth { span }
    }

    pub fn too_many_parameters(count: usize, max: usize, span: Span) -> Self {
        Self::TooManyParameters { count, max, span }
    }

    pub fn error_code(&self) -> Code {
        match self {
            Self::UnexpectedToken { .. } => codes::syntax::UNEXPECTED_TOKEN,
            Self::UnexpectedEndOfInput { .. } => codes::syntax::UNEXPECTED_END,
            Self::UnmatchedDelimiter { .. } => codes::syntax::UNMATCHED_DELIMITER,
            Self::InvalidStatement { .. } => codes::syntax::INVALID_STATEMENT,
            Self::MaxRecursionDepth { .. } => codes::syntax::MAX_RECURSION_DEPTH,
            Self::TooManyParameters { .. } => codes::syntax::TOO_MANY_PARAMETERS,
            Self::EmptyTokenStream => codes::syntax::EMPTY_TOKEN_STREAM,
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Self::UnexpectedToken { span, .. }
            | Self::UnexpectedEndOfInput { span, .. }
            | Self::UnmatchedDelimiter { span, .. }
            | Self::InvalidStatement { span, .. }
            | Self::MaxRecursionDepth { span }
            | Self::TooManyParameters { span, .. } => Some(*span),
            Self::EmptyTokenStream => None,
        }
    }

    /// Parsing can resume at the next statement
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::MaxRecursionDepth { .. })
    }

    pub fn severity(&self) -> &'static str {
        codes::get_severity(self.error_code().as_str()).as_str()
    }

    pub fn recommended_action(&self) -> &'static str {
        codes::get_action(self.error_code().as_str())
    }
}

impl From<SyntaxError> for ErrorExpression {
    fn from(error: SyntaxError) -> Self {
        let span = error.span().unwrap_or_else(Span::dummy);
        ErrorExpression::syntax(error.to_string(), span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::ErrorKind;
    use crate::utils::Position;

    fn span() -> Span {
        Span::new(Position::new(10, 2, 5), Position::new(11, 2, 6))
    }

    #[test]
    fn test_error_code_mapping() {
        assert_eq!(
            SyntaxError::unexpected_token("')'", "x", span()).error_code(),
            codes::syntax::UNEXPECTED_TOKEN
        );
        assert_eq!(
            SyntaxError::unexpected_end_of_input("expression", span()).error_code(),
            codes::syntax::UNEXPECTED_END
        );
        assert_eq!(
            SyntaxError::max_recursion_depth(span()).error_code(),
            codes::syntax::MAX_RECURSION_DEPTH
        );
        assert!(!SyntaxError::max_recursion_depth(span()).is_recoverable());
    }

    #[test]
    fn test_conversion_to_error_node_payload() {
        let error: ErrorExpression = SyntaxError::unexpected_token("')'", "x", span()).into();
        assert_eq!(error.kind, ErrorKind::Syntax);
        assert_eq!(error.message, "Expected ')', found 'x'");
        assert_eq!(error.span.start.line, 2);
    }
}
