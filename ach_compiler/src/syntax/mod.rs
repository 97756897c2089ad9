//! Syntax analysis module - TokenStream to expression tree transformation
//!
//! Parsing never fails as a whole. Broken statements come back as error
//! nodes in place, so callers always receive one node per statement.

mod error;
mod parser;

pub use error::{SyntaxError, SyntaxResult};
pub use parser::{create_parser, ScriptParser};

use crate::grammar::ast::{ExprRef, Expression};
use crate::interpreter::ErrorExpression;
use crate::logging::codes;
use crate::tokens::TokenStream;
use crate::utils::{Position, Span};
use crate::{log_debug, log_error, log_success};

/// Parse every statement in a token stream
pub fn parse_token_stream(token_stream: TokenStream) -> Vec<ExprRef> {
    log_debug!("Starting syntax analysis", "tokens" => token_stream.len());
    let mut parser = ScriptParser::new(token_stream);
    parser.parse_all()
}

/// Tokenize and parse source text. A lexical failure is reported as a
/// single error node at the failure location.
pub fn parse_source(source: &str) -> Vec<ExprRef> {
    match crate::lexical::tokenize_source(source) {
        Ok(tokens) => parse_token_stream(tokens),
        Err(error) => {
            log_error!(error.error_code(), "Tokenization failed",
                "error" => error.to_string()
            );
            let span = match error.location() {
                Some((line, column)) => Span::single(Position::new(0, line, column)),
                None => Span::dummy(),
            };
            vec![Expression::error(ErrorExpression::syntax(error.to_string(), span))]
        }
    }
}

/// Module version
pub const VERSION: &str = "1.0.0";

/// Initialize syntax analysis logging and validate error codes
pub fn init_syntax_logging() -> Result<(), String> {
    let test_codes = [
        codes::syntax::UNEXPECTED_TOKEN,
        codes::syntax::UNEXPECTED_END,
        codes::syntax::UNMATCHED_DELIMITER,
        codes::syntax::INVALID_STATEMENT,
        codes::syntax::MAX_RECURSION_DEPTH,
        codes::syntax::TOO_MANY_PARAMETERS,
        codes::syntax::EMPTY_TOKEN_STREAM,
    ];

    for code in &test_codes {
        let description = codes::get_description(code.as_str());
        if description == "Unknown error" {
            return Err(format!(
                "Syntax error code {} not properly configured",
                code.as_str()
            ));
        }
    }

    log_success!(
        codes::success::SYSTEM_INITIALIZATION_COMPLETED,
        "Syntax analysis logging validation completed",
        "error_codes_validated" => test_codes.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::ast::ExpressionKind;
    use crate::interpreter::ErrorKind;
    use assert_matches::assert_matches;

    #[test]
    fn test_init_syntax_logging() {
        let _ = crate::logging::init_global_logging();
        assert!(init_syntax_logging().is_ok());
    }

    #[test]
    fn test_parse_source_returns_statements() {
        let statements = parse_source("a = 1\n// note\nb = a + 2\n");
        assert_eq!(statements.len(), 2);
        assert_matches!(statements[1].kind, ExpressionKind::Assignment { .. });
    }

    #[test]
    fn test_lexical_failure_becomes_error_node() {
        let statements = parse_source("a = \"unterminated\n");
        assert_eq!(statements.len(), 1);
        assert_eq!(statements[0].as_error().map(|e| e.kind), Some(ErrorKind::Syntax));
    }
}
