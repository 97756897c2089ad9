//! Lexical analysis module
//!
//! Tokenizes achievement scripts either from a loaded file or directly from
//! text (the incremental engine re-lexes edited buffers without touching the
//! file system).

pub mod analyzer;

use crate::config::constants::compile_time::lexical::*;
use crate::config::runtime::LexicalPreferences;
use crate::file_processor::FileProcessingResult;
use crate::tokens::{Token, TokenStream};

pub use analyzer::{LexerError, LexicalAnalyzer, LexicalMetrics};

/// Tokenize a loaded script file
pub fn tokenize_file_result(file_result: &FileProcessingResult) -> Result<TokenStream, LexerError> {
    LexicalAnalyzer::new().tokenize_file_result(file_result)
}

/// Tokenize script text
pub fn tokenize_source(source: &str) -> Result<TokenStream, LexerError> {
    LexicalAnalyzer::new().tokenize_source(source)
}

pub fn create_analyzer_with_preferences(preferences: LexicalPreferences) -> LexicalAnalyzer {
    LexicalAnalyzer::with_preferences(preferences)
}

/// Check that every lexer error code is registered and the limits are usable
pub fn init_lexical_analysis_logging() -> Result<(), String> {
    use crate::logging::codes::{self, lexical};

    let missing = [
        lexical::INVALID_CHARACTER,
        lexical::UNTERMINATED_STRING,
        lexical::INVALID_NUMBER,
        lexical::IDENTIFIER_TOO_LONG,
        lexical::STRING_TOO_LARGE,
        lexical::UNTERMINATED_COMMENT,
        lexical::COMMENT_TOO_LONG,
        lexical::TOO_MANY_TOKENS,
        lexical::INVALID_ESCAPE,
    ]
    .into_iter()
    .find(|code| codes::get_error_metadata(code.as_str()).is_none());
    if let Some(code) = missing {
        return Err(format!("Lexical error code {} is not registered", code.as_str()));
    }

    if MAX_STRING_SIZE == 0 || MAX_IDENTIFIER_LENGTH == 0 || MAX_TOKEN_COUNT == 0 {
        return Err("Lexical limits cannot be zero".to_string());
    }

    crate::log_debug!("Lexical limits initialized",
        "max_string_size" => MAX_STRING_SIZE,
        "max_identifier_length" => MAX_IDENTIFIER_LENGTH,
        "max_comment_length" => MAX_COMMENT_LENGTH,
        "max_token_count" => MAX_TOKEN_COUNT
    );

    Ok(())
}

/// Token distribution of a stream
pub fn get_token_counts(token_stream: &TokenStream) -> TokenCounts {
    let mut counts = TokenCounts::default();

    for token in token_stream.all_tokens() {
        counts.total += 1;
        match &token.value {
            Token::Keyword(_) => counts.keywords += 1,
            Token::Identifier(_) => counts.identifiers += 1,
            Token::Integer(_) | Token::Float(_) => counts.numbers += 1,
            Token::Boolean(_) => counts.booleans += 1,
            Token::StringLiteral(_) => counts.strings += 1,
            Token::LineComment(_) | Token::BlockComment(_) => counts.comments += 1,
            Token::Space | Token::Tab | Token::Newline => counts.whitespace += 1,
            t if t.is_comparison_operator() || t.is_arithmetic_operator() => {
                counts.operators += 1
            }
            _ => {}
        }
    }

    counts
}

#[derive(Debug, Default, Clone)]
pub struct TokenCounts {
    pub total: usize,
    pub keywords: usize,
    pub identifiers: usize,
    pub numbers: usize,
    pub booleans: usize,
    pub strings: usize,
    pub comments: usize,
    pub operators: usize,
    pub whitespace: usize,
}

impl TokenCounts {
    /// Count of tokens the parser will see
    pub fn significant_tokens(&self) -> usize {
        self.total - self.whitespace - self.comments
    }

    /// True when the script contains anything besides trivia
    pub fn has_content(&self) -> bool {
        self.significant_tokens() > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_analyzer_with_preferences() {
        let preferences = LexicalPreferences {
            collect_detailed_metrics: false,
            ..Default::default()
        };
        let analyzer = create_analyzer_with_preferences(preferences);
        assert!(!analyzer.preferences().collect_detailed_metrics);
    }

    #[test]
    fn test_init_logging() {
        let _ = crate::logging::init_global_logging();
        assert!(init_lexical_analysis_logging().is_ok());
    }

    #[test]
    fn test_token_counts() {
        let _ = crate::logging::init_global_logging();
        let stream = tokenize_source("// note\nx = byte(0x10) + 2\n").unwrap();
        let counts = get_token_counts(&stream);

        assert_eq!(counts.comments, 1);
        assert_eq!(counts.identifiers, 2);
        assert_eq!(counts.numbers, 2);
        assert_eq!(counts.operators, 1);
        assert!(counts.has_content());
    }

    #[test]
    fn test_detailed_metrics_track_operator_usage() {
        let preferences = LexicalPreferences {
            collect_detailed_metrics: true,
            ..Default::default()
        };

        let mut metrics = LexicalMetrics::default();
        metrics.record_token(&Token::Plus, &preferences);
        metrics.record_token(&Token::Minus, &preferences);
        metrics.record_string_length(100);

        assert_eq!(metrics.operator_tokens, 2);
        assert_eq!(metrics.max_string_length, 100);
        assert_eq!(metrics.operator_usage_patterns.get("+"), Some(&1));
    }
}
