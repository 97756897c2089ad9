//! Core lexical analyzer
//!
//! Turns script text into a [`TokenStream`]. Whitespace and comments are
//! emitted as real tokens so the incremental engine can see comment runs;
//! the stream filters them out for the parser.

use crate::config::constants::compile_time::lexical::*;
use crate::config::runtime::LexicalPreferences;
use crate::file_processor::FileProcessingResult;
use crate::logging::codes;
use crate::tokens::{classify_operator_symbol, classify_word, Token, TokenStream};
use crate::utils::{Position, SourceMap, Span, Spanned};
use crate::{log_debug, log_error, log_success};
use std::iter::Peekable;
use std::str::CharIndices;

type CharStream<'a> = Peekable<CharIndices<'a>>;

/// Lexical analysis errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LexerError {
    #[error("Invalid character: '{character}' at line {line}, column {column}")]
    InvalidCharacter {
        character: char,
        line: u32,
        column: u32,
    },

    #[error("Unterminated string literal starting at line {line}, column {column}")]
    UnterminatedString { line: u32, column: u32 },

    #[error("Invalid number format: '{text}' at line {line}, column {column}")]
    InvalidNumber { text: String, line: u32, column: u32 },

    #[error("Invalid escape sequence '\\{sequence}' at line {line}, column {column}")]
    InvalidEscape { sequence: char, line: u32, column: u32 },

    #[error("Unterminated block comment starting at line {line}, column {column}")]
    UnterminatedComment { line: u32, column: u32 },

    #[error("Identifier too long: {length} characters (max {MAX_IDENTIFIER_LENGTH})")]
    IdentifierTooLong { length: usize },

    #[error("String too large: {size} bytes (max {MAX_STRING_SIZE})")]
    StringTooLarge { size: usize },

    #[error("Comment too long: {length} characters (max {MAX_COMMENT_LENGTH})")]
    CommentTooLong { length: usize },

    #[error("Too many tokens: {count} (max {MAX_TOKEN_COUNT})")]
    TooManyTokens { count: usize },
}

impl LexerError {
    pub fn error_code(&self) -> crate::logging::Code {
        match self {
            LexerError::InvalidCharacter { .. } => codes::lexical::INVALID_CHARACTER,
            LexerError::UnterminatedString { .. } => codes::lexical::UNTERMINATED_STRING,
            LexerError::InvalidNumber { .. } => codes::lexical::INVALID_NUMBER,
            LexerError::InvalidEscape { .. } => codes::lexical::INVALID_ESCAPE,
            LexerError::UnterminatedComment { .. } => codes::lexical::UNTERMINATED_COMMENT,
            LexerError::IdentifierTooLong { .. } => codes::lexical::IDENTIFIER_TOO_LONG,
            LexerError::StringTooLarge { .. } => codes::lexical::STRING_TOO_LARGE,
            LexerError::CommentTooLong { .. } => codes::lexical::COMMENT_TOO_LONG,
            LexerError::TooManyTokens { .. } => codes::lexical::TOO_MANY_TOKENS,
        }
    }

    /// Line and column the error was detected at, when known
    pub fn location(&self) -> Option<(u32, u32)> {
        match self {
            LexerError::InvalidCharacter { line, column, .. }
            | LexerError::UnterminatedString { line, column }
            | LexerError::InvalidNumber { line, column, .. }
            | LexerError::InvalidEscape { line, column, .. }
            | LexerError::UnterminatedComment { line, column } => Some((*line, *column)),
            _ => None,
        }
    }
}

/// Lexical analysis metrics
#[derive(Debug, Default, Clone)]
pub struct LexicalMetrics {
    pub total_tokens: usize,
    pub keyword_tokens: usize,
    pub identifier_tokens: usize,
    pub operator_tokens: usize,
    pub literal_tokens: usize,
    pub comment_count: usize,
    pub max_string_length: usize,
    pub max_comment_length: usize,
    pub line_count: usize,

    // Only populated when detailed metrics are enabled
    pub whitespace_tokens: usize,
    pub operator_usage_patterns: std::collections::HashMap<String, usize>,
}

impl LexicalMetrics {
    pub(crate) fn record_token(&mut self, token: &Token, preferences: &LexicalPreferences) {
        self.total_tokens += 1;

        match token {
            Token::Keyword(_) => self.keyword_tokens += 1,
            Token::Identifier(_) => self.identifier_tokens += 1,
            Token::LineComment(_) | Token::BlockComment(_) => self.comment_count += 1,
            Token::Space | Token::Tab => {
                if preferences.collect_detailed_metrics {
                    self.whitespace_tokens += 1;
                }
            }
            Token::Newline => {
                self.line_count += 1;
                if preferences.collect_detailed_metrics {
                    self.whitespace_tokens += 1;
                }
            }
            t if t.is_literal() => self.literal_tokens += 1,
            t if t.is_comparison_operator()
                || t.is_arithmetic_operator()
                || matches!(t, Token::And | Token::Or | Token::Not | Token::Assign) =>
            {
                self.operator_tokens += 1;
                if preferences.collect_detailed_metrics {
                    *self
                        .operator_usage_patterns
                        .entry(t.as_source_string())
                        .or_insert(0) += 1;
                }
            }
            _ => {}
        }
    }

    pub(crate) fn record_string_length(&mut self, length: usize) {
        self.max_string_length = self.max_string_length.max(length);
    }

    pub(crate) fn record_comment_length(&mut self, length: usize) {
        self.max_comment_length = self.max_comment_length.max(length);
    }
}

/// Script lexer with global logging integration
pub struct LexicalAnalyzer {
    metrics: LexicalMetrics,
    preferences: LexicalPreferences,
}

impl Default for LexicalAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LexicalAnalyzer {
    pub fn new() -> Self {
        Self {
            metrics: LexicalMetrics::default(),
            preferences: LexicalPreferences::default(),
        }
    }

    pub fn with_preferences(preferences: LexicalPreferences) -> Self {
        Self {
            metrics: LexicalMetrics::default(),
            preferences,
        }
    }

    /// Tokenize a loaded script file
    pub fn tokenize_file_result(
        &mut self,
        file_result: &FileProcessingResult,
    ) -> Result<TokenStream, LexerError> {
        let file_path = file_result.metadata.path.display().to_string();

        log_debug!("Starting lexical analysis",
            "file" => file_path.as_str(),
            "char_count" => file_result.char_count(),
            "line_count" => file_result.metadata.line_count,
            "max_tokens_allowed" => MAX_TOKEN_COUNT
        );

        self.tokenize_source(&file_result.source)
    }

    /// Tokenize script text
    pub fn tokenize_source(&mut self, source: &str) -> Result<TokenStream, LexerError> {
        self.metrics = LexicalMetrics::default();

        let mut tokens: Vec<Spanned<Token>> = Vec::new();
        let mut chars = source.char_indices().peekable();
        let mut pos = Position::start();

        while let Some(&(start, ch)) = chars.peek() {
            if tokens.len() >= MAX_TOKEN_COUNT {
                let error = LexerError::TooManyTokens {
                    count: tokens.len() + 1,
                };
                log_error!(error.error_code(), "Token limit exceeded",
                    "token_count" => tokens.len(),
                    "max_tokens" => MAX_TOKEN_COUNT
                );
                return Err(error);
            }

            let token = match self.next_token(ch, pos, source, &mut chars) {
                Ok(token) => token,
                Err(error) => {
                    let span = Span::single(pos);
                    log_error!(error.error_code(), &error.to_string(),
                        span = span,
                        "line" => pos.line,
                        "column" => pos.column
                    );
                    return Err(error);
                }
            };

            let end = chars.peek().map(|(offset, _)| *offset).unwrap_or(source.len());
            let end_pos = pos.advance_str(&source[start..end]);
            self.metrics.record_token(&token, &self.preferences);
            tokens.push(Spanned::new(token, Span::new(pos, end_pos)));
            pos = end_pos;
        }

        tokens.push(Spanned::new(Token::Eof, Span::new(pos, pos)));

        log_success!(
            codes::success::TOKENIZATION_COMPLETE,
            "Lexical analysis completed",
            "total_tokens" => self.metrics.total_tokens,
            "keyword_tokens" => self.metrics.keyword_tokens,
            "identifier_tokens" => self.metrics.identifier_tokens,
            "comment_count" => self.metrics.comment_count
        );

        Ok(TokenStream::with_source_map(
            tokens,
            SourceMap::new(source.to_string()),
        ))
    }

    /// Get current metrics
    pub fn metrics(&self) -> &LexicalMetrics {
        &self.metrics
    }

    pub fn preferences(&self) -> &LexicalPreferences {
        &self.preferences
    }

    pub fn set_preferences(&mut self, preferences: LexicalPreferences) {
        self.preferences = preferences;
    }

    // ========================================================================
    // Token readers. Each consumes the characters of exactly one token.
    // ========================================================================

    fn next_token(
        &mut self,
        ch: char,
        pos: Position,
        source: &str,
        chars: &mut CharStream<'_>,
    ) -> Result<Token, LexerError> {
        match ch {
            ' ' => {
                chars.next();
                Ok(Token::Space)
            }
            '\t' => {
                chars.next();
                Ok(Token::Tab)
            }
            '\n' => {
                chars.next();
                Ok(Token::Newline)
            }
            '\r' => {
                chars.next();
                if matches!(chars.peek(), Some((_, '\n'))) {
                    chars.next();
                }
                Ok(Token::Newline)
            }
            c if c.is_whitespace() => {
                chars.next();
                Ok(Token::Space)
            }
            '"' => self.read_string(pos, chars),
            '0'..='9' => self.read_number(pos, source, chars),
            'a'..='z' | 'A'..='Z' | '_' => self.read_word(source, chars),
            '/' => {
                chars.next();
                match chars.peek() {
                    Some((_, '/')) => {
                        chars.next();
                        self.read_line_comment(chars)
                    }
                    Some((_, '*')) => {
                        chars.next();
                        self.read_block_comment(pos, chars)
                    }
                    _ => Ok(Token::Divide),
                }
            }
            '(' => Ok(single(chars, Token::LeftParen)),
            ')' => Ok(single(chars, Token::RightParen)),
            '[' => Ok(single(chars, Token::LeftBracket)),
            ']' => Ok(single(chars, Token::RightBracket)),
            '{' => Ok(single(chars, Token::LeftBrace)),
            '}' => Ok(single(chars, Token::RightBrace)),
            ',' => Ok(single(chars, Token::Comma)),
            ':' => Ok(single(chars, Token::Colon)),
            '=' | '!' | '<' | '>' | '&' | '|' | '+' | '-' | '*' | '%' | '^' => {
                self.read_operator(ch, pos, chars)
            }
            other => Err(LexerError::InvalidCharacter {
                character: other,
                line: pos.line,
                column: pos.column,
            }),
        }
    }

    fn read_operator(
        &mut self,
        first: char,
        pos: Position,
        chars: &mut CharStream<'_>,
    ) -> Result<Token, LexerError> {
        chars.next();

        if let Some(&(_, second)) = chars.peek() {
            let pair: String = [first, second].iter().collect();
            if let Some(token) = classify_operator_symbol(&pair) {
                chars.next();
                return Ok(token);
            }
        }

        classify_operator_symbol(&first.to_string()).ok_or(LexerError::InvalidCharacter {
            character: first,
            line: pos.line,
            column: pos.column,
        })
    }

    fn read_word(&mut self, source: &str, chars: &mut CharStream<'_>) -> Result<Token, LexerError> {
        let start = chars.peek().map(|(offset, _)| *offset).unwrap_or(source.len());
        while let Some(&(_, ch)) = chars.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                chars.next();
            } else {
                break;
            }
        }
        let end = chars.peek().map(|(offset, _)| *offset).unwrap_or(source.len());
        let word = &source[start..end];

        if word.len() > MAX_IDENTIFIER_LENGTH {
            return Err(LexerError::IdentifierTooLong { length: word.len() });
        }

        Ok(classify_word(word))
    }

    fn read_number(
        &mut self,
        pos: Position,
        source: &str,
        chars: &mut CharStream<'_>,
    ) -> Result<Token, LexerError> {
        let start = chars.peek().map(|(offset, _)| *offset).unwrap_or(source.len());
        let invalid = |end: usize| LexerError::InvalidNumber {
            text: source[start..end].to_string(),
            line: pos.line,
            column: pos.column,
        };
        let offset_now =
            |chars: &mut CharStream<'_>| chars.peek().map(|(o, _)| *o).unwrap_or(source.len());

        let is_hex = source[start..].starts_with("0x") || source[start..].starts_with("0X");
        if is_hex {
            chars.next();
            chars.next();
            let digits_start = offset_now(chars);
            while let Some(&(_, ch)) = chars.peek() {
                if ch.is_ascii_alphanumeric() || ch == '_' {
                    chars.next();
                } else {
                    break;
                }
            }
            let end = offset_now(chars);
            return i64::from_str_radix(&source[digits_start..end], 16)
                .map(Token::Integer)
                .map_err(|_| invalid(end));
        }

        while let Some(&(_, ch)) = chars.peek() {
            if ch.is_ascii_digit() {
                chars.next();
            } else {
                break;
            }
        }

        let mut is_float = false;
        if let Some(&(dot, '.')) = chars.peek() {
            let followed_by_digit = source[dot + 1..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_digit());
            if followed_by_digit {
                is_float = true;
                chars.next();
                while let Some(&(_, ch)) = chars.peek() {
                    if ch.is_ascii_digit() {
                        chars.next();
                    } else {
                        break;
                    }
                }
            }
        }

        // A letter glued to a number is never valid
        if let Some(&(_, ch)) = chars.peek() {
            if ch.is_ascii_alphabetic() || ch == '_' {
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        chars.next();
                    } else {
                        break;
                    }
                }
                return Err(invalid(offset_now(chars)));
            }
        }

        let end = offset_now(chars);
        let text = &source[start..end];
        if is_float {
            text.parse::<f64>()
                .map(Token::Float)
                .map_err(|_| invalid(end))
        } else {
            text.parse::<i64>()
                .map(Token::Integer)
                .map_err(|_| invalid(end))
        }
    }

    fn read_string(&mut self, pos: Position, chars: &mut CharStream<'_>) -> Result<Token, LexerError> {
        chars.next();
        let mut content = String::new();

        loop {
            let Some((_, ch)) = chars.next() else {
                return Err(LexerError::UnterminatedString {
                    line: pos.line,
                    column: pos.column,
                });
            };

            match ch {
                '"' => break,
                '\n' | '\r' => {
                    return Err(LexerError::UnterminatedString {
                        line: pos.line,
                        column: pos.column,
                    })
                }
                '\\' => {
                    let escaped = match chars.next() {
                        Some((_, '"')) => '"',
                        Some((_, '\\')) => '\\',
                        Some((_, 'n')) => '\n',
                        Some((_, 't')) => '\t',
                        Some((_, 'r')) => '\r',
                        Some((_, other)) => {
                            return Err(LexerError::InvalidEscape {
                                sequence: other,
                                line: pos.line,
                                column: pos.column,
                            })
                        }
                        None => {
                            return Err(LexerError::UnterminatedString {
                                line: pos.line,
                                column: pos.column,
                            })
                        }
                    };
                    content.push(escaped);
                }
                other => content.push(other),
            }

            if content.len() > MAX_STRING_SIZE {
                return Err(LexerError::StringTooLarge {
                    size: content.len(),
                });
            }
        }

        self.metrics.record_string_length(content.len());
        Ok(Token::StringLiteral(content))
    }

    fn read_line_comment(&mut self, chars: &mut CharStream<'_>) -> Result<Token, LexerError> {
        let mut content = String::new();
        while let Some(&(_, ch)) = chars.peek() {
            if ch == '\n' || ch == '\r' {
                break;
            }
            content.push(ch);
            chars.next();

            if content.len() > MAX_COMMENT_LENGTH {
                return Err(LexerError::CommentTooLong {
                    length: content.len(),
                });
            }
        }

        self.metrics.record_comment_length(content.len());
        Ok(Token::LineComment(content))
    }

    fn read_block_comment(
        &mut self,
        pos: Position,
        chars: &mut CharStream<'_>,
    ) -> Result<Token, LexerError> {
        let mut content = String::new();
        loop {
            match chars.next() {
                Some((_, '*')) if matches!(chars.peek(), Some((_, '/'))) => {
                    chars.next();
                    break;
                }
                Some((_, ch)) => content.push(ch),
                None => {
                    return Err(LexerError::UnterminatedComment {
                        line: pos.line,
                        column: pos.column,
                    })
                }
            }

            if content.len() > MAX_COMMENT_LENGTH {
                return Err(LexerError::CommentTooLong {
                    length: content.len(),
                });
            }
        }

        self.metrics.record_comment_length(content.len());
        Ok(Token::BlockComment(content))
    }
}

fn single(chars: &mut CharStream<'_>, token: Token) -> Token {
    chars.next();
    token
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::keywords::Keyword;
    use assert_matches::assert_matches;

    fn significant(source: &str) -> Vec<Token> {
        let _ = crate::logging::init_global_logging();
        let stream = LexicalAnalyzer::new().tokenize_source(source).unwrap();
        stream
            .iter_significant()
            .map(|t| t.value.clone())
            .collect()
    }

    #[test]
    fn test_tokenize_achievement_call() {
        let tokens = significant("achievement(\"T\", \"D\", 5, byte(0x1234) == 6)");
        assert_eq!(tokens[0], Token::Identifier("achievement".to_string()));
        assert_eq!(tokens[2], Token::StringLiteral("T".to_string()));
        assert_eq!(tokens[6], Token::Integer(5));
        assert!(tokens.contains(&Token::Integer(0x1234)));
        assert!(tokens.contains(&Token::Equal));
        assert_eq!(tokens.last(), Some(&Token::Eof));
    }

    #[test]
    fn test_two_character_operators() {
        let tokens = significant("a => b == c != d <= e >= f && g || !h");
        assert_eq!(
            tokens,
            vec![
                Token::Identifier("a".into()),
                Token::Arrow,
                Token::Identifier("b".into()),
                Token::Equal,
                Token::Identifier("c".into()),
                Token::NotEqual,
                Token::Identifier("d".into()),
                Token::LessEqual,
                Token::Identifier("e".into()),
                Token::GreaterEqual,
                Token::Identifier("f".into()),
                Token::And,
                Token::Identifier("g".into()),
                Token::Or,
                Token::Not,
                Token::Identifier("h".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords_numbers_and_floats() {
        let tokens = significant("function f(x) { return 4.25 }");
        assert_eq!(tokens[0], Token::Keyword(Keyword::Function));
        assert!(tokens.contains(&Token::Keyword(Keyword::Return)));
        assert!(tokens.contains(&Token::Float(4.25)));
    }

    #[test]
    fn test_comments_are_kept_but_not_significant() {
        let _ = crate::logging::init_global_logging();
        let stream = LexicalAnalyzer::new()
            .tokenize_source("// header\nx = 1 /* inline */\n")
            .unwrap();
        let comments: Vec<_> = stream.comments().map(|t| t.value.clone()).collect();
        assert_eq!(
            comments,
            vec![
                Token::LineComment(" header".to_string()),
                Token::BlockComment(" inline ".to_string())
            ]
        );
        assert_eq!(stream.comments().next().unwrap().span.start.line, 1);
        let x = stream.iter_significant().next().unwrap();
        assert_eq!(x.span.start.line, 2);
        assert_eq!(x.span.start.column, 1);
    }

    #[test]
    fn test_string_escapes() {
        let tokens = significant(r#""say \"hi\"\n""#);
        assert_eq!(tokens[0], Token::StringLiteral("say \"hi\"\n".to_string()));
    }

    #[test]
    fn test_crlf_is_single_newline() {
        let _ = crate::logging::init_global_logging();
        let stream = LexicalAnalyzer::new().tokenize_source("a\r\nb").unwrap();
        let b = stream.iter_significant().nth(1).unwrap();
        assert_eq!(b.span.start.line, 2);
        assert_eq!(b.span.start.column, 1);
    }

    #[test]
    fn test_lexer_errors() {
        let _ = crate::logging::init_global_logging();
        let mut lexer = LexicalAnalyzer::new();
        assert_matches!(
            lexer.tokenize_source("x = \"open"),
            Err(LexerError::UnterminatedString { line: 1, column: 5 })
        );
        assert_matches!(
            lexer.tokenize_source("x = 12ab"),
            Err(LexerError::InvalidNumber { .. })
        );
        assert_matches!(
            lexer.tokenize_source("/* never closed"),
            Err(LexerError::UnterminatedComment { .. })
        );
        assert_matches!(
            lexer.tokenize_source("a\n  @"),
            Err(LexerError::InvalidCharacter {
                character: '@',
                line: 2,
                column: 3
            })
        );
        assert_matches!(
            lexer.tokenize_source("\"\\q\""),
            Err(LexerError::InvalidEscape { sequence: 'q', .. })
        );
    }

    #[test]
    fn test_metrics_are_recorded() {
        let _ = crate::logging::init_global_logging();
        let mut lexer = LexicalAnalyzer::new();
        lexer.tokenize_source("if (a == 1) { b = \"xyz\" }").unwrap();
        let metrics = lexer.metrics();
        assert_eq!(metrics.keyword_tokens, 1);
        assert_eq!(metrics.identifier_tokens, 2);
        assert_eq!(metrics.max_string_length, 3);
    }
}
