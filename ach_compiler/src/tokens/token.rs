//! Token definitions for achievement scripts
//!
//! Comments and whitespace are real tokens so the incremental engine can
//! group comment runs, but they are not significant to the parser.
use crate::grammar::keywords::Keyword;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Token {
    /// Statement keywords
    Keyword(Keyword),

    // Assignment and comparison
    Assign,             // =
    Equal,              // ==
    NotEqual,           // !=
    Less,               // <
    LessEqual,          // <=
    Greater,            // >
    GreaterEqual,       // >=

    // Arithmetic and bitwise
    Plus,       // +
    Minus,      // -
    Multiply,   // *
    Divide,     // /
    Modulus,    // %
    BitwiseAnd, // &
    BitwiseXor, // ^

    // Logical
    And, // &&
    Or,  // ||
    Not, // !

    /// Lambda arrow (=>)
    Arrow,

    // Punctuation
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    Comma,
    Colon,

    // Literals
    StringLiteral(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),

    Identifier(String),

    // Trivia
    Space,
    Tab,
    Newline,
    /// `// text` up to the end of the line
    LineComment(String),
    /// `/* text */`, possibly spanning lines
    BlockComment(String),

    Eof,
}

impl Token {
    pub fn is_comparison_operator(&self) -> bool {
        matches!(
            self,
            Self::Equal
                | Self::NotEqual
                | Self::Less
                | Self::LessEqual
                | Self::Greater
                | Self::GreaterEqual
        )
    }

    pub fn is_arithmetic_operator(&self) -> bool {
        matches!(
            self,
            Self::Plus
                | Self::Minus
                | Self::Multiply
                | Self::Divide
                | Self::Modulus
                | Self::BitwiseAnd
                | Self::BitwiseXor
        )
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Self::StringLiteral(_) | Self::Integer(_) | Self::Float(_) | Self::Boolean(_)
        )
    }

    pub fn is_identifier(&self) -> bool {
        matches!(self, Self::Identifier(_))
    }

    pub fn is_comment(&self) -> bool {
        matches!(self, Self::LineComment(_) | Self::BlockComment(_))
    }

    pub fn is_whitespace(&self) -> bool {
        matches!(self, Self::Space | Self::Tab | Self::Newline)
    }

    /// Whitespace and comments are skipped by the parser
    pub fn is_significant(&self) -> bool {
        !self.is_whitespace() && !self.is_comment()
    }

    pub fn as_keyword(&self) -> Option<Keyword> {
        match self {
            Self::Keyword(kw) => Some(*kw),
            _ => None,
        }
    }

    pub fn as_identifier(&self) -> Option<&str> {
        match self {
            Self::Identifier(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        matches!(self, Self::Keyword(kw) if *kw == keyword)
    }

    /// The token as it would be written in a script
    pub fn as_source_string(&self) -> String {
        match self {
            Self::Keyword(kw) => kw.as_str().to_string(),
            Self::Assign => "=".to_string(),
            Self::Equal => "==".to_string(),
            Self::NotEqual => "!=".to_string(),
            Self::Less => "<".to_string(),
            Self::LessEqual => "<=".to_string(),
            Self::Greater => ">".to_string(),
            Self::GreaterEqual => ">=".to_string(),
            Self::Plus => "+".to_string(),
            Self::Minus => "-".to_string(),
            Self::Multiply => "*".to_string(),
            Self::Divide => "/".to_string(),
            Self::Modulus => "%".to_string(),
            Self::BitwiseAnd => "&".to_string(),
            Self::BitwiseXor => "^".to_string(),
            Self::And => "&&".to_string(),
            Self::Or => "||".to_string(),
            Self::Not => "!".to_string(),
            Self::Arrow => "=>".to_string(),
            Self::LeftParen => "(".to_string(),
            Self::RightParen => ")".to_string(),
            Self::LeftBracket => "[".to_string(),
            Self::RightBracket => "]".to_string(),
            Self::LeftBrace => "{".to_string(),
            Self::RightBrace => "}".to_string(),
            Self::Comma => ",".to_string(),
            Self::Colon => ":".to_string(),
            Self::StringLiteral(s) => format!("\"{}\"", escape_string(s)),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => format!("{:?}", f),
            Self::Boolean(b) => b.to_string(),
            Self::Identifier(id) => id.clone(),
            Self::Space => " ".to_string(),
            Self::Tab => "\t".to_string(),
            Self::Newline => "\n".to_string(),
            Self::LineComment(text) => format!("//{}", text),
            Self::BlockComment(text) => format!("/*{}*/", text),
            Self::Eof => "<EOF>".to_string(),
        }
    }

    pub fn token_class(&self) -> TokenClass {
        match self {
            Self::Keyword(_) => TokenClass::Keyword,
            Self::StringLiteral(_) | Self::Integer(_) | Self::Float(_) | Self::Boolean(_) => {
                TokenClass::Literal
            }
            Self::Identifier(_) => TokenClass::Identifier,
            Self::LeftParen
            | Self::RightParen
            | Self::LeftBracket
            | Self::RightBracket
            | Self::LeftBrace
            | Self::RightBrace
            | Self::Comma
            | Self::Colon => TokenClass::Punctuation,
            Self::Space | Self::Tab | Self::Newline => TokenClass::Whitespace,
            Self::LineComment(_) | Self::BlockComment(_) => TokenClass::Comment,
            Self::Eof => TokenClass::Special,
            _ => TokenClass::Operator,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_source_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenClass {
    Keyword,
    Operator,
    Literal,
    Identifier,
    Punctuation,
    Whitespace,
    Comment,
    Special,
}

/// Classify a word as a keyword, boolean literal or identifier
pub fn classify_word(word: &str) -> Token {
    if let Some(keyword) = Keyword::from_str(word) {
        return Token::Keyword(keyword);
    }
    match word {
        "true" => Token::Boolean(true),
        "false" => Token::Boolean(false),
        _ => Token::Identifier(word.to_string()),
    }
}

/// Map a one or two character operator to its token
pub fn classify_operator_symbol(symbol: &str) -> Option<Token> {
    match symbol {
        "=" => Some(Token::Assign),
        "==" => Some(Token::Equal),
        "!=" => Some(Token::NotEqual),
        "<" => Some(Token::Less),
        "<=" => Some(Token::LessEqual),
        ">" => Some(Token::Greater),
        ">=" => Some(Token::GreaterEqual),
        "+" => Some(Token::Plus),
        "-" => Some(Token::Minus),
        "*" => Some(Token::Multiply),
        "/" => Some(Token::Divide),
        "%" => Some(Token::Modulus),
        "&" => Some(Token::BitwiseAnd),
        "^" => Some(Token::BitwiseXor),
        "&&" => Some(Token::And),
        "||" => Some(Token::Or),
        "!" => Some(Token::Not),
        "=>" => Some(Token::Arrow),
        _ => None,
    }
}

/// Escape a string value for display inside double quotes
pub fn escape_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push_str("\\t"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_word() {
        assert_eq!(classify_word("if"), Token::Keyword(Keyword::If));
        assert_eq!(classify_word("true"), Token::Boolean(true));
        assert_eq!(classify_word("byte"), Token::Identifier("byte".to_string()));
    }

    #[test]
    fn test_operator_symbols() {
        assert_eq!(classify_operator_symbol("=="), Some(Token::Equal));
        assert_eq!(classify_operator_symbol("=>"), Some(Token::Arrow));
        assert_eq!(classify_operator_symbol("&&"), Some(Token::And));
        assert_eq!(classify_operator_symbol("<>"), None);
    }

    #[test]
    fn test_trivia_is_not_significant() {
        assert!(!Token::LineComment(" note".to_string()).is_significant());
        assert!(!Token::Newline.is_significant());
        assert!(Token::Eof.is_significant());
        assert_eq!(Token::Comma.token_class(), TokenClass::Punctuation);
    }

    #[test]
    fn test_string_display_escapes() {
        let token = Token::StringLiteral("say \"hi\"\n".to_string());
        assert_eq!(token.to_string(), "\"say \\\"hi\\\"\\n\"");
    }
}
