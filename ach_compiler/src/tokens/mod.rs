//! Token system for achievement scripts
//!
//! - [`Token`] enumerates keywords, operators, punctuation, literals,
//!   identifiers and trivia (whitespace and comments)
//! - [`TokenStream`] walks significant tokens with lookahead while keeping the full token list for comment grouping
//!
//! All tokens carry spans so every later stage can report precise locations.

pub mod token;
pub mod token_stream;

pub use token::{classify_operator_symbol, classify_word, escape_string, Token, TokenClass};
pub use token_stream::{SpannedToken, TokenStream};

pub use crate::utils::{Position, SourceMap, Span, Spanned};
