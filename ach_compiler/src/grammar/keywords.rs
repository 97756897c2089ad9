//! Reserved words of the achievement script language
use serde::{Deserialize, Serialize};

/// Statement keywords. `true` and `false` are lexed as boolean literals and
/// never reach this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Keyword {
    Function,
    If,
    Else,
    For,
    In,
    Return,
    Break,
}

impl Keyword {
    /// Get the exact string representation as it appears in script source
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::If => "if",
            Self::Else => "else",
            Self::For => "for",
            Self::In => "in",
            Self::Return => "return",
            Self::Break => "break",
        }
    }

    pub fn from_str(word: &str) -> Option<Self> {
        match word {
            "function" => Some(Self::Function),
            "if" => Some(Self::If),
            "else" => Some(Self::Else),
            "for" => Some(Self::For),
            "in" => Some(Self::In),
            "return" => Some(Self::Return),
            "break" => Some(Self::Break),
            _ => None,
        }
    }

    /// Keywords that begin a statement
    pub fn starts_statement(self) -> bool {
        matches!(
            self,
            Self::Function | Self::If | Self::For | Self::Return | Self::Break
        )
    }

    pub fn all() -> &'static [Keyword] {
        &[
            Self::Function,
            Self::If,
            Self::Else,
            Self::For,
            Self::In,
            Self::Return,
            Self::Break,
        ]
    }
}

impl std::fmt::Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check whether a word is reserved
pub fn is_reserved_word(word: &str) -> bool {
    Keyword::from_str(word).is_some() || matches!(word, "true" | "false")
}
