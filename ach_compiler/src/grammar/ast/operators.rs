//! Operators of the script language and their binding priorities
use crate::requirements::RequirementOperator;
use crate::tokens::Token;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Binding strength, weakest first. A binary operator parses its right
/// operand at `priority.next()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OperationPriority {
    None,
    Assign,
    Or,
    And,
    Compare,
    BitwiseAnd,
    BitwiseXor,
    AppendString,
    Add,
    Multiply,
    Not,
    Negate,
    Parenthesis,
}

impl OperationPriority {
    pub fn next(self) -> Self {
        match self {
            Self::None => Self::Assign,
            Self::Assign => Self::Or,
            Self::Or => Self::And,
            Self::And => Self::Compare,
            Self::Compare => Self::BitwiseAnd,
            Self::BitwiseAnd => Self::BitwiseXor,
            Self::BitwiseXor => Self::AppendString,
            Self::AppendString => Self::Add,
            Self::Add => Self::Multiply,
            Self::Multiply => Self::Not,
            Self::Not => Self::Negate,
            Self::Negate | Self::Parenthesis => Self::Parenthesis,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MathematicOperation {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulus,
    BitwiseAnd,
    BitwiseXor,
}

impl MathematicOperation {
    pub fn from_token(token: &Token) -> Option<Self> {
        match token {
            Token::Plus => Some(Self::Add),
            Token::Minus => Some(Self::Subtract),
            Token::Multiply => Some(Self::Multiply),
            Token::Divide => Some(Self::Divide),
            Token::Modulus => Some(Self::Modulus),
            Token::BitwiseAnd => Some(Self::BitwiseAnd),
            Token::BitwiseXor => Some(Self::BitwiseXor),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulus => "%",
            Self::BitwiseAnd => "&",
            Self::BitwiseXor => "^",
        }
    }

    pub fn priority(self) -> OperationPriority {
        match self {
            Self::Add | Self::Subtract => OperationPriority::Add,
            Self::Multiply | Self::Divide | Self::Modulus => OperationPriority::Multiply,
            Self::BitwiseAnd => OperationPriority::BitwiseAnd,
            Self::BitwiseXor => OperationPriority::BitwiseXor,
        }
    }

    /// `a op b == b op a`
    pub fn is_commutative(self) -> bool {
        matches!(
            self,
            Self::Add | Self::Multiply | Self::BitwiseAnd | Self::BitwiseXor
        )
    }

    /// Modifier used when the operation scales a single accumulated term
    pub fn requirement_operator(self) -> RequirementOperator {
        match self {
            Self::Add => RequirementOperator::Add,
            Self::Subtract => RequirementOperator::Subtract,
            Self::Multiply => RequirementOperator::Multiply,
            Self::Divide => RequirementOperator::Divide,
            Self::Modulus => RequirementOperator::Modulus,
            Self::BitwiseAnd => RequirementOperator::BitwiseAnd,
            Self::BitwiseXor => RequirementOperator::BitwiseXor,
        }
    }
}

impl fmt::Display for MathematicOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOperation {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl ComparisonOperation {
    pub fn from_token(token: &Token) -> Option<Self> {
        match token {
            Token::Equal => Some(Self::Equal),
            Token::NotEqual => Some(Self::NotEqual),
            Token::Less => Some(Self::LessThan),
            Token::LessEqual => Some(Self::LessThanOrEqual),
            Token::Greater => Some(Self::GreaterThan),
            Token::GreaterEqual => Some(Self::GreaterThanOrEqual),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
        }
    }

    /// Operator that keeps the meaning when the operands swap sides
    pub fn reverse(self) -> Self {
        match self {
            Self::LessThan => Self::GreaterThan,
            Self::LessThanOrEqual => Self::GreaterThanOrEqual,
            Self::GreaterThan => Self::LessThan,
            Self::GreaterThanOrEqual => Self::LessThanOrEqual,
            other => other,
        }
    }

    /// Logical negation
    pub fn opposite(self) -> Self {
        match self {
            Self::Equal => Self::NotEqual,
            Self::NotEqual => Self::Equal,
            Self::LessThan => Self::GreaterThanOrEqual,
            Self::LessThanOrEqual => Self::GreaterThan,
            Self::GreaterThan => Self::LessThanOrEqual,
            Self::GreaterThanOrEqual => Self::LessThan,
        }
    }

    pub fn requirement_operator(self) -> RequirementOperator {
        match self {
            Self::Equal => RequirementOperator::Equal,
            Self::NotEqual => RequirementOperator::NotEqual,
            Self::LessThan => RequirementOperator::LessThan,
            Self::LessThanOrEqual => RequirementOperator::LessThanOrEqual,
            Self::GreaterThan => RequirementOperator::GreaterThan,
            Self::GreaterThanOrEqual => RequirementOperator::GreaterThanOrEqual,
        }
    }

    pub fn compare<T: PartialOrd>(self, left: T, right: T) -> bool {
        match self {
            Self::Equal => left == right,
            Self::NotEqual => left != right,
            Self::LessThan => left < right,
            Self::LessThanOrEqual => left <= right,
            Self::GreaterThan => left > right,
            Self::GreaterThanOrEqual => left >= right,
        }
    }
}

impl fmt::Display for ComparisonOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionalOperation {
    And,
    Or,
    Not,
}

impl ConditionalOperation {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::And => "&&",
            Self::Or => "||",
            Self::Not => "!",
        }
    }

    /// The operand value that leaves the result unchanged
    pub fn identity(self) -> Option<bool> {
        match self {
            Self::And => Some(true),
            Self::Or => Some(false),
            Self::Not => None,
        }
    }

    /// De Morgan counterpart
    pub fn inverse(self) -> Self {
        match self {
            Self::And => Self::Or,
            Self::Or => Self::And,
            Self::Not => Self::Not,
        }
    }
}

impl fmt::Display for ConditionalOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
