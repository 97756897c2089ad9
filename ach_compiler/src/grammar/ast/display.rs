//! Script-like text for expression nodes, used in diagnostics and when a
//! value is converted to a string

use super::nodes::{Expression, ExpressionKind};
use super::operators::{ConditionalOperation, OperationPriority};
use std::fmt;

fn write_list(f: &mut fmt::Formatter<'_>, items: &[super::nodes::ExprRef]) -> fmt::Result {
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl Expression {
    fn priority(&self) -> OperationPriority {
        match &self.kind {
            ExpressionKind::Mathematic { operation, .. } => operation.priority(),
            ExpressionKind::Comparison { .. } => OperationPriority::Compare,
            ExpressionKind::Conditional { operation, .. } => match operation {
                ConditionalOperation::And => OperationPriority::And,
                ConditionalOperation::Or => OperationPriority::Or,
                ConditionalOperation::Not => OperationPriority::Not,
            },
            ExpressionKind::Assignment { .. } => OperationPriority::Assign,
            _ => OperationPriority::Parenthesis,
        }
    }

    /// Write `child`, parenthesized when it binds weaker than `parent`
    fn write_operand(
        f: &mut fmt::Formatter<'_>,
        child: &Expression,
        parent: OperationPriority,
    ) -> fmt::Result {
        if child.priority() < parent || (child.is_logical_unit && child.priority() != OperationPriority::Parenthesis) {
            write!(f, "({})", child)
        } else {
            write!(f, "{}", child)
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExpressionKind::Integer(value) => write!(f, "{}", value),
            ExpressionKind::Float(value) => write!(f, "{:?}", value),
            ExpressionKind::String(value) => {
                write!(f, "\"{}\"", crate::tokens::escape_string(value))
            }
            ExpressionKind::Boolean(value) => write!(f, "{}", value),
            ExpressionKind::AlwaysTrue => f.write_str("always_true()"),
            ExpressionKind::AlwaysFalse => f.write_str("always_false()"),
            ExpressionKind::Variable(name) => f.write_str(name),
            ExpressionKind::Assignment { target, value } => write!(f, "{} = {}", target, value),
            ExpressionKind::Mathematic {
                left,
                operation,
                right,
            } => {
                let priority = operation.priority();
                Self::write_operand(f, left, priority)?;
                write!(f, " {} ", operation)?;
                Self::write_operand(f, right, priority.next())
            }
            ExpressionKind::Comparison {
                left,
                operation,
                right,
            } => {
                Self::write_operand(f, left, OperationPriority::Compare.next())?;
                write!(f, " {} ", operation)?;
                Self::write_operand(f, right, OperationPriority::Compare.next())
            }
            ExpressionKind::Conditional {
                operation: ConditionalOperation::Not,
                operands,
            } => {
                f.write_str("!")?;
                for operand in operands {
                    Self::write_operand(f, operand, OperationPriority::Parenthesis)?;
                }
                Ok(())
            }
            ExpressionKind::Conditional {
                operation,
                operands,
            } => {
                let priority = self.priority();
                for (index, operand) in operands.iter().enumerate() {
                    if index > 0 {
                        write!(f, " {} ", operation)?;
                    }
                    Self::write_operand(f, operand, priority.next())?;
                }
                Ok(())
            }
            ExpressionKind::Negate(inner) => {
                f.write_str("-")?;
                Self::write_operand(f, inner, OperationPriority::Parenthesis)
            }
            ExpressionKind::FunctionCall { name, arguments } => {
                write!(f, "{}(", name)?;
                write_list(f, arguments)?;
                f.write_str(")")
            }
            ExpressionKind::Index { target, index } => write!(f, "{}[{}]", target, index),
            ExpressionKind::ArrayLiteral(items) => {
                f.write_str("[")?;
                write_list(f, items)?;
                f.write_str("]")
            }
            ExpressionKind::Array(items) => {
                f.write_str("[")?;
                write_list(f, &items.borrow())?;
                f.write_str("]")
            }
            ExpressionKind::DictionaryLiteral(entries) => {
                f.write_str("{")?;
                for (index, (key, value)) in entries.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                f.write_str("}")
            }
            ExpressionKind::Dictionary(entries) => {
                f.write_str("{")?;
                for (index, (key, value)) in entries.borrow().iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                f.write_str("}")
            }
            ExpressionKind::FunctionDefinition(definition)
            | ExpressionKind::FunctionReference {
                function: definition,
                ..
            } => {
                if definition.is_lambda {
                    write!(f, "({}) => ...", definition.parameters.join(", "))
                } else {
                    write!(
                        f,
                        "function {}({})",
                        definition.name,
                        definition.parameters.join(", ")
                    )
                }
            }
            ExpressionKind::If { condition, .. } => write!(f, "if ({}) {{ ... }}", condition),
            ExpressionKind::For {
                iterator, range, ..
            } => write!(f, "for {} in {} {{ ... }}", iterator, range),
            ExpressionKind::Return(Some(value)) => write!(f, "return {}", value),
            ExpressionKind::Return(None) => f.write_str("return"),
            ExpressionKind::Break => f.write_str("break"),
            ExpressionKind::Comment(text) => f.write_str(text),
            ExpressionKind::Error(error) => write!(f, "error: {}", error.message),
            ExpressionKind::MemoryAccessor { size, address } => match address.as_integer() {
                Some(value) => write!(f, "{}(0x{:06X})", size.function_name(), value),
                None => write!(f, "{}({})", size.function_name(), address),
            },
            ExpressionKind::MemoryModifier { modifier, accessor } => {
                write!(f, "{}({})", modifier.function_name(), accessor)
            }
            ExpressionKind::Recall => f.write_str("recall()"),
            ExpressionKind::Behavioral {
                behavior,
                condition,
            } => write!(f, "{}({})", behavior.function_name(), condition),
            ExpressionKind::Measured {
                value,
                when,
                percent,
            } => {
                write!(f, "measured({}", value)?;
                if let Some(when) = when {
                    write!(f, ", when={}", when)?;
                }
                if *percent {
                    f.write_str(", format=\"percent\"")?;
                }
                f.write_str(")")
            }
            ExpressionKind::Tallied { target, conditions } => match conditions.as_slice() {
                [single] if *target == 1 => write!(f, "once({})", single),
                [single] => write!(f, "repeated({}, {})", target, single),
                _ => {
                    write!(f, "tally({}, ", target)?;
                    write_list(f, conditions)?;
                    f.write_str(")")
                }
            },
            ExpressionKind::Deduct(inner) => write!(f, "deduct({})", inner),
            ExpressionKind::MaxOf(values) => {
                f.write_str("max_of(")?;
                write_list(f, values)?;
                f.write_str(")")
            }
            ExpressionKind::RichPresenceValue {
                name,
                value,
                format,
            } => write!(
                f,
                "rich_presence_value(\"{}\", {}, format=\"{}\")",
                name,
                value,
                format.as_str()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::syntax::parse_source;

    fn round_trip(source: &str) -> String {
        parse_source(source)
            .iter()
            .map(|statement| statement.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_precedence_parentheses_are_kept_where_needed() {
        assert_eq!(round_trip("x = (a + b) * 2"), "x = (a + b) * 2");
        assert_eq!(round_trip("x = a + b * 2"), "x = a + b * 2");
        assert_eq!(round_trip("x = a - (b - c)"), "x = a - (b - c)");
    }

    #[test]
    fn test_logic_and_calls() {
        assert_eq!(
            round_trip("t = byte(0x10) == 1 && (word(0x20) > 3 || !f(2, x = 4))"),
            "t = byte(16) == 1 && (word(32) > 3 || !f(2, x = 4))"
        );
    }
}
