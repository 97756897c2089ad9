//! Constant folding, identity pruning and rebalancing of `+ - * / % & ^`

use super::normalization_error;
use crate::grammar::ast::{ExprRef, Expression, ExpressionKind, MathematicOperation};
use crate::interpreter::{ErrorExpression, EvaluationResult};
use crate::logging::codes;
use crate::utils::Span;
use std::rc::Rc;

/// A numeric literal
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Integer(i64),
    Float(f64),
}

impl Number {
    pub fn of(expression: &Expression) -> Option<Self> {
        match expression.kind {
            ExpressionKind::Integer(value) => Some(Self::Integer(value)),
            ExpressionKind::Float(value) => Some(Self::Float(value)),
            _ => None,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Self::Integer(value) => value as f64,
            Self::Float(value) => value,
        }
    }

    pub fn is_zero(self) -> bool {
        self.as_f64() == 0.0
    }

    pub fn is_one(self) -> bool {
        self.as_f64() == 1.0
    }

    pub fn is_negative(self) -> bool {
        self.as_f64() < 0.0
    }

    pub fn negate(self) -> Self {
        match self {
            Self::Integer(value) => Self::Integer(value.wrapping_neg()),
            Self::Float(value) => Self::Float(-value),
        }
    }

    pub fn into_expression(self, span: Span) -> ExprRef {
        match self {
            Self::Integer(value) => Expression::integer(value, span),
            Self::Float(value) => Expression::float(value, span),
        }
    }
}

/// Apply `operation` to two known numbers
pub fn fold_numbers(
    left: Number,
    operation: MathematicOperation,
    right: Number,
    span: Span,
) -> EvaluationResult<Number> {
    use MathematicOperation::*;

    if matches!(operation, Divide | Modulus) && right.is_zero() {
        return Err(normalization_error(
            codes::normalization::DIVISION_BY_ZERO,
            "Division by zero",
            span,
        ));
    }

    match (left, right) {
        (Number::Integer(l), Number::Integer(r)) => Ok(Number::Integer(match operation {
            Add => l.wrapping_add(r),
            Subtract => l.wrapping_sub(r),
            Multiply => l.wrapping_mul(r),
            Divide => l.wrapping_div(r),
            Modulus => l.wrapping_rem(r),
            BitwiseAnd => l & r,
            BitwiseXor => l ^ r,
        })),
        _ => {
            let (l, r) = (left.as_f64(), right.as_f64());
            Ok(Number::Float(match operation {
                Add => l + r,
                Subtract => l - r,
                Multiply => l * r,
                Divide => l / r,
                Modulus => l % r,
                BitwiseAnd | BitwiseXor => {
                    return Err(ErrorExpression::type_error(
                        format!("Cannot apply '{}' to a float", operation),
                        span,
                    ))
                }
            }))
        }
    }
}

/// Operand kinds that can take part in arithmetic
fn is_arithmetic_operand(expression: &Expression) -> bool {
    matches!(
        expression.kind,
        ExpressionKind::Integer(_)
            | ExpressionKind::Float(_)
            | ExpressionKind::MemoryAccessor { .. }
            | ExpressionKind::MemoryModifier { .. }
            | ExpressionKind::Recall
            | ExpressionKind::Mathematic { .. }
    )
}

/// Text used when a value is appended to a string
fn string_fragment(expression: &Expression) -> Option<String> {
    match &expression.kind {
        ExpressionKind::String(value) => Some(value.clone()),
        ExpressionKind::Integer(value) => Some(value.to_string()),
        ExpressionKind::Float(value) => Some(value.to_string()),
        ExpressionKind::Boolean(value) => Some(value.to_string()),
        _ => None,
    }
}

fn node(left: ExprRef, operation: MathematicOperation, right: ExprRef, span: Span) -> ExprRef {
    Expression::expanded(
        ExpressionKind::Mathematic {
            left,
            operation,
            right,
        },
        span,
    )
}

/// Combine two evaluated operands
pub fn combine_mathematic(
    left: &ExprRef,
    operation: MathematicOperation,
    right: &ExprRef,
    span: Span,
) -> EvaluationResult<ExprRef> {
    use MathematicOperation::*;

    // String concatenation
    if matches!(left.kind, ExpressionKind::String(_)) || matches!(right.kind, ExpressionKind::String(_)) {
        if operation != Add {
            return Err(ErrorExpression::type_error(
                format!("Cannot apply '{}' to a string", operation),
                span,
            ));
        }
        return match (string_fragment(left), string_fragment(right)) {
            (Some(l), Some(r)) => Ok(Expression::string(l + &r, span)),
            _ => {
                let other = if left.as_string().is_some() { right } else { left };
                Err(ErrorExpression::type_error(
                    format!("Cannot append {} to a string", other.type_name()),
                    span,
                ))
            }
        };
    }

    for operand in [left, right] {
        if !is_arithmetic_operand(operand) {
            return Err(ErrorExpression::type_error(
                format!("Cannot apply '{}' to {}", operation, operand.type_name()),
                operand.span,
            ));
        }
    }

    let left_number = Number::of(left);
    let right_number = Number::of(right);

    if let (Some(l), Some(r)) = (left_number, right_number) {
        return Ok(fold_numbers(l, operation, r, span)?.into_expression(span));
    }

    if let Some(r) = right_number {
        return combine_with_constant(left, operation, r, right, span);
    }

    if let Some(l) = left_number {
        match operation {
            Add | BitwiseXor if l.is_zero() => return Ok(Rc::clone(right)),
            Multiply if l.is_one() => return Ok(Rc::clone(right)),
            Multiply | BitwiseAnd if l.is_zero() => return Ok(Number::Integer(0).into_expression(span)),
            _ => {}
        }
        if operation.is_commutative() {
            return combine_with_constant(right, operation, l, left, span);
        }
        return Ok(node(Rc::clone(left), operation, Rc::clone(right), span));
    }

    // Pull a trailing constant out of the right operand: a + (b - 2) => (a + b) - 2
    if matches!(operation, Add | Subtract) && !right.is_logical_unit {
        if let ExpressionKind::Mathematic {
            left: inner_left,
            operation: inner_operation @ (Add | Subtract),
            right: inner_right,
        } = &right.kind
        {
            if let Some(constant) = Number::of(inner_right) {
                let merged = combine_mathematic(left, operation, inner_left, span)?;
                let constant_operation = match (operation, *inner_operation) {
                    (Add, Add) | (Subtract, Subtract) => Add,
                    _ => Subtract,
                };
                return combine_with_constant(
                    &merged,
                    constant_operation,
                    constant,
                    inner_right,
                    span,
                );
            }
        }
    }

    Ok(node(Rc::clone(left), operation, Rc::clone(right), span))
}

/// `left op constant` where `left` is not a literal
fn combine_with_constant(
    left: &ExprRef,
    operation: MathematicOperation,
    constant: Number,
    constant_node: &ExprRef,
    span: Span,
) -> EvaluationResult<ExprRef> {
    use MathematicOperation::*;

    match operation {
        Divide | Modulus if constant.is_zero() => {
            return Err(normalization_error(
                codes::normalization::DIVISION_BY_ZERO,
                "Division by zero",
                span,
            ))
        }
        Add | Subtract | BitwiseXor if constant.is_zero() => return Ok(Rc::clone(left)),
        Multiply | Divide if constant.is_one() => return Ok(Rc::clone(left)),
        Multiply | BitwiseAnd if constant.is_zero() => {
            return Ok(Number::Integer(0).into_expression(span))
        }
        Modulus if constant.is_one() => return Ok(Number::Integer(0).into_expression(span)),
        Add | Subtract if constant.is_negative() => {
            let flipped = if operation == Add { Subtract } else { Add };
            let positive = constant.negate();
            return combine_with_constant(
                left,
                flipped,
                positive,
                &positive.into_expression(constant_node.span),
                span,
            );
        }
        _ => {}
    }

    if !left.is_logical_unit {
        if let Some(rebalanced) = rebalance(left, operation, constant, span)? {
            return Ok(rebalanced);
        }
    }

    Ok(node(Rc::clone(left), operation, Rc::clone(constant_node), span))
}

/// Merge a constant into the trailing constant of a same-precedence chain:
/// `(x + 3) - 1 => x + 2`, `(x * 4) / 2 => x * 2`. Multiply and divide only
/// merge when no precision is lost.
fn rebalance(
    left: &ExprRef,
    operation: MathematicOperation,
    constant: Number,
    span: Span,
) -> EvaluationResult<Option<ExprRef>> {
    use MathematicOperation::*;

    let ExpressionKind::Mathematic {
        left: inner_left,
        operation: inner_operation,
        right: inner_right,
    } = &left.kind
    else {
        return Ok(None);
    };
    let Some(inner_constant) = Number::of(inner_right) else {
        return Ok(None);
    };

    match (*inner_operation, operation) {
        (Add | Subtract, Add | Subtract) => {
            let signed = |op: MathematicOperation, n: Number| if op == Add { n } else { n.negate() };
            let total = fold_numbers(
                signed(*inner_operation, inner_constant),
                Add,
                signed(operation, constant),
                span,
            )?;
            let total_node = total.into_expression(span);
            combine_mathematic(inner_left, Add, &total_node, span).map(Some)
        }
        (Multiply, Multiply) => {
            let product = fold_numbers(inner_constant, Multiply, constant, span)?;
            combine_mathematic(inner_left, Multiply, &product.into_expression(span), span).map(Some)
        }
        (Multiply, Divide) => match (inner_constant, constant) {
            (Number::Integer(factor), Number::Integer(divisor)) if factor > 0 && divisor > 0 => {
                if factor % divisor == 0 {
                    let merged = Number::Integer(factor / divisor).into_expression(span);
                    combine_mathematic(inner_left, Multiply, &merged, span).map(Some)
                } else if divisor % factor == 0 {
                    let merged = Number::Integer(divisor / factor).into_expression(span);
                    combine_mathematic(inner_left, Divide, &merged, span).map(Some)
                } else {
                    Ok(None)
                }
            }
            _ => Ok(None),
        },
        (Divide, Divide) => match (inner_constant, constant) {
            (Number::Integer(first), Number::Integer(second)) if first > 0 && second > 0 => {
                let merged = Number::Integer(first.saturating_mul(second)).into_expression(span);
                combine_mathematic(inner_left, Divide, &merged, span).map(Some)
            }
            _ => Ok(None),
        },
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::ErrorKind;
    use crate::requirements::FieldSize;
    use assert_matches::assert_matches;

    fn span() -> Span {
        Span::dummy()
    }

    fn int(value: i64) -> ExprRef {
        Expression::integer(value, span())
    }

    fn byte(address: i64) -> ExprRef {
        Expression::expanded(
            ExpressionKind::MemoryAccessor {
                size: FieldSize::Byte,
                address: int(address),
            },
            span(),
        )
    }

    fn combine(left: &ExprRef, operation: MathematicOperation, right: &ExprRef) -> ExprRef {
        combine_mathematic(left, operation, right, span()).unwrap()
    }

    #[test]
    fn test_constant_folding() {
        assert_eq!(combine(&int(2), MathematicOperation::Add, &int(3)).as_integer(), Some(5));
        assert_eq!(combine(&int(7), MathematicOperation::Divide, &int(2)).as_integer(), Some(3));
        assert_eq!(combine(&int(7), MathematicOperation::Modulus, &int(4)).as_integer(), Some(3));
        assert_eq!(
            combine(&int(1), MathematicOperation::Divide, &Expression::float(2.0, span())).as_number(),
            Some(0.5)
        );
        assert_eq!(
            combine(&Expression::string("a", span()), MathematicOperation::Add, &int(1)).as_string(),
            Some("a1")
        );
    }

    #[test]
    fn test_division_by_zero() {
        let error = combine_mathematic(&int(4), MathematicOperation::Divide, &int(0), span()).unwrap_err();
        assert_eq!(error.kind, ErrorKind::Semantic);
        let error = combine_mathematic(&byte(1), MathematicOperation::Modulus, &int(0), span()).unwrap_err();
        assert_eq!(error.message, "Division by zero");
    }

    #[test]
    fn test_identities() {
        let x = byte(0x10);
        assert!(Rc::ptr_eq(&combine(&x, MathematicOperation::Add, &int(0)), &x));
        assert!(Rc::ptr_eq(&combine(&x, MathematicOperation::Multiply, &int(1)), &x));
        assert!(Rc::ptr_eq(&combine(&int(1), MathematicOperation::Multiply, &x), &x));
        assert_eq!(combine(&x, MathematicOperation::Multiply, &int(0)).as_integer(), Some(0));
        assert_eq!(combine(&x, MathematicOperation::BitwiseAnd, &int(0)).as_integer(), Some(0));
        assert_eq!(combine(&x, MathematicOperation::Modulus, &int(1)).as_integer(), Some(0));
    }

    #[test]
    fn test_commutative_constant_moves_right() {
        let result = combine(&int(3), MathematicOperation::Add, &byte(0x10));
        assert_matches!(
            &result.kind,
            ExpressionKind::Mathematic { left, right, .. }
                if left.is_memory_reference() && right.as_integer() == Some(3)
        );
    }

    #[test]
    fn test_rebalancing_merges_trailing_constants() {
        let x = byte(0x10);
        let plus_three = combine(&x, MathematicOperation::Add, &int(3));
        let result = combine(&plus_three, MathematicOperation::Subtract, &int(1));
        assert_eq!(result.to_string(), "byte(0x000010) + 2");

        let back_to_x = combine(&plus_three, MathematicOperation::Subtract, &int(3));
        assert!(Rc::ptr_eq(&back_to_x, &x));

        let negative = combine(&plus_three, MathematicOperation::Subtract, &int(5));
        assert_eq!(negative.to_string(), "byte(0x000010) - 2");

        let times_four = combine(&x, MathematicOperation::Multiply, &int(4));
        let halved = combine(&times_four, MathematicOperation::Divide, &int(2));
        assert_eq!(halved.to_string(), "byte(0x000010) * 2");

        let times_three = combine(&x, MathematicOperation::Multiply, &int(3));
        let inexact = combine(&times_three, MathematicOperation::Divide, &int(2));
        assert_eq!(inexact.to_string(), "byte(0x000010) * 3 / 2");
    }

    #[test]
    fn test_logical_unit_blocks_rebalancing() {
        let grouped = Expression::as_logical_unit(&combine(&byte(1), MathematicOperation::Add, &int(3)));
        let result = combine(&grouped, MathematicOperation::Add, &int(1));
        assert_eq!(result.to_string(), "(byte(0x000001) + 3) + 1");
    }

    #[test]
    fn test_type_errors() {
        let error = combine_mathematic(
            &Expression::boolean(true, span()),
            MathematicOperation::Add,
            &int(1),
            span(),
        )
        .unwrap_err();
        assert_eq!(error.kind, ErrorKind::Type);
    }
}
