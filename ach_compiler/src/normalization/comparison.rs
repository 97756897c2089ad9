//! Canonical comparison form
//!
//! After normalization a comparison that still depends on memory has its
//! constant (if any) on the right, no constant terms on the left, BCD views
//! unwrapped, and float constants lowered when the other side can only hold
//! whole numbers. Comparisons decided by the operand's value range fold to
//! booleans.

use super::mathematic::{combine_mathematic, Number};
use super::normalization_error;
use crate::config::constants::compile_time::normalization::MAX_BCD_DIGITS;
use crate::grammar::ast::{
    ComparisonOperation, ExprRef, Expression, ExpressionKind, MathematicOperation,
    MemoryModifierKind,
};
use crate::interpreter::{ErrorExpression, EvaluationResult};
use crate::logging::codes;
use crate::requirements::{Field, FieldType};
use crate::utils::Span;
use std::rc::Rc;

use ComparisonOperation::*;

fn boolean(value: bool, span: Span) -> EvaluationResult<ExprRef> {
    Ok(Expression::boolean(value, span))
}

fn node(left: ExprRef, operation: ComparisonOperation, right: ExprRef, span: Span) -> ExprRef {
    Expression::expanded(
        ExpressionKind::Comparison {
            left,
            operation,
            right,
        },
        span,
    )
}

/// Single memory read or the recalled accumulator
fn is_simple_operand(expression: &Expression) -> bool {
    expression.is_memory_reference() || matches!(expression.kind, ExpressionKind::Recall)
}

fn is_comparable(expression: &Expression) -> bool {
    matches!(
        expression.kind,
        ExpressionKind::Integer(_)
            | ExpressionKind::Float(_)
            | ExpressionKind::String(_)
            | ExpressionKind::Boolean(_)
            | ExpressionKind::MemoryAccessor { .. }
            | ExpressionKind::MemoryModifier { .. }
            | ExpressionKind::Recall
            | ExpressionKind::Mathematic { .. }
    )
}

/// Normalize `left op right` where both sides are evaluated
pub fn normalize_comparison(
    left: &ExprRef,
    operation: ComparisonOperation,
    right: &ExprRef,
    span: Span,
) -> EvaluationResult<ExprRef> {
    for operand in [left, right] {
        if !is_comparable(operand) {
            return Err(ErrorExpression::type_error(
                format!("Cannot compare {}", operand.type_name()),
                operand.span,
            ));
        }
    }

    if left.is_literal() && right.is_literal() {
        return compare_literals(left, operation, right, span);
    }

    for (literal, other) in [(left, right), (right, left)] {
        if matches!(literal.kind, ExpressionKind::String(_) | ExpressionKind::Boolean(_)) {
            return Err(ErrorExpression::type_error(
                format!("Cannot compare {} and {}", literal.type_name(), other.type_name()),
                span,
            ));
        }
    }

    // Constants go on the right
    if left.is_numeric_literal() {
        return normalize_comparison(right, operation.reverse(), left, span);
    }

    match Number::of(right) {
        Some(constant) => normalize_against_constant(left, operation, constant, right, span),
        None => normalize_memory_pair(left, operation, right, span),
    }
}

fn compare_literals(
    left: &Expression,
    operation: ComparisonOperation,
    right: &Expression,
    span: Span,
) -> EvaluationResult<ExprRef> {
    match (&left.kind, &right.kind) {
        (ExpressionKind::String(l), ExpressionKind::String(r)) => {
            boolean(operation.compare(l.as_str(), r.as_str()), span)
        }
        (ExpressionKind::Boolean(l), ExpressionKind::Boolean(r)) => match operation {
            Equal => boolean(l == r, span),
            NotEqual => boolean(l != r, span),
            _ => Err(ErrorExpression::type_error(
                format!("Cannot apply '{}' to booleans", operation),
                span,
            )),
        },
        _ => match (Number::of(left), Number::of(right)) {
            (Some(l), Some(r)) => boolean(operation.compare(l.as_f64(), r.as_f64()), span),
            _ => Err(ErrorExpression::type_error(
                format!("Cannot compare {} and {}", left.type_name(), right.type_name()),
                span,
            )),
        },
    }
}

/// Neither side is a constant
fn normalize_memory_pair(
    left: &ExprRef,
    operation: ComparisonOperation,
    right: &ExprRef,
    span: Span,
) -> EvaluationResult<ExprRef> {
    if left == right {
        return boolean(matches!(operation, Equal | LessThanOrEqual | GreaterThanOrEqual), span);
    }

    // bcd(a) op bcd(b) => a op b
    if let (Some(l), Some(r)) = (bcd_inner(left), bcd_inner(right)) {
        return normalize_comparison(&l, operation, &r, span);
    }

    let left_simple = is_simple_operand(left);
    let right_simple = is_simple_operand(right);

    if right_simple {
        return Ok(node(Rc::clone(left), operation, Rc::clone(right), span));
    }
    if left_simple {
        return normalize_comparison(right, operation.reverse(), left, span);
    }

    // Both sides are compound. Keep the last memory term on the right.
    if let ExpressionKind::Mathematic {
        left: rest,
        operation: MathematicOperation::Add,
        right: last,
    } = &right.kind
    {
        if !right.is_logical_unit && is_simple_operand(last) {
            let moved = combine_mathematic(left, MathematicOperation::Subtract, rest, span)?;
            return normalize_comparison(&moved, operation, last, span);
        }
    }

    if matches!(operation, Equal | NotEqual) {
        let difference = combine_mathematic(left, MathematicOperation::Subtract, right, span)?;
        return normalize_comparison(&difference, operation, &Expression::integer(0, span), span);
    }

    Err(normalization_error(
        codes::normalization::UNSUPPORTED_EXPRESSION,
        format!("Cannot convert '{} {} {}' into a requirement", left, operation, right),
        span,
    ))
}

fn bcd_inner(expression: &Expression) -> Option<ExprRef> {
    match &expression.kind {
        ExpressionKind::MemoryModifier {
            modifier: MemoryModifierKind::Bcd,
            accessor,
        } => Some(Rc::clone(accessor)),
        _ => None,
    }
}

/// `left op constant` with a non-literal left side
fn normalize_against_constant(
    left: &ExprRef,
    operation: ComparisonOperation,
    constant: Number,
    constant_node: &ExprRef,
    span: Span,
) -> EvaluationResult<ExprRef> {
    match &left.kind {
        // x + c op k => x op k - c
        ExpressionKind::Mathematic {
            left: inner,
            operation: inner_operation @ (MathematicOperation::Add | MathematicOperation::Subtract),
            right: term,
        } if term.is_numeric_literal() => {
            let opposite = if *inner_operation == MathematicOperation::Add {
                MathematicOperation::Subtract
            } else {
                MathematicOperation::Add
            };
            let moved = combine_mathematic(constant_node, opposite, term, span)?;
            return normalize_comparison(inner, operation, &moved, span);
        }
        // c - x op k => x reversed(op) c - k
        ExpressionKind::Mathematic {
            left: term,
            operation: MathematicOperation::Subtract,
            right: inner,
        } if term.is_numeric_literal() => {
            let moved = combine_mathematic(term, MathematicOperation::Subtract, constant_node, span)?;
            return normalize_comparison(inner, operation.reverse(), &moved, span);
        }
        // x * c op k
        ExpressionKind::Mathematic {
            left: inner,
            operation: MathematicOperation::Multiply,
            right: factor,
        } => {
            if let (Some(factor), Number::Integer(value)) = (factor.as_integer(), constant) {
                if factor > 0 && inner.is_integer_valued() {
                    return divide_through(inner, operation, factor, value, span);
                }
            }
        }
        ExpressionKind::MemoryModifier {
            modifier: MemoryModifierKind::Bcd,
            accessor,
        } => {
            if let Number::Integer(value) = constant {
                return compare_bcd(left, accessor, operation, value, span);
            }
        }
        _ => {}
    }

    if let Number::Float(value) = constant {
        if left.is_integer_valued() {
            return lower_float_constant(left, operation, value, span);
        }
    }

    if let Number::Integer(value) = constant {
        if let Some(folded) = fold_by_range(left, operation, value) {
            return boolean(folded, span);
        }
    }

    Ok(node(Rc::clone(left), operation, Rc::clone(constant_node), span))
}

/// `x * factor op value` for integer `x`
fn divide_through(
    inner: &ExprRef,
    operation: ComparisonOperation,
    factor: i64,
    value: i64,
    span: Span,
) -> EvaluationResult<ExprRef> {
    let floor = value.div_euclid(factor);
    let ceil = -((-value).div_euclid(factor));
    let exact = value.rem_euclid(factor) == 0;

    let (operation, bound) = match operation {
        Equal if !exact => return boolean(false, span),
        NotEqual if !exact => return boolean(true, span),
        Equal | NotEqual => (operation, floor),
        LessThan | GreaterThanOrEqual => (operation, ceil),
        LessThanOrEqual | GreaterThan => (operation, floor),
    };
    normalize_comparison(inner, operation, &Expression::integer(bound, span), span)
}

/// Whole-number operand against a float constant
fn lower_float_constant(
    left: &ExprRef,
    operation: ComparisonOperation,
    value: f64,
    span: Span,
) -> EvaluationResult<ExprRef> {
    let floor = value.floor();
    if floor == value {
        let integer = Expression::integer(value as i64, span);
        return normalize_comparison(left, operation, &integer, span);
    }

    let operation = match operation {
        Equal => return boolean(false, span),
        NotEqual => return boolean(true, span),
        LessThan | LessThanOrEqual => LessThanOrEqual,
        GreaterThan | GreaterThanOrEqual => GreaterThan,
    };
    normalize_comparison(left, operation, &Expression::integer(floor as i64, span), span)
}

/// Result for a comparison whose constant lies outside `0..=max`.
/// `above` selects the side: true when the constant exceeds the maximum.
fn out_of_range(operation: ComparisonOperation, above: bool) -> bool {
    match operation {
        Equal => false,
        NotEqual => true,
        LessThan | LessThanOrEqual => above,
        GreaterThan | GreaterThanOrEqual => !above,
    }
}

/// Largest value a plain (non-float) memory read can produce
fn range_maximum(left: &Expression) -> Option<i64> {
    let size = left.memory_size()?;
    if !left.is_memory_reference() || size.is_float() {
        return None;
    }
    let max = match &left.kind {
        ExpressionKind::MemoryModifier {
            modifier: MemoryModifierKind::Bcd,
            ..
        } => Field::memory(size, 0).with_kind(FieldType::BinaryCodedDecimal).max_value(),
        _ => size.max_value(),
    };
    Some(i64::from(max))
}

/// Comparisons decided by the range of a plain memory read
fn fold_by_range(left: &Expression, operation: ComparisonOperation, value: i64) -> Option<bool> {
    let max = range_maximum(left)?;
    if value < 0 {
        return Some(out_of_range(operation, false));
    }
    if value > max {
        return Some(out_of_range(operation, true));
    }
    match operation {
        GreaterThanOrEqual if value == 0 => Some(true),
        LessThan if value == 0 => Some(false),
        LessThanOrEqual if value == max => Some(true),
        GreaterThan if value == max => Some(false),
        _ => None,
    }
}

/// Binary-coded decimal digits of `value`, or `None` when more than the
/// supported number of digits are needed
fn encode_bcd(value: i64) -> Option<i64> {
    let mut remaining = value;
    let mut encoded = 0i64;
    let mut shift = 0;
    loop {
        if shift / 4 >= MAX_BCD_DIGITS {
            return None;
        }
        encoded |= (remaining % 10) << shift;
        remaining /= 10;
        shift += 4;
        if remaining == 0 {
            return Some(encoded);
        }
    }
}

/// `bcd(x) op value` => `x op bcd_encoded(value)`
fn compare_bcd(
    left: &ExprRef,
    accessor: &ExprRef,
    operation: ComparisonOperation,
    value: i64,
    span: Span,
) -> EvaluationResult<ExprRef> {
    if value < 0 {
        return boolean(out_of_range(operation, false), span);
    }
    let encoded = match encode_bcd(value) {
        Some(encoded) if range_maximum(left).map_or(true, |max| value <= max) => encoded,
        _ => {
            crate::log_warning!("BCD constant folded to a static result",
                "code" => codes::normalization::BCD_OVERFLOW.as_str(),
                "value" => value
            );
            return boolean(out_of_range(operation, true), span);
        }
    };
    if let Some(folded) = fold_by_range(left, operation, value) {
        return boolean(folded, span);
    }
    Ok(node(
        Rc::clone(accessor),
        operation,
        Expression::integer(encoded, span),
        span,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requirements::FieldSize;
    use assert_matches::assert_matches;

    fn span() -> Span {
        Span::dummy()
    }

    fn int(value: i64) -> ExprRef {
        Expression::integer(value, span())
    }

    fn memory(size: FieldSize, address: i64) -> ExprRef {
        Expression::expanded(
            ExpressionKind::MemoryAccessor {
                size,
                address: int(address),
            },
            span(),
        )
    }

    fn byte(address: i64) -> ExprRef {
        memory(FieldSize::Byte, address)
    }

    fn bcd(accessor: ExprRef) -> ExprRef {
        Expression::expanded(
            ExpressionKind::MemoryModifier {
                modifier: MemoryModifierKind::Bcd,
                accessor,
            },
            span(),
        )
    }

    fn math(left: &ExprRef, operation: MathematicOperation, right: &ExprRef) -> ExprRef {
        combine_mathematic(left, operation, right, span()).unwrap()
    }

    fn normalize(left: &ExprRef, operation: ComparisonOperation, right: &ExprRef) -> ExprRef {
        normalize_comparison(left, operation, right, span()).unwrap()
    }

    #[test]
    fn test_literal_folding() {
        assert_eq!(normalize(&math(&int(2), MathematicOperation::Add, &int(3)), Equal, &int(5)).as_boolean(), Some(true));
        assert_eq!(
            normalize(&Expression::string("a", span()), LessThan, &Expression::string("b", span())).as_boolean(),
            Some(true)
        );
        assert!(normalize_comparison(&Expression::string("a", span()), Equal, &int(1), span()).is_err());
    }

    #[test]
    fn test_identical_memory_reads() {
        assert_eq!(normalize(&byte(0x1234), Equal, &byte(0x1234)).as_boolean(), Some(true));
        assert_eq!(normalize(&byte(0x1234), GreaterThan, &byte(0x1234)).as_boolean(), Some(false));
    }

    #[test]
    fn test_constant_moves_right() {
        let result = normalize(&int(5), LessThan, &byte(0x10));
        assert_eq!(result.to_string(), "byte(0x000010) > 5");
    }

    #[test]
    fn test_constant_terms_cross_sides() {
        let plus = math(&byte(0x10), MathematicOperation::Add, &int(3));
        assert_eq!(normalize(&plus, Equal, &int(10)).to_string(), "byte(0x000010) == 7");

        let minus = math(&byte(0x10), MathematicOperation::Subtract, &int(3));
        assert_eq!(normalize(&minus, GreaterThan, &int(10)).to_string(), "byte(0x000010) > 13");

        let reversed = math(&int(10), MathematicOperation::Subtract, &byte(0x10));
        assert_eq!(normalize(&reversed, LessThan, &int(3)).to_string(), "byte(0x000010) > 7");
    }

    #[test]
    fn test_multiplication_divides_through() {
        let doubled = math(&byte(0x10), MathematicOperation::Multiply, &int(2));
        assert_eq!(normalize(&doubled, Equal, &int(6)).to_string(), "byte(0x000010) == 3");
        assert_eq!(normalize(&doubled, Equal, &int(7)).as_boolean(), Some(false));
        assert_eq!(normalize(&doubled, NotEqual, &int(7)).as_boolean(), Some(true));
        assert_eq!(normalize(&doubled, LessThan, &int(7)).to_string(), "byte(0x000010) < 4");
        assert_eq!(normalize(&doubled, GreaterThan, &int(7)).to_string(), "byte(0x000010) > 3");
    }

    #[test]
    fn test_float_lowering() {
        assert_eq!(normalize(&byte(0x10), Equal, &Expression::float(4.5, span())).as_boolean(), Some(false));
        assert_eq!(normalize(&byte(0x10), NotEqual, &Expression::float(4.5, span())).as_boolean(), Some(true));
        assert_eq!(
            normalize(&byte(0x10), LessThan, &Expression::float(4.2, span())).to_string(),
            "byte(0x000010) <= 4"
        );
        assert_eq!(
            normalize(&byte(0x10), GreaterThanOrEqual, &Expression::float(4.2, span())).to_string(),
            "byte(0x000010) > 4"
        );
        assert_eq!(
            normalize(&byte(0x10), Equal, &Expression::float(4.0, span())).to_string(),
            "byte(0x000010) == 4"
        );

        let float_read = memory(FieldSize::Float, 0x20);
        assert_matches!(
            normalize(&float_read, Equal, &Expression::float(4.5, span())).kind,
            ExpressionKind::Comparison { .. }
        );
    }

    #[test]
    fn test_range_folding() {
        assert_eq!(normalize(&byte(0x10), GreaterThan, &int(255)).as_boolean(), Some(false));
        assert_eq!(normalize(&byte(0x10), Equal, &int(300)).as_boolean(), Some(false));
        assert_eq!(normalize(&byte(0x10), GreaterThanOrEqual, &int(0)).as_boolean(), Some(true));
        assert_eq!(normalize(&byte(0x10), NotEqual, &int(-1)).as_boolean(), Some(true));
        let bit = memory(FieldSize::Bit0, 0x10);
        assert_eq!(normalize(&bit, LessThanOrEqual, &int(1)).as_boolean(), Some(true));
    }

    #[test]
    fn test_bcd_encoding() {
        let result = normalize(&bcd(byte(0x10)), Equal, &int(42));
        assert_eq!(result.to_string(), "byte(0x000010) == 66");

        let result = normalize(&bcd(byte(0x10)), Equal, &int(150));
        assert_eq!(result.as_boolean(), Some(false));

        let wide = bcd(memory(FieldSize::DWord, 0x10));
        assert_eq!(normalize(&wide, LessThan, &int(1_000_000_000)).as_boolean(), Some(true));
        assert_eq!(normalize(&wide, GreaterThan, &int(1_000_000_000)).as_boolean(), Some(false));

        let both = normalize(&bcd(byte(0x10)), LessThan, &bcd(byte(0x11)));
        assert_eq!(both.to_string(), "byte(0x000010) < byte(0x000011)");
    }

    #[test]
    fn test_compound_sides() {
        let left = math(&byte(1), MathematicOperation::Add, &byte(2));
        let result = normalize(&byte(3), Equal, &left);
        assert_eq!(result.to_string(), "byte(0x000001) + byte(0x000002) == byte(0x000003)");

        let right = math(&byte(3), MathematicOperation::Add, &byte(4));
        let result = normalize(&left, LessThan, &right);
        assert_eq!(
            result.to_string(),
            "byte(0x000001) + byte(0x000002) - byte(0x000003) < byte(0x000004)"
        );
    }
}
