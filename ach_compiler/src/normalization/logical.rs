//! Boolean simplification for `&&`, `||` and `!`

use crate::grammar::ast::{ConditionalOperation, ExprRef, Expression, ExpressionKind};
use crate::interpreter::{ErrorExpression, EvaluationResult};
use crate::utils::Span;
use std::rc::Rc;

/// Values that may appear as operands of `&&`, `||` and `!`
pub fn is_condition(expression: &Expression) -> bool {
    matches!(
        expression.kind,
        ExpressionKind::Boolean(_)
            | ExpressionKind::AlwaysTrue
            | ExpressionKind::AlwaysFalse
            | ExpressionKind::Comparison { .. }
            | ExpressionKind::Conditional { .. }
            | ExpressionKind::Behavioral { .. }
            | ExpressionKind::Tallied { .. }
            | ExpressionKind::Measured { .. }
    )
}

/// Combine evaluated operands with `operation`.
///
/// Nested operands of the same operation are flattened, identity booleans
/// dropped and duplicates removed. A boolean that decides the result
/// short-circuits to that boolean.
pub fn combine_logical(
    operation: ConditionalOperation,
    operands: Vec<ExprRef>,
    span: Span,
) -> EvaluationResult<ExprRef> {
    for operand in &operands {
        if !is_condition(operand) {
            return Err(ErrorExpression::type_error(
                format!("Cannot apply '{}' to {}", operation, operand.type_name()),
                operand.span,
            ));
        }
    }

    let identity = match operation.identity() {
        Some(identity) => identity,
        None => {
            return match operands.as_slice() {
                [operand] => invert(operand),
                _ => Err(ErrorExpression::semantic("'!' takes exactly one operand", span)),
            }
        }
    };

    let mut flattened: Vec<ExprRef> = Vec::with_capacity(operands.len());
    let mut pending: Vec<ExprRef> = operands.into_iter().rev().collect();
    while let Some(operand) = pending.pop() {
        match &operand.kind {
            ExpressionKind::Conditional {
                operation: nested,
                operands: inner,
            } if *nested == operation => {
                pending.extend(inner.iter().rev().cloned());
            }
            ExpressionKind::Boolean(value) if *value == identity => {}
            ExpressionKind::Boolean(_) => return Ok(Expression::boolean(!identity, span)),
            _ => {
                if !flattened.contains(&operand) {
                    flattened.push(Rc::clone(&operand));
                }
            }
        }
    }

    match flattened.len() {
        0 => Ok(Expression::boolean(identity, span)),
        1 => Ok(flattened.remove(0)),
        _ => Ok(Expression::expanded(
            ExpressionKind::Conditional {
                operation,
                operands: flattened,
            },
            span,
        )),
    }
}

/// Logical negation pushed down to the comparisons
pub fn invert(expression: &ExprRef) -> EvaluationResult<ExprRef> {
    let span = expression.span;
    match &expression.kind {
        ExpressionKind::Boolean(value) => Ok(Expression::boolean(!value, span)),
        ExpressionKind::AlwaysTrue => Ok(Expression::expanded(ExpressionKind::AlwaysFalse, span)),
        ExpressionKind::AlwaysFalse => Ok(Expression::expanded(ExpressionKind::AlwaysTrue, span)),
        ExpressionKind::Comparison {
            left,
            operation,
            right,
        } => Ok(Expression::expanded(
            ExpressionKind::Comparison {
                left: Rc::clone(left),
                operation: operation.opposite(),
                right: Rc::clone(right),
            },
            span,
        )),
        ExpressionKind::Conditional {
            operation: ConditionalOperation::Not,
            operands,
        } => match operands.as_slice() {
            [inner] => Ok(Rc::clone(inner)),
            _ => Err(ErrorExpression::semantic("'!' takes exactly one operand", span)),
        },
        ExpressionKind::Conditional {
            operation,
            operands,
        } => {
            let inverted = operands.iter().map(invert).collect::<EvaluationResult<Vec<_>>>()?;
            let combined = combine_logical(operation.inverse(), inverted, span)?;
            Ok(if expression.is_logical_unit {
                Expression::as_logical_unit(&combined)
            } else {
                combined
            })
        }
        ExpressionKind::Behavioral { .. }
        | ExpressionKind::Tallied { .. }
        | ExpressionKind::Measured { .. } => Err(ErrorExpression::semantic(
            format!("'!' cannot be applied to {}", expression),
            span,
        )),
        _ => Err(ErrorExpression::type_error(
            format!("Cannot apply '!' to {}", expression.type_name()),
            span,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::ast::{BehaviorKind, ComparisonOperation};
    use crate::requirements::FieldSize;
    use assert_matches::assert_matches;

    fn span() -> Span {
        Span::dummy()
    }

    fn compare(address: i64, operation: ComparisonOperation, value: i64) -> ExprRef {
        Expression::expanded(
            ExpressionKind::Comparison {
                left: Expression::expanded(
                    ExpressionKind::MemoryAccessor {
                        size: FieldSize::Byte,
                        address: Expression::integer(address, span()),
                    },
                    span(),
                ),
                operation,
                right: Expression::integer(value, span()),
            },
            span(),
        )
    }

    fn and(operands: Vec<ExprRef>) -> ExprRef {
        combine_logical(ConditionalOperation::And, operands, span()).unwrap()
    }

    fn or(operands: Vec<ExprRef>) -> ExprRef {
        combine_logical(ConditionalOperation::Or, operands, span()).unwrap()
    }

    #[test]
    fn test_identity_and_short_circuit() {
        let a = compare(1, ComparisonOperation::Equal, 1);
        assert_eq!(and(vec![Rc::clone(&a), Expression::boolean(true, span())]), a);
        assert_eq!(
            and(vec![Rc::clone(&a), Expression::boolean(false, span())]).as_boolean(),
            Some(false)
        );
        assert_eq!(
            or(vec![Rc::clone(&a), Expression::boolean(true, span())]).as_boolean(),
            Some(true)
        );
        assert_eq!(and(vec![Expression::boolean(true, span())]).as_boolean(), Some(true));
    }

    #[test]
    fn test_flatten_and_dedupe() {
        let a = compare(1, ComparisonOperation::Equal, 1);
        let b = compare(2, ComparisonOperation::Equal, 2);
        let c = compare(3, ComparisonOperation::Equal, 3);
        let nested = and(vec![Rc::clone(&a), Rc::clone(&b)]);
        let combined = and(vec![nested, Rc::clone(&c), Rc::clone(&a)]);
        assert_matches!(
            &combined.kind,
            ExpressionKind::Conditional { operation: ConditionalOperation::And, operands } if operands.len() == 3
        );
        assert_eq!(
            combined.to_string(),
            "byte(0x000001) == 1 && byte(0x000002) == 2 && byte(0x000003) == 3"
        );
    }

    #[test]
    fn test_invert_applies_de_morgan() {
        let a = compare(1, ComparisonOperation::Equal, 1);
        let b = compare(2, ComparisonOperation::LessThan, 2);
        let either = or(vec![Rc::clone(&a), Rc::clone(&b)]);

        let inverted = invert(&either).unwrap();
        assert_eq!(
            inverted.to_string(),
            "byte(0x000001) != 1 && byte(0x000002) >= 2"
        );
        assert_eq!(invert(&inverted).unwrap(), either);
    }

    #[test]
    fn test_invert_rejects_flags() {
        let flag = Expression::expanded(
            ExpressionKind::Behavioral {
                behavior: BehaviorKind::Never,
                condition: compare(1, ComparisonOperation::Equal, 1),
            },
            span(),
        );
        let error = invert(&flag).unwrap_err();
        assert!(error.message.contains("cannot be applied"));
        assert!(combine_logical(ConditionalOperation::And, vec![Expression::integer(1, span())], span()).is_err());
    }
}
