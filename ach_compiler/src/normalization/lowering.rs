//! Lowering of normalized conditions and values into requirement groups
//!
//! Combining requirements bind in a fixed order: AddAddress prefixes feed a
//! single operand, AddSource/SubSource accumulate terms into the next
//! comparison, AndNext/OrNext link conditions, ResetNextIf guards a hit
//! counter, AddHits/SubHits pool hit counts, and the terminal requirement
//! carries the flag (ResetIf, PauseIf, Measured, MeasuredIf, Trigger or
//! none).

use super::normalization_error;
use crate::config::constants::compile_time::normalization::{
    MAX_ALT_GROUPS, MAX_REQUIREMENTS_PER_GROUP,
};
use crate::grammar::ast::{
    BehaviorKind, ComparisonOperation, ConditionalOperation, ExprRef, Expression, ExpressionKind,
    MathematicOperation,
};
use crate::interpreter::{ErrorExpression, EvaluationResult};
use crate::logging::codes;
use crate::requirements::{
    Field, Requirement, RequirementGroup, RequirementType, Trigger, Value,
};
use crate::utils::Span;
use std::rc::Rc;

fn unsupported(expression: &Expression, context: &str) -> ErrorExpression {
    normalization_error(
        codes::normalization::UNSUPPORTED_EXPRESSION,
        format!("Cannot convert {} '{}' into a requirement", context, expression),
        expression.span,
    )
}

// === FIELDS AND TERMS ===

/// Integer constant as a value field
fn integer_field(value: i64, span: Span) -> EvaluationResult<Field> {
    if value < i64::from(i32::MIN) || value > i64::from(u32::MAX) {
        return Err(ErrorExpression::semantic(
            format!("Constant {} does not fit in 32 bits", value),
            span,
        ));
    }
    Ok(if value < 0 {
        Field::signed(value)
    } else {
        Field::value(value as u32)
    })
}

fn constant_field(expression: &Expression) -> EvaluationResult<Option<Field>> {
    match expression.kind {
        ExpressionKind::Integer(value) => integer_field(value, expression.span).map(Some),
        ExpressionKind::Float(value) => Ok(Some(Field::float(value as f32))),
        _ => Ok(None),
    }
}

/// A single operand: the field plus the AddAddress requirements that must
/// immediately precede the requirement reading it
#[derive(Debug, Clone, PartialEq)]
struct Operand {
    prefix: Vec<Requirement>,
    field: Field,
}

impl Operand {
    fn plain(field: Field) -> Self {
        Self {
            prefix: Vec::new(),
            field,
        }
    }
}

/// Field for a memory read, constant or `recall()`
fn lower_operand(expression: &Expression) -> EvaluationResult<Operand> {
    if let Some(field) = constant_field(expression)? {
        return Ok(Operand::plain(field));
    }
    match &expression.kind {
        ExpressionKind::Recall => Ok(Operand::plain(Field::recall())),
        ExpressionKind::MemoryAccessor { size, address } => {
            let (prefix, offset) = lower_address(address)?;
            Ok(Operand {
                prefix,
                field: Field::memory(*size, offset),
            })
        }
        ExpressionKind::MemoryModifier { modifier, accessor } => {
            let inner = lower_operand(accessor)?;
            if !inner.field.is_memory_reference() {
                return Err(unsupported(expression, "memory view"));
            }
            Ok(Operand {
                prefix: inner.prefix,
                field: inner.field.with_kind(modifier.field_type()),
            })
        }
        _ => Err(unsupported(expression, "operand")),
    }
}

/// Constant address, or `base + offset` read through AddAddress
fn lower_address(address: &ExprRef) -> EvaluationResult<(Vec<Requirement>, u32)> {
    let checked = |value: i64| {
        u32::try_from(value).map_err(|_| {
            normalization_error(
                codes::normalization::UNSUPPORTED_EXPRESSION,
                format!("Address {} is out of range", value),
                address.span,
            )
        })
    };

    if let Some(value) = address.as_integer() {
        return Ok((Vec::new(), checked(value)?));
    }

    let (base, offset) = match &address.kind {
        ExpressionKind::Mathematic {
            left,
            operation: MathematicOperation::Add,
            right,
        } => match right.as_integer() {
            Some(offset) => (left, offset),
            None => (address, 0),
        },
        _ => (address, 0),
    };

    // A nested pointer keeps its own AddAddress chain ahead of this one
    let prefix = lower_modified_term(base, RequirementType::AddAddress)?;
    Ok((prefix, checked(offset)?))
}

/// One signed term of a sum
#[derive(Debug, Clone)]
struct Term {
    expression: ExprRef,
    negative: bool,
}

impl Term {
    fn is_modified(&self) -> bool {
        matches!(self.expression.kind, ExpressionKind::Mathematic { .. })
    }

    fn is_constant(&self) -> bool {
        self.expression.is_numeric_literal()
    }
}

/// Split nested `+`/`-` into signed terms. Constants are merged.
fn flatten_terms(expression: &ExprRef) -> Vec<Term> {
    fn walk(expression: &ExprRef, negative: bool, terms: &mut Vec<Term>, constant: &mut f64, float: &mut bool) {
        match &expression.kind {
            ExpressionKind::Mathematic {
                left,
                operation: MathematicOperation::Add,
                right,
            } => {
                walk(left, negative, terms, constant, float);
                walk(right, negative, terms, constant, float);
            }
            ExpressionKind::Mathematic {
                left,
                operation: MathematicOperation::Subtract,
                right,
            } => {
                walk(left, negative, terms, constant, float);
                walk(right, !negative, terms, constant, float);
            }
            ExpressionKind::Negate(inner) => walk(inner, !negative, terms, constant, float),
            ExpressionKind::Integer(value) => {
                *constant += if negative { -(*value as f64) } else { *value as f64 };
            }
            ExpressionKind::Float(value) => {
                *float = true;
                *constant += if negative { -value } else { *value };
            }
            _ => terms.push(Term {
                expression: Rc::clone(expression),
                negative,
            }),
        }
    }

    let mut terms = Vec::new();
    let mut constant = 0.0;
    let mut float = false;
    walk(expression, false, &mut terms, &mut constant, &mut float);

    if constant != 0.0 {
        let span = expression.span;
        let magnitude = constant.abs();
        let literal = if float {
            Expression::float(magnitude, span)
        } else {
            Expression::integer(magnitude as i64, span)
        };
        terms.push(Term {
            expression: literal,
            negative: constant < 0.0,
        });
    }
    terms
}

/// Requirements accumulating `term`. The last requirement has `kind`.
///
/// A modifier applied to a compound left side stores the left side with
/// Remember and applies the modifier to the recalled value.
fn lower_modified_term(term: &ExprRef, kind: RequirementType) -> EvaluationResult<Vec<Requirement>> {
    match &term.kind {
        ExpressionKind::Mathematic {
            left,
            operation,
            right,
        } if !matches!(operation, MathematicOperation::Add | MathematicOperation::Subtract) => {
            let right = lower_operand(right)?;
            let mut requirements = Vec::new();
            let left_field = if left.is_memory_reference() || left.is_numeric_literal() {
                let left = lower_operand(left)?;
                requirements.extend(left.prefix);
                left.field
            } else {
                requirements.extend(lower_sum(left, RequirementType::Remember)?);
                Field::recall()
            };
            if !right.prefix.is_empty() && !requirements.ends_with(&right.prefix) {
                return Err(unsupported(term, "pointer operand"));
            }
            requirements.push(Requirement {
                kind,
                left: left_field,
                operator: operation.requirement_operator(),
                right: right.field,
                hit_count: 0,
            });
            Ok(requirements)
        }
        ExpressionKind::Mathematic { .. } => lower_sum(term, kind),
        _ => {
            let operand = lower_operand(term)?;
            let mut requirements = operand.prefix;
            requirements.push(Requirement::operand(kind, operand.field));
            Ok(requirements)
        }
    }
}

/// Sum of terms whose final requirement has `kind`: every term but the last
/// positive one is accumulated with AddSource/SubSource
fn lower_sum(expression: &ExprRef, kind: RequirementType) -> EvaluationResult<Vec<Requirement>> {
    let terms = flatten_terms(expression);
    let last_positive = terms
        .iter()
        .rposition(|t| !t.negative && !t.is_constant())
        .or_else(|| terms.iter().rposition(|t| !t.negative));

    let mut requirements = Vec::new();
    for (index, term) in terms.iter().enumerate() {
        if Some(index) == last_positive {
            continue;
        }
        let kind = if term.negative {
            RequirementType::SubSource
        } else {
            RequirementType::AddSource
        };
        requirements.extend(lower_modified_term(&term.expression, kind)?);
    }
    match last_positive {
        Some(index) => requirements.extend(lower_modified_term(&terms[index].expression, kind)?),
        None => requirements.push(Requirement::operand(kind, Field::value(0))),
    }
    Ok(requirements)
}

// === CONDITIONS ===

/// `left op right` where `right` is a single operand. The left side's last
/// unmodified positive term becomes the compared field.
fn lower_comparison(
    expression: &Expression,
    left: &ExprRef,
    operation: ComparisonOperation,
    right: &ExprRef,
) -> EvaluationResult<Vec<Requirement>> {
    let right = lower_operand(right).map_err(|_| unsupported(expression, "comparison"))?;

    let terms = flatten_terms(left);
    let compared = terms
        .iter()
        .rposition(|t| !t.negative && !t.is_modified() && !t.is_constant());

    let mut requirements = Vec::new();
    for (index, term) in terms.iter().enumerate() {
        if Some(index) == compared {
            continue;
        }
        let kind = if term.negative {
            RequirementType::SubSource
        } else {
            RequirementType::AddSource
        };
        requirements.extend(lower_modified_term(&term.expression, kind)?);
    }

    let left_operand = match compared {
        Some(index) => lower_operand(&terms[index].expression)?,
        None => Operand::plain(Field::value(0)),
    };

    // AddAddress applies to both sides of the next requirement
    let prefix = match (left_operand.prefix.is_empty(), right.prefix.is_empty()) {
        (_, true) => left_operand.prefix,
        (true, false) if !left_operand.field.is_memory_reference() => right.prefix,
        (false, false) if left_operand.prefix == right.prefix => right.prefix,
        _ => return Err(unsupported(expression, "comparison across pointers")),
    };
    requirements.extend(prefix);
    requirements.push(Requirement::new(
        left_operand.field,
        operation.requirement_operator(),
        right.field,
    ));
    Ok(requirements)
}

/// Set the kind of the final requirement
fn finish(
    mut requirements: Vec<Requirement>,
    kind: RequirementType,
    span: Span,
) -> EvaluationResult<Vec<Requirement>> {
    if let Some(last) = requirements.last_mut() {
        if last.kind != RequirementType::None && last.kind != kind {
            // The terminal already carries never/unless/trigger_when or similar
            return Err(normalization_error(
                codes::normalization::UNSUPPORTED_EXPRESSION,
                format!(
                    "Cannot combine '{}' with '{}' on the same condition",
                    last.kind.function_name(),
                    kind.function_name()
                ),
                span,
            ));
        }
        last.kind = kind;
    }
    Ok(requirements)
}

/// A single plain requirement that always has the value `identity`
fn is_identity(requirements: &[Requirement], identity: bool) -> bool {
    match requirements {
        [single] => {
            single.kind == RequirementType::None
                && single.hit_count == 0
                && single.evaluate() == Some(identity)
        }
        _ => false,
    }
}

/// Lower a condition to a chain whose last requirement is a plain terminal
fn lower_chain(expression: &ExprRef) -> EvaluationResult<Vec<Requirement>> {
    match &expression.kind {
        ExpressionKind::Boolean(true) | ExpressionKind::AlwaysTrue => {
            Ok(vec![Requirement::always_true()])
        }
        ExpressionKind::Boolean(false) | ExpressionKind::AlwaysFalse => {
            Ok(vec![Requirement::always_false()])
        }
        ExpressionKind::Comparison {
            left,
            operation,
            right,
        } => lower_comparison(expression, left, *operation, right),
        ExpressionKind::Conditional {
            operation: operation @ (ConditionalOperation::And | ConditionalOperation::Or),
            operands,
        } => lower_linked(expression, *operation, operands),
        ExpressionKind::Behavioral {
            behavior,
            condition,
        } => finish(lower_chain(condition)?, behavior.requirement_type(), expression.span),
        ExpressionKind::Tallied { target, conditions } => lower_tallied(expression, *target, conditions),
        ExpressionKind::Deduct(_) => Err(normalization_error(
            codes::normalization::UNSUPPORTED_EXPRESSION,
            "deduct can only be used inside tally",
            expression.span,
        )),
        _ => Err(unsupported(expression, "condition")),
    }
}

/// AndNext/OrNext chain. The runtime evaluates links left to right, so at
/// most one operand may itself be a chain of the other operation and it is
/// moved to the front.
fn lower_linked(
    expression: &Expression,
    operation: ConditionalOperation,
    operands: &[ExprRef],
) -> EvaluationResult<Vec<Requirement>> {
    let (link, identity) = match operation {
        ConditionalOperation::Or => (RequirementType::OrNext, false),
        _ => (RequirementType::AndNext, true),
    };

    let is_nested = |operand: &ExprRef| {
        matches!(&operand.kind, ExpressionKind::Conditional { operation: nested, .. } if *nested != operation)
    };
    let nested: Vec<&ExprRef> = operands.iter().filter(|&o| is_nested(o)).collect();
    if nested.len() > 1 {
        return Err(unsupported(expression, "nested logic"));
    }
    let ordered = nested
        .into_iter()
        .chain(operands.iter().filter(|&o| !is_nested(o)));

    let mut requirements: Vec<Requirement> = Vec::new();
    for operand in ordered {
        let lowered = lower_chain(operand)?;
        if is_identity(&lowered, identity) {
            continue;
        }
        if !requirements.is_empty() {
            requirements = finish(requirements, link, operand.span)?;
        }
        requirements.extend(lowered);
    }
    if requirements.is_empty() {
        requirements.push(if identity {
            Requirement::always_true()
        } else {
            Requirement::always_false()
        });
    }
    Ok(requirements)
}

/// `once`, `repeated` and `tally`
fn lower_tallied(
    expression: &Expression,
    target: u32,
    conditions: &[ExprRef],
) -> EvaluationResult<Vec<Requirement>> {
    if let [condition] = conditions {
        if !matches!(condition.kind, ExpressionKind::Deduct(_)) {
            return Ok(with_hits(lower_counted(condition)?, target));
        }
    }

    let is_deduct = |c: &ExprRef| matches!(c.kind, ExpressionKind::Deduct(_));
    let last = conditions.iter().rposition(|c| !is_deduct(c)).ok_or_else(|| {
        normalization_error(
            codes::normalization::UNSUPPORTED_EXPRESSION,
            "tally requires at least one condition that is not deducted",
            expression.span,
        )
    })?;

    let mut requirements = Vec::new();
    for (index, condition) in conditions.iter().enumerate() {
        if index == last {
            continue;
        }
        requirements.extend(match &condition.kind {
            ExpressionKind::Deduct(inner) => {
                finish(lower_counted(inner)?, RequirementType::SubHits, condition.span)?
            }
            _ => finish(lower_counted(condition)?, RequirementType::AddHits, condition.span)?,
        });
    }
    requirements.extend(with_hits(lower_counted(&conditions[last])?, target));
    Ok(requirements)
}

fn with_hits(mut requirements: Vec<Requirement>, target: u32) -> Vec<Requirement> {
    if let Some(last) = requirements.last_mut() {
        last.hit_count = target;
    }
    requirements
}

/// A hit-counted condition. `never(...)` operands of an `&&` become a
/// ResetNextIf guard placed before the counted chain.
fn lower_counted(condition: &ExprRef) -> EvaluationResult<Vec<Requirement>> {
    let operands = match &condition.kind {
        ExpressionKind::Conditional {
            operation: ConditionalOperation::And,
            operands,
        } => operands,
        _ => return lower_chain(condition),
    };

    let is_reset = |o: &ExprRef| {
        matches!(
            &o.kind,
            ExpressionKind::Behavioral {
                behavior: BehaviorKind::Never,
                ..
            }
        )
    };
    let (resets, counted): (Vec<&ExprRef>, Vec<&ExprRef>) = operands.iter().partition(|&o| is_reset(o));
    if resets.is_empty() {
        return lower_chain(condition);
    }

    let mut guard: Vec<Requirement> = Vec::new();
    for reset in resets {
        if let ExpressionKind::Behavioral { condition, .. } = &reset.kind {
            if !guard.is_empty() {
                guard = finish(guard, RequirementType::OrNext, reset.span)?;
            }
            guard.extend(lower_chain(condition)?);
        }
    }

    let counted: Vec<ExprRef> = counted.into_iter().cloned().collect();
    let body = match counted.as_slice() {
        [] => vec![Requirement::always_true()],
        [single] => lower_chain(single)?,
        _ => lower_linked(condition, ConditionalOperation::And, &counted)?,
    };

    let mut requirements = finish(guard, RequirementType::ResetNextIf, condition.span)?;
    requirements.extend(body);
    Ok(requirements)
}

/// One clause of a group
fn lower_clause(clause: &ExprRef) -> EvaluationResult<Vec<Requirement>> {
    match &clause.kind {
        ExpressionKind::Measured {
            value,
            when,
            percent,
        } => {
            if !super::is_condition(value) {
                return Err(ErrorExpression::type_error(
                    format!("measured in a trigger requires a condition, found {}", value.type_name()),
                    value.span,
                ));
            }
            let kind = if *percent {
                RequirementType::MeasuredPercent
            } else {
                RequirementType::Measured
            };
            let mut requirements = finish(lower_chain(value)?, kind, clause.span)?;
            if let Some(when) = when {
                for part in split(when, ConditionalOperation::And) {
                    requirements.extend(finish(lower_chain(&part)?, RequirementType::MeasuredIf, part.span)?);
                }
            }
            Ok(requirements)
        }
        _ => lower_chain(clause),
    }
}

/// Operands of `operation`, or the expression itself
fn split(expression: &ExprRef, operation: ConditionalOperation) -> Vec<ExprRef> {
    match &expression.kind {
        ExpressionKind::Conditional {
            operation: found,
            operands,
        } if *found == operation => operands.clone(),
        _ => vec![Rc::clone(expression)],
    }
}

/// `never(a || b)` is `never(a) && never(b)`; likewise for `unless`
fn split_behaviors(clauses: Vec<ExprRef>) -> Vec<ExprRef> {
    let mut result = Vec::with_capacity(clauses.len());
    for clause in clauses {
        match &clause.kind {
            ExpressionKind::Behavioral {
                behavior: behavior @ (BehaviorKind::Never | BehaviorKind::Unless),
                condition,
            } if matches!(
                condition.kind,
                ExpressionKind::Conditional {
                    operation: ConditionalOperation::Or,
                    ..
                }
            ) =>
            {
                for operand in split(condition, ConditionalOperation::Or) {
                    result.push(Expression::expanded(
                        ExpressionKind::Behavioral {
                            behavior: *behavior,
                            condition: operand,
                        },
                        clause.span,
                    ));
                }
            }
            _ => result.push(clause),
        }
    }
    result
}

fn lower_group(expression: &ExprRef) -> EvaluationResult<RequirementGroup> {
    let clauses = split_behaviors(split(expression, ConditionalOperation::And));
    let mut requirements = Vec::new();
    for clause in &clauses {
        requirements.extend(lower_clause(clause)?);
    }
    let group = collapse_identities(RequirementGroup::new(requirements));
    check_group_size(&group, expression.span)?;
    Ok(group)
}

/// Drop plain always-true requirements from a group that has others
fn collapse_identities(group: RequirementGroup) -> RequirementGroup {
    let chains = group.chains();
    let keep: Vec<_> = chains
        .iter()
        .filter(|chain| chain.evaluate() != Some(true))
        .collect();
    if keep.is_empty() || keep.len() == chains.len() {
        return group;
    }
    RequirementGroup::new(keep.into_iter().flat_map(|c| c.requirements.iter().copied()).collect())
}

fn check_group_size(group: &RequirementGroup, span: Span) -> EvaluationResult<()> {
    if group.len() > MAX_REQUIREMENTS_PER_GROUP {
        return Err(normalization_error(
            codes::normalization::TOO_MANY_REQUIREMENTS,
            format!(
                "Group has {} requirements, more than the limit of {}",
                group.len(),
                MAX_REQUIREMENTS_PER_GROUP
            ),
            span,
        ));
    }
    Ok(())
}

// === ENTRY POINTS ===

/// Lower an evaluated condition into a trigger.
///
/// Top-level `&&` clauses form the core group. The first `||` clause
/// supplies the alternative groups; later ones stay in the core as OrNext
/// chains.
pub fn build_trigger(expression: &ExprRef) -> EvaluationResult<Trigger> {
    match &expression.kind {
        ExpressionKind::Boolean(true) => {
            return Ok(Trigger::new(RequirementGroup::new(vec![Requirement::always_true()]), vec![]));
        }
        ExpressionKind::Boolean(false) => {
            crate::log_warning!("Trigger can never be satisfied",
                "code" => codes::normalization::UNSATISFIABLE_TRIGGER.as_str(),
                "line" => expression.span.start.line
            );
            return Ok(Trigger::new(RequirementGroup::new(vec![Requirement::always_false()]), vec![]));
        }
        _ => {}
    }
    if !super::is_condition(expression) {
        return Err(ErrorExpression::type_error(
            format!("Trigger must be a condition, found {}", expression.type_name()),
            expression.span,
        ));
    }

    let mut core_clauses = Vec::new();
    let mut alternatives: Option<Vec<ExprRef>> = None;
    for clause in split_behaviors(split(expression, ConditionalOperation::And)) {
        match &clause.kind {
            ExpressionKind::Conditional {
                operation: ConditionalOperation::Or,
                operands,
            } if alternatives.is_none() => alternatives = Some(operands.clone()),
            _ => core_clauses.push(clause),
        }
    }

    let mut core = Vec::new();
    for clause in &core_clauses {
        core.extend(lower_clause(clause)?);
    }
    let core = collapse_identities(RequirementGroup::new(core));
    check_group_size(&core, expression.span)?;

    let alts = alternatives
        .unwrap_or_default()
        .iter()
        .map(lower_group)
        .collect::<EvaluationResult<Vec<_>>>()?;
    if alts.len() > MAX_ALT_GROUPS {
        return Err(normalization_error(
            codes::normalization::TOO_MANY_REQUIREMENTS,
            format!("Trigger has {} alternatives, more than the limit of {}", alts.len(), MAX_ALT_GROUPS),
            expression.span,
        ));
    }

    let core = if core.is_empty() && alts.is_empty() {
        RequirementGroup::new(vec![Requirement::always_true()])
    } else if alts.is_empty() || core.chains().iter().any(|c| c.evaluate() != Some(true)) {
        core
    } else {
        RequirementGroup::default()
    };
    Ok(Trigger::new(core, alts))
}

/// Lower an evaluated numeric expression into a value. `max_of` yields one
/// group per alternative.
pub fn build_value(expression: &ExprRef) -> EvaluationResult<Value> {
    let alternatives = match &expression.kind {
        ExpressionKind::MaxOf(values) => values.clone(),
        _ => vec![Rc::clone(expression)],
    };
    let groups = alternatives
        .iter()
        .map(lower_value_group)
        .collect::<EvaluationResult<Vec<_>>>()?;
    if groups.is_empty() {
        return Err(ErrorExpression::semantic("max_of requires at least one value", expression.span));
    }
    Ok(Value::new(groups))
}

fn lower_value_group(expression: &ExprRef) -> EvaluationResult<RequirementGroup> {
    let (value, kind) = match &expression.kind {
        ExpressionKind::Measured { value, percent, .. } => (
            value,
            if *percent {
                RequirementType::MeasuredPercent
            } else {
                RequirementType::Measured
            },
        ),
        _ => (expression, RequirementType::Measured),
    };

    let requirements = if super::is_condition(value) {
        // A condition measures its hit count
        finish(lower_clause(value)?, kind, value.span)?
    } else {
        match &value.kind {
            ExpressionKind::Integer(_)
            | ExpressionKind::Float(_)
            | ExpressionKind::MemoryAccessor { .. }
            | ExpressionKind::MemoryModifier { .. }
            | ExpressionKind::Recall
            | ExpressionKind::Mathematic { .. }
            | ExpressionKind::Negate(_) => lower_sum(value, kind)?,
            _ => {
                return Err(ErrorExpression::type_error(
                    format!("Value must be numeric, found {}", value.type_name()),
                    value.span,
                ))
            }
        }
    };
    let group = RequirementGroup::new(requirements);
    check_group_size(&group, expression.span)?;
    Ok(group)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalization::{combine_logical, combine_mathematic, normalize_comparison};
    use crate::requirements::{
        serialize_trigger, serialize_value, FieldSize, RequirementOperator, SerializationContext,
    };

    fn span() -> Span {
        Span::dummy()
    }

    fn int(value: i64) -> ExprRef {
        Expression::integer(value, span())
    }

    fn memory(size: FieldSize, address: ExprRef) -> ExprRef {
        Expression::expanded(ExpressionKind::MemoryAccessor { size, address }, span())
    }

    fn byte(address: i64) -> ExprRef {
        memory(FieldSize::Byte, int(address))
    }

    fn math(left: &ExprRef, operation: MathematicOperation, right: &ExprRef) -> ExprRef {
        combine_mathematic(left, operation, right, span()).unwrap()
    }

    fn compare(left: &ExprRef, operation: ComparisonOperation, right: &ExprRef) -> ExprRef {
        normalize_comparison(left, operation, right, span()).unwrap()
    }

    fn logic(operation: ConditionalOperation, operands: Vec<ExprRef>) -> ExprRef {
        combine_logical(operation, operands, span()).unwrap()
    }

    fn flag(behavior: BehaviorKind, condition: ExprRef) -> ExprRef {
        Expression::expanded(ExpressionKind::Behavioral { behavior, condition }, span())
    }

    fn tallied(target: u32, conditions: Vec<ExprRef>) -> ExprRef {
        Expression::expanded(ExpressionKind::Tallied { target, conditions }, span())
    }

    fn trigger_text(expression: &ExprRef) -> String {
        serialize_trigger(&build_trigger(expression).unwrap(), &SerializationContext::new()).unwrap()
    }

    #[test]
    fn test_single_comparison() {
        let condition = compare(&byte(0x1234), ComparisonOperation::Equal, &int(6));
        assert_eq!(trigger_text(&condition), "0xH001234=6");
    }

    #[test]
    fn test_core_and_alternatives() {
        let a = compare(&byte(1), ComparisonOperation::Equal, &int(1));
        let b = compare(&byte(2), ComparisonOperation::Equal, &int(2));
        let c = compare(&byte(3), ComparisonOperation::GreaterThan, &int(3));
        let either = logic(ConditionalOperation::Or, vec![b, c]);
        let condition = logic(ConditionalOperation::And, vec![a, either]);
        assert_eq!(
            trigger_text(&condition),
            "0xH000001=1S0xH000002=2S0xH000003>3"
        );
    }

    #[test]
    fn test_second_or_becomes_or_next() {
        let cmp = |address, value| compare(&byte(address), ComparisonOperation::Equal, &int(value));
        let first = logic(ConditionalOperation::Or, vec![cmp(1, 1), cmp(2, 2)]);
        let second = logic(ConditionalOperation::Or, vec![cmp(3, 3), cmp(4, 4)]);
        let condition = logic(ConditionalOperation::And, vec![first, second]);
        assert_eq!(
            trigger_text(&condition),
            "O:0xH000003=3_0xH000004=4S0xH000001=1S0xH000002=2"
        );
    }

    #[test]
    fn test_sum_uses_add_source() {
        let sum = math(&byte(1), MathematicOperation::Add, &byte(2));
        let condition = compare(&sum, ComparisonOperation::Equal, &int(10));
        assert_eq!(trigger_text(&condition), "A:0xH000001_0xH000002=10");

        let difference = math(&byte(1), MathematicOperation::Subtract, &byte(2));
        let condition = compare(&difference, ComparisonOperation::GreaterThan, &int(3));
        assert_eq!(trigger_text(&condition), "B:0xH000002_0xH000001>3");
    }

    #[test]
    fn test_pointer_uses_add_address() {
        let base = memory(FieldSize::DWord, int(0x10));
        let address = math(&base, MathematicOperation::Add, &int(8));
        let pointed = memory(FieldSize::Word, address);
        let condition = compare(&pointed, ComparisonOperation::Equal, &int(100));
        assert_eq!(trigger_text(&condition), "I:0xX000010_0x 000008=100");
    }

    #[test]
    fn test_flags_and_hit_counts() {
        let a = compare(&byte(1), ComparisonOperation::Equal, &int(1));
        let b = compare(&byte(2), ComparisonOperation::Equal, &int(0));
        let condition = logic(
            ConditionalOperation::And,
            vec![tallied(3, vec![Rc::clone(&a)]), flag(BehaviorKind::Never, Rc::clone(&b))],
        );
        assert_eq!(trigger_text(&condition), "0xH000001=1.3._R:0xH000002=0");

        let guarded = tallied(
            5,
            vec![logic(ConditionalOperation::And, vec![Rc::clone(&a), flag(BehaviorKind::Never, b)])],
        );
        assert_eq!(trigger_text(&guarded), "Z:0xH000002=0_0xH000001=1.5.");
    }

    #[test]
    fn test_tally_pools_hits() {
        let a = compare(&byte(1), ComparisonOperation::Equal, &int(1));
        let b = compare(&byte(2), ComparisonOperation::Equal, &int(2));
        let c = compare(&byte(3), ComparisonOperation::Equal, &int(3));
        let deduct = Expression::expanded(ExpressionKind::Deduct(c), span());
        let condition = tallied(4, vec![a, deduct, b]);
        assert_eq!(
            trigger_text(&condition),
            "C:0xH000001=1_D:0xH000003=3_0xH000002=2.4."
        );
    }

    #[test]
    fn test_never_of_or_is_split() {
        let a = compare(&byte(1), ComparisonOperation::Equal, &int(1));
        let b = compare(&byte(2), ComparisonOperation::Equal, &int(2));
        let c = compare(&byte(3), ComparisonOperation::Equal, &int(3));
        let never = flag(BehaviorKind::Never, logic(ConditionalOperation::Or, vec![b, c]));
        let condition = logic(ConditionalOperation::And, vec![a, never]);
        assert_eq!(
            trigger_text(&condition),
            "0xH000001=1_R:0xH000002=2_R:0xH000003=3"
        );
    }

    #[test]
    fn test_flagged_operand_cannot_join_a_chain() {
        let a = compare(&byte(1), ComparisonOperation::Equal, &int(1));
        let b = compare(&byte(2), ComparisonOperation::Equal, &int(2));
        let c = compare(&byte(3), ComparisonOperation::Equal, &int(3));
        let d = compare(&byte(4), ComparisonOperation::Equal, &int(4));

        // The second || becomes an OrNext chain, which has no place for a reset
        let first = logic(ConditionalOperation::Or, vec![Rc::clone(&a), Rc::clone(&b)]);
        let second = logic(
            ConditionalOperation::Or,
            vec![flag(BehaviorKind::Never, Rc::clone(&c)), Rc::clone(&d)],
        );
        let condition = logic(ConditionalOperation::And, vec![first, second]);
        let error = build_trigger(&condition).unwrap_err();
        assert!(error.message.contains("'never' with '||'"), "{}", error.message);

        let paused = flag(
            BehaviorKind::Never,
            logic(ConditionalOperation::Or, vec![flag(BehaviorKind::Unless, a), b]),
        );
        let error = lower_chain(&paused).unwrap_err();
        assert!(error.message.contains("'unless' with '||'"), "{}", error.message);

        // A chain made only of plain conditions still takes the flag
        let never = flag(BehaviorKind::Never, logic(ConditionalOperation::And, vec![c, d]));
        assert_eq!(
            lower_chain(&never).unwrap().last().map(|r| r.kind),
            Some(RequirementType::ResetIf)
        );
    }

    #[test]
    fn test_constant_triggers() {
        assert_eq!(trigger_text(&Expression::boolean(true, span())), "1=1");
        assert_eq!(trigger_text(&Expression::boolean(false, span())), "0=1");
        assert!(build_trigger(&int(3)).is_err());
    }

    #[test]
    fn test_deduct_outside_tally_fails() {
        let a = compare(&byte(1), ComparisonOperation::Equal, &int(1));
        let deduct = Expression::expanded(ExpressionKind::Deduct(a), span());
        assert!(lower_chain(&deduct).is_err());
    }

    #[test]
    fn test_value_lowering() {
        let scaled = math(&byte(1), MathematicOperation::Multiply, &int(10));
        let sum = math(&scaled, MathematicOperation::Add, &byte(2));
        let value = build_value(&sum).unwrap();
        let context = SerializationContext::new().with_min_version(crate::requirements::SoftwareVersion::V0_77);
        assert_eq!(serialize_value(&value, &context).unwrap(), "0xH000001*10_0xH000002");
        let context = SerializationContext::new().with_min_version(crate::requirements::SoftwareVersion::V0_78);
        assert_eq!(serialize_value(&value, &context).unwrap(), "A:0xH000001*10_M:0xH000002");

        let max = Expression::expanded(ExpressionKind::MaxOf(vec![byte(1), byte(2)]), span());
        let value = build_value(&max).unwrap();
        assert_eq!(value.groups.len(), 2);
    }

    #[test]
    fn test_compound_modifier_uses_remember() {
        let sum = Expression::as_logical_unit(&math(&byte(1), MathematicOperation::Add, &byte(2)));
        let divided = math(&sum, MathematicOperation::Divide, &int(3));
        let requirements = lower_sum(&divided, RequirementType::Measured).unwrap();
        assert_eq!(requirements.len(), 3);
        assert_eq!(requirements[1].kind, RequirementType::Remember);
        assert_eq!(requirements[2].left, Field::recall());
        assert_eq!(requirements[2].operator, RequirementOperator::Divide);
    }
}
