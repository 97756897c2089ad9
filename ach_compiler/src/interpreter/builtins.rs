//! Builtin function table
//!
//! Every builtin declares its parameter names so positional and named
//! arguments bind the same way they do for user functions. Memory
//! accessors (`byte`, `word`, `float_be`...) are resolved from the field
//! size table rather than listed individually.

use super::error::{ErrorExpression, EvaluationResult};
use super::evaluator::iteration_items;
use super::functions::{bind_arguments, call_reference, CallArguments};
use super::scope::InterpreterScope;
use crate::config::constants::compile_time::interpreter::MAX_LOOP_ITERATIONS;
use crate::grammar::ast::{
    BehaviorKind, ConditionalOperation, ExprRef, Expression, ExpressionKind, MathematicOperation,
    MemoryModifierKind,
};
use crate::normalization::{
    build_trigger, build_value, combine_logical, combine_mathematic, invert, is_condition,
};
use crate::output::{Achievement, Leaderboard, RichPresenceDisplay, RichPresenceMacro, ValueFormat};
use crate::requirements::FieldSize;
use crate::utils::Span;
use crate::log_debug;
use std::cell::RefCell;
use std::rc::Rc;

type Handler = fn(&mut BuiltinCall<'_>) -> EvaluationResult<Option<ExprRef>>;

#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub parameters: &'static [&'static str],
    /// Leading parameters that must be provided
    pub required: usize,
    /// Extra positional arguments are collected instead of rejected
    pub variadic: bool,
    handler: Handler,
}

impl std::fmt::Debug for Builtin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .finish()
    }
}

impl Builtin {
    const fn new(
        name: &'static str,
        parameters: &'static [&'static str],
        required: usize,
        handler: Handler,
    ) -> Self {
        Self {
            name,
            parameters,
            required,
            variadic: false,
            handler,
        }
    }

    const fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    pub fn call(
        &self,
        name: &str,
        arguments: CallArguments,
        span: Span,
        scope: &mut InterpreterScope,
    ) -> EvaluationResult<Option<ExprRef>> {
        let bound = bind_arguments(name, self.parameters, self.variadic, arguments, span)?;
        for (parameter, value) in self.parameters.iter().zip(&bound.values).take(self.required) {
            if value.is_none() {
                return Err(ErrorExpression::semantic(
                    format!("Required parameter '{}' not provided", parameter),
                    span,
                ));
            }
        }

        let mut call = BuiltinCall {
            name,
            span,
            scope,
            parameters: self.parameters,
            values: bound.values,
            rest: bound.rest,
        };
        (self.handler)(&mut call)
    }
}

/// Bound arguments of one builtin invocation
pub struct BuiltinCall<'a> {
    pub name: &'a str,
    pub span: Span,
    pub scope: &'a mut InterpreterScope,
    parameters: &'static [&'static str],
    values: Vec<Option<ExprRef>>,
    /// Variadic arguments
    pub rest: Vec<ExprRef>,
}

impl BuiltinCall<'_> {
    fn value(&self, parameter: &str) -> Option<&ExprRef> {
        self.parameters
            .iter()
            .position(|p| *p == parameter)
            .and_then(|index| self.values[index].as_ref())
    }

    fn argument(&self, parameter: &str) -> EvaluationResult<ExprRef> {
        self.value(parameter).cloned().ok_or_else(|| {
            ErrorExpression::semantic(
                format!("Required parameter '{}' not provided", parameter),
                self.span,
            )
        })
    }

    fn integer(&self, parameter: &str) -> EvaluationResult<i64> {
        let value = self.argument(parameter)?;
        value.as_integer().ok_or_else(|| {
            ErrorExpression::type_error(
                format!("{} must be an integer, found {}", parameter, value.type_name()),
                value.span,
            )
        })
    }

    fn unsigned(&self, parameter: &str) -> EvaluationResult<u32> {
        let value = self.integer(parameter)?;
        u32::try_from(value).map_err(|_| {
            ErrorExpression::semantic(
                format!("{} must be between 0 and {}", parameter, u32::MAX),
                self.span,
            )
        })
    }

    fn unsigned_or(&self, parameter: &str, default: u32) -> EvaluationResult<u32> {
        match self.value(parameter) {
            Some(_) => self.unsigned(parameter),
            None => Ok(default),
        }
    }

    fn string(&self, parameter: &str) -> EvaluationResult<String> {
        let value = self.argument(parameter)?;
        value.as_string().map(str::to_string).ok_or_else(|| {
            ErrorExpression::type_error(
                format!("{} must be a string, found {}", parameter, value.type_name()),
                value.span,
            )
        })
    }

    fn condition(&self, parameter: &str) -> EvaluationResult<ExprRef> {
        let value = self.argument(parameter)?;
        if is_condition(&value) {
            Ok(value)
        } else {
            Err(ErrorExpression::type_error(
                format!("{} must be a condition, found {}", parameter, value.type_name()),
                value.span,
            ))
        }
    }

    fn format(&self, parameter: &str) -> EvaluationResult<ValueFormat> {
        match self.value(parameter) {
            None => Ok(ValueFormat::Value),
            Some(_) => {
                let name = self.string(parameter)?;
                ValueFormat::from_name(&name).ok_or_else(|| {
                    ErrorExpression::semantic(format!("Unknown format: {}", name), self.span)
                })
            }
        }
    }

    /// Call `predicate` with one argument, requiring a value back
    fn apply(&mut self, predicate: &ExprRef, item: ExprRef) -> EvaluationResult<ExprRef> {
        let span = self.span;
        call_reference(predicate, CallArguments::positional(vec![item]), span, self.scope)?
            .ok_or_else(|| ErrorExpression::semantic("predicate did not return a value", span))
    }

    /// `predicate(item)` for every element of `inputs`
    fn map_inputs(&mut self) -> EvaluationResult<Vec<(ExprRef, ExprRef)>> {
        let inputs = self.argument("inputs")?;
        let predicate = self.argument("predicate")?;
        let items = iteration_items(&inputs)?;
        let mut results = Vec::with_capacity(items.len());
        for item in items {
            let result = self.apply(&predicate, Rc::clone(&item))?;
            results.push((item, result));
        }
        Ok(results)
    }
}

const ACCESSOR: Builtin = Builtin::new("", &["address"], 1, memory_accessor);

const BUILTINS: &[Builtin] = &[
    // Memory
    Builtin::new("bit", &["index", "address"], 2, bit),
    Builtin::new("prev", &["accessor"], 1, memory_modifier),
    Builtin::new("prior", &["accessor"], 1, memory_modifier),
    Builtin::new("bcd", &["accessor"], 1, memory_modifier),
    Builtin::new("invert", &["accessor"], 1, memory_modifier),
    Builtin::new("recall", &[], 0, recall),
    // Requirement flags
    Builtin::new("once", &["comparison"], 1, once),
    Builtin::new("repeated", &["count", "comparison"], 2, repeated),
    Builtin::new("tally", &["count"], 1, tally).variadic(),
    Builtin::new("deduct", &["comparison"], 1, deduct),
    Builtin::new("never", &["comparison"], 1, behavioral),
    Builtin::new("unless", &["comparison"], 1, behavioral),
    Builtin::new("trigger_when", &["comparison"], 1, behavioral),
    Builtin::new("measured", &["comparison", "when", "format"], 1, measured),
    Builtin::new("always_true", &[], 0, always_true),
    Builtin::new("always_false", &[], 0, always_false),
    Builtin::new("max_of", &[], 0, max_of).variadic(),
    // Collections
    Builtin::new("length", &["object"], 1, length),
    Builtin::new("range", &["start", "stop", "step"], 2, range),
    Builtin::new("array_push", &["array", "value"], 2, array_push),
    Builtin::new("array_pop", &["array"], 1, array_pop),
    Builtin::new("dictionary_contains_key", &["dictionary", "key"], 2, dictionary_contains_key),
    Builtin::new("any_of", &["inputs", "predicate"], 2, any_of),
    Builtin::new("all_of", &["inputs", "predicate"], 2, all_of),
    Builtin::new("none_of", &["inputs", "predicate"], 2, none_of),
    Builtin::new("sum_of", &["inputs", "predicate"], 2, sum_of),
    Builtin::new("array_map", &["inputs", "predicate"], 2, array_map),
    Builtin::new("array_filter", &["inputs", "predicate"], 2, array_filter),
    // Strings
    Builtin::new("format", &["format_string"], 1, format).variadic(),
    // Output
    Builtin::new(
        "achievement",
        &["title", "description", "points", "trigger", "id", "badge"],
        4,
        achievement,
    ),
    Builtin::new(
        "leaderboard",
        &[
            "title",
            "description",
            "start",
            "cancel",
            "submit",
            "value",
            "format",
            "lower_is_better",
            "id",
        ],
        6,
        leaderboard,
    ),
    Builtin::new("rich_presence_display", &["format_string"], 1, rich_presence_display).variadic(),
    Builtin::new(
        "rich_presence_conditional_display",
        &["condition", "format_string"],
        2,
        rich_presence_conditional_display,
    )
    .variadic(),
    Builtin::new("rich_presence_value", &["name", "expression", "format"], 2, rich_presence_value),
];

pub fn find_builtin(name: &str) -> Option<Builtin> {
    if let Some(size) = FieldSize::from_function_name(name) {
        return Some(Builtin {
            name: size.function_name(),
            ..ACCESSOR
        });
    }
    BUILTINS.iter().find(|builtin| builtin.name == name).copied()
}

pub fn is_builtin(name: &str) -> bool {
    find_builtin(name).is_some()
}

// === MEMORY ===

/// Integer addresses must fit 32 bits; memory expressions make pointers
fn memory_address(value: &ExprRef) -> EvaluationResult<ExprRef> {
    match value.kind {
        ExpressionKind::Integer(address) if u32::try_from(address).is_ok() => Ok(Rc::clone(value)),
        ExpressionKind::Integer(address) => Err(ErrorExpression::semantic(
            format!("Address out of range: {}", address),
            value.span,
        )),
        _ if value.depends_on_memory() && !is_condition(value) => Ok(Rc::clone(value)),
        _ => Err(ErrorExpression::type_error(
            format!("address must be an integer or memory reference, found {}", value.type_name()),
            value.span,
        )),
    }
}

fn memory_accessor(call: &mut BuiltinCall<'_>) -> EvaluationResult<Option<ExprRef>> {
    let size = FieldSize::from_function_name(call.name).ok_or_else(|| {
        ErrorExpression::new(
            super::error::ErrorKind::UnknownIdentifier,
            format!("Unknown function: {}", call.name),
            call.span,
        )
    })?;
    let address = memory_address(&call.argument("address")?)?;
    Ok(Some(Expression::expanded(
        ExpressionKind::MemoryAccessor { size, address },
        call.span,
    )))
}

fn bit(call: &mut BuiltinCall<'_>) -> EvaluationResult<Option<ExprRef>> {
    let index = call.integer("index")?;
    let size = u32::try_from(index)
        .ok()
        .and_then(FieldSize::bit)
        .ok_or_else(|| ErrorExpression::semantic("index must be between 0 and 7", call.span))?;
    let address = memory_address(&call.argument("address")?)?;
    Ok(Some(Expression::expanded(
        ExpressionKind::MemoryAccessor { size, address },
        call.span,
    )))
}

/// `prev` and `prior` distribute over arithmetic; `bcd` and `invert` need a
/// plain accessor
fn apply_modifier(modifier: MemoryModifierKind, value: &ExprRef, span: Span) -> EvaluationResult<ExprRef> {
    match &value.kind {
        ExpressionKind::MemoryAccessor { .. } => Ok(Expression::expanded(
            ExpressionKind::MemoryModifier {
                modifier,
                accessor: Rc::clone(value),
            },
            span,
        )),
        ExpressionKind::MemoryModifier { .. } => Err(ErrorExpression::semantic(
            format!("Cannot apply {} to {}", modifier.function_name(), value),
            span,
        )),
        ExpressionKind::Mathematic {
            left,
            operation,
            right,
        } if matches!(modifier, MemoryModifierKind::Prev | MemoryModifierKind::Prior) => {
            let wrap = |operand: &ExprRef| {
                if operand.depends_on_memory() {
                    apply_modifier(modifier, operand, span)
                } else {
                    Ok(Rc::clone(operand))
                }
            };
            let combined = combine_mathematic(&wrap(left)?, *operation, &wrap(right)?, span)?;
            Ok(if value.is_logical_unit {
                Expression::as_logical_unit(&combined)
            } else {
                combined
            })
        }
        _ => Err(ErrorExpression::type_error(
            format!(
                "{} requires a memory accessor, found {}",
                modifier.function_name(),
                value.type_name()
            ),
            value.span,
        )),
    }
}

fn memory_modifier(call: &mut BuiltinCall<'_>) -> EvaluationResult<Option<ExprRef>> {
    let modifier = MemoryModifierKind::from_function_name(call.name)
        .ok_or_else(|| ErrorExpression::semantic(format!("Unknown modifier: {}", call.name), call.span))?;
    apply_modifier(modifier, &call.argument("accessor")?, call.span).map(Some)
}

fn recall(call: &mut BuiltinCall<'_>) -> EvaluationResult<Option<ExprRef>> {
    Ok(Some(Expression::expanded(ExpressionKind::Recall, call.span)))
}

// === REQUIREMENT FLAGS ===

/// Hit-counted conditions. Conditions that can never be true contribute no
/// hits and are dropped.
fn tallied(target: u32, conditions: Vec<ExprRef>, span: Span) -> ExprRef {
    let conditions: Vec<ExprRef> = conditions
        .into_iter()
        .filter(|c| c.as_boolean() != Some(false))
        .collect();
    if conditions.is_empty() {
        return Expression::boolean(false, span);
    }
    Expression::expanded(ExpressionKind::Tallied { target, conditions }, span)
}

fn once(call: &mut BuiltinCall<'_>) -> EvaluationResult<Option<ExprRef>> {
    let condition = call.condition("comparison")?;
    Ok(Some(tallied(1, vec![condition], call.span)))
}

fn repeated(call: &mut BuiltinCall<'_>) -> EvaluationResult<Option<ExprRef>> {
    let count = call.unsigned("count")?;
    let condition = call.condition("comparison")?;
    Ok(Some(tallied(count, vec![condition], call.span)))
}

fn tally(call: &mut BuiltinCall<'_>) -> EvaluationResult<Option<ExprRef>> {
    let count = call.unsigned("count")?;
    let mut conditions = Vec::new();
    for argument in &call.rest {
        let items = match argument.kind {
            ExpressionKind::Array(_) => iteration_items(argument)?,
            _ => vec![Rc::clone(argument)],
        };
        for item in items {
            if !is_condition(&item) && !matches!(item.kind, ExpressionKind::Deduct(_)) {
                return Err(ErrorExpression::type_error(
                    format!("tally conditions must be comparisons, found {}", item.type_name()),
                    item.span,
                ));
            }
            conditions.push(item);
        }
    }
    if conditions.is_empty() {
        return Err(ErrorExpression::semantic(
            "tally requires at least one condition",
            call.span,
        ));
    }
    Ok(Some(tallied(count, conditions, call.span)))
}

fn deduct(call: &mut BuiltinCall<'_>) -> EvaluationResult<Option<ExprRef>> {
    let condition = call.condition("comparison")?;
    Ok(Some(Expression::expanded(ExpressionKind::Deduct(condition), call.span)))
}

fn behavioral(call: &mut BuiltinCall<'_>) -> EvaluationResult<Option<ExprRef>> {
    let behavior = match call.name {
        "never" => BehaviorKind::Never,
        "unless" => BehaviorKind::Unless,
        _ => BehaviorKind::TriggerWhen,
    };
    let condition = call.condition("comparison")?;
    match (behavior, condition.as_boolean()) {
        (BehaviorKind::TriggerWhen, Some(_)) => return Ok(Some(condition)),
        // A reset or pause that never fires has no effect
        (_, Some(false)) => return Ok(Some(Expression::boolean(true, call.span))),
        _ => {}
    }
    Ok(Some(Expression::expanded(
        ExpressionKind::Behavioral {
            behavior,
            condition,
        },
        call.span,
    )))
}

fn measured(call: &mut BuiltinCall<'_>) -> EvaluationResult<Option<ExprRef>> {
    let value = call.argument("comparison")?;
    if !is_condition(&value) && !value.depends_on_memory() {
        return Err(ErrorExpression::type_error(
            format!("measured requires a comparison or memory value, found {}", value.type_name()),
            value.span,
        ));
    }
    let when = match call.value("when") {
        Some(_) => Some(call.condition("when")?),
        None => None,
    };
    let percent = match call.value("format") {
        None => false,
        Some(_) => match call.string("format")?.to_ascii_lowercase().as_str() {
            "raw" => false,
            "percent" => true,
            other => {
                return Err(ErrorExpression::semantic(
                    format!("Unknown format: {}", other),
                    call.span,
                ))
            }
        },
    };
    Ok(Some(Expression::expanded(
        ExpressionKind::Measured {
            value,
            when,
            percent,
        },
        call.span,
    )))
}

fn always_true(call: &mut BuiltinCall<'_>) -> EvaluationResult<Option<ExprRef>> {
    Ok(Some(Expression::expanded(ExpressionKind::AlwaysTrue, call.span)))
}

fn always_false(call: &mut BuiltinCall<'_>) -> EvaluationResult<Option<ExprRef>> {
    Ok(Some(Expression::expanded(ExpressionKind::AlwaysFalse, call.span)))
}

fn max_of(call: &mut BuiltinCall<'_>) -> EvaluationResult<Option<ExprRef>> {
    let mut values = Vec::new();
    for argument in &call.rest {
        let items = match argument.kind {
            ExpressionKind::Array(_) => iteration_items(argument)?,
            _ => vec![Rc::clone(argument)],
        };
        for item in items {
            if is_condition(&item) || !(item.depends_on_memory() || item.is_numeric_literal()) {
                return Err(ErrorExpression::type_error(
                    format!("max_of requires numeric values, found {}", item.type_name()),
                    item.span,
                ));
            }
            values.push(item);
        }
    }
    match values.len() {
        0 => Err(ErrorExpression::semantic("max_of requires at least one value", call.span)),
        1 => Ok(values.pop()),
        _ => Ok(Some(Expression::expanded(ExpressionKind::MaxOf(values), call.span))),
    }
}

// === COLLECTIONS ===

fn length(call: &mut BuiltinCall<'_>) -> EvaluationResult<Option<ExprRef>> {
    let object = call.argument("object")?;
    let length = match &object.kind {
        ExpressionKind::Array(items) => items.borrow().len(),
        ExpressionKind::Dictionary(entries) => entries.borrow().len(),
        ExpressionKind::String(value) => value.chars().count(),
        _ => {
            return Err(ErrorExpression::type_error(
                format!("Cannot take the length of {}", object.type_name()),
                object.span,
            ))
        }
    };
    Ok(Some(Expression::integer(length as i64, call.span)))
}

/// Inclusive of `stop` when the step lands on it
fn range(call: &mut BuiltinCall<'_>) -> EvaluationResult<Option<ExprRef>> {
    let start = call.integer("start")?;
    let stop = call.integer("stop")?;
    let step = match call.value("step") {
        Some(_) => call.integer("step")?,
        None => 1,
    };
    if step == 0 {
        return Err(ErrorExpression::semantic("step must not be zero", call.span));
    }

    let count = if (step > 0 && start > stop) || (step < 0 && start < stop) {
        0
    } else {
        (stop - start) / step + 1
    };
    if count as usize > MAX_LOOP_ITERATIONS {
        return Err(ErrorExpression::semantic(
            format!("range exceeds {} entries", MAX_LOOP_ITERATIONS),
            call.span,
        ));
    }

    let values = (0..count)
        .map(|index| Expression::integer(start + index * step, call.span))
        .collect();
    Ok(Some(Expression::expanded(
        ExpressionKind::Array(Rc::new(RefCell::new(values))),
        call.span,
    )))
}

fn array_argument(call: &BuiltinCall<'_>) -> EvaluationResult<ExprRef> {
    let array = call.argument("array")?;
    match array.kind {
        ExpressionKind::Array(_) => Ok(array),
        _ => Err(ErrorExpression::type_error(
            format!("array must be an array, found {}", array.type_name()),
            array.span,
        )),
    }
}

fn array_push(call: &mut BuiltinCall<'_>) -> EvaluationResult<Option<ExprRef>> {
    let array = array_argument(call)?;
    let value = call.argument("value")?;
    if let ExpressionKind::Array(items) = &array.kind {
        items.borrow_mut().push(value);
    }
    Ok(None)
}

/// An empty array pops as 0
fn array_pop(call: &mut BuiltinCall<'_>) -> EvaluationResult<Option<ExprRef>> {
    let array = array_argument(call)?;
    let popped = match &array.kind {
        ExpressionKind::Array(items) => items.borrow_mut().pop(),
        _ => None,
    };
    Ok(Some(popped.unwrap_or_else(|| Expression::integer(0, call.span))))
}

fn dictionary_contains_key(call: &mut BuiltinCall<'_>) -> EvaluationResult<Option<ExprRef>> {
    let dictionary = call.argument("dictionary")?;
    let key = call.argument("key")?;
    match &dictionary.kind {
        ExpressionKind::Dictionary(entries) => {
            let found = entries.borrow().iter().any(|(existing, _)| *existing == key);
            Ok(Some(Expression::boolean(found, call.span)))
        }
        _ => Err(ErrorExpression::type_error(
            format!("dictionary must be a dictionary, found {}", dictionary.type_name()),
            dictionary.span,
        )),
    }
}

fn predicate_conditions(call: &mut BuiltinCall<'_>) -> EvaluationResult<Vec<ExprRef>> {
    let results = call.map_inputs()?;
    results
        .into_iter()
        .map(|(_, result)| {
            if is_condition(&result) {
                Ok(result)
            } else {
                Err(ErrorExpression::type_error(
                    format!("predicate must return a condition, found {}", result.type_name()),
                    result.span,
                ))
            }
        })
        .collect()
}

fn any_of(call: &mut BuiltinCall<'_>) -> EvaluationResult<Option<ExprRef>> {
    let conditions = predicate_conditions(call)?;
    combine_logical(ConditionalOperation::Or, conditions, call.span).map(Some)
}

fn all_of(call: &mut BuiltinCall<'_>) -> EvaluationResult<Option<ExprRef>> {
    let conditions = predicate_conditions(call)?;
    combine_logical(ConditionalOperation::And, conditions, call.span).map(Some)
}

fn none_of(call: &mut BuiltinCall<'_>) -> EvaluationResult<Option<ExprRef>> {
    let inverted = predicate_conditions(call)?
        .iter()
        .map(invert)
        .collect::<EvaluationResult<Vec<_>>>()?;
    combine_logical(ConditionalOperation::And, inverted, call.span).map(Some)
}

fn sum_of(call: &mut BuiltinCall<'_>) -> EvaluationResult<Option<ExprRef>> {
    let span = call.span;
    let mut total = Expression::integer(0, span);
    for (_, result) in call.map_inputs()? {
        total = combine_mathematic(&total, MathematicOperation::Add, &result, span)?;
    }
    Ok(Some(total))
}

fn array_map(call: &mut BuiltinCall<'_>) -> EvaluationResult<Option<ExprRef>> {
    let values = call.map_inputs()?.into_iter().map(|(_, result)| result).collect();
    Ok(Some(Expression::expanded(
        ExpressionKind::Array(Rc::new(RefCell::new(values))),
        call.span,
    )))
}

fn array_filter(call: &mut BuiltinCall<'_>) -> EvaluationResult<Option<ExprRef>> {
    let mut kept = Vec::new();
    for (item, result) in call.map_inputs()? {
        match result.as_boolean() {
            Some(true) => kept.push(item),
            Some(false) => {}
            None if result.depends_on_memory() => {
                return Err(ErrorExpression::runtime_incompatibility(
                    "array_filter predicate must be decidable at compile time",
                    result.span,
                ))
            }
            None => {
                return Err(ErrorExpression::type_error(
                    format!("predicate must return a boolean, found {}", result.type_name()),
                    result.span,
                ))
            }
        }
    }
    Ok(Some(Expression::expanded(
        ExpressionKind::Array(Rc::new(RefCell::new(kept))),
        call.span,
    )))
}

// === STRINGS ===

/// Replace `{N}` placeholders using `lookup`
fn substitute(
    text: &str,
    span: Span,
    mut lookup: impl FnMut(usize) -> Option<String>,
) -> EvaluationResult<String> {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        if c == '{' {
            let digits: String = text[start + 1..]
                .chars()
                .take_while(|d| d.is_ascii_digit())
                .collect();
            if !digits.is_empty() && text[start + 1 + digits.len()..].starts_with('}') {
                let index: usize = digits.parse().map_err(|_| {
                    ErrorExpression::semantic(format!("Invalid parameter index: {}", digits), span)
                })?;
                let replacement = lookup(index).ok_or_else(|| {
                    ErrorExpression::semantic(format!("Invalid parameter index: {}", index), span)
                })?;
                result.push_str(&replacement);
                for _ in 0..=digits.len() {
                    chars.next();
                }
                continue;
            }
        }
        result.push(c);
    }
    Ok(result)
}

fn format(call: &mut BuiltinCall<'_>) -> EvaluationResult<Option<ExprRef>> {
    let text = call.string("format_string")?;
    let rest = &call.rest;
    let formatted = substitute(&text, call.span, |index| {
        rest.get(index).map(|value| match &value.kind {
            ExpressionKind::String(s) => s.clone(),
            _ => value.to_string(),
        })
    })?;
    Ok(Some(Expression::string(formatted, call.span)))
}

// === OUTPUT ===

fn achievement(call: &mut BuiltinCall<'_>) -> EvaluationResult<Option<ExprRef>> {
    let title = call.string("title")?;
    let description = call.string("description")?;
    let points = call.unsigned("points")?;
    let trigger = build_trigger(&call.argument("trigger")?)?;
    let id = call.unsigned_or("id", 0)?;
    let badge = match call.value("badge") {
        None => "0".to_string(),
        Some(value) => match &value.kind {
            ExpressionKind::String(badge) => badge.clone(),
            ExpressionKind::Integer(badge) => badge.to_string(),
            _ => {
                return Err(ErrorExpression::type_error(
                    format!("badge must be a string, found {}", value.type_name()),
                    value.span,
                ))
            }
        },
    };

    let line = call.span.start.line;
    log_debug!("Achievement compiled", "title" => title.as_str(), "line" => line);
    call.scope.output.achievements.push(Achievement {
        id,
        title,
        description,
        points,
        badge,
        trigger,
        line,
    });
    Ok(None)
}

fn leaderboard(call: &mut BuiltinCall<'_>) -> EvaluationResult<Option<ExprRef>> {
    let title = call.string("title")?;
    let description = call.string("description")?;
    let start = build_trigger(&call.argument("start")?)?;
    let cancel = build_trigger(&call.argument("cancel")?)?;
    let submit = build_trigger(&call.argument("submit")?)?;
    let value = build_value(&call.argument("value")?)?;
    let format = call.format("format")?;
    let lower_is_better = match call.value("lower_is_better") {
        None => false,
        Some(value) => value.as_boolean().ok_or_else(|| {
            ErrorExpression::type_error(
                format!("lower_is_better must be a boolean, found {}", value.type_name()),
                value.span,
            )
        })?,
    };
    let id = call.unsigned_or("id", 0)?;

    let line = call.span.start.line;
    log_debug!("Leaderboard compiled", "title" => title.as_str(), "line" => line);
    call.scope.output.leaderboards.push(Leaderboard {
        id,
        title,
        description,
        start,
        cancel,
        submit,
        value,
        format,
        lower_is_better,
        line,
    });
    Ok(None)
}

fn display_macros(values: &[ExprRef]) -> EvaluationResult<Vec<RichPresenceMacro>> {
    values
        .iter()
        .map(|value| match &value.kind {
            ExpressionKind::RichPresenceValue {
                name,
                value: expression,
                format,
            } => Ok(RichPresenceMacro {
                name: name.clone(),
                format: *format,
                value: build_value(expression)?,
            }),
            _ => Err(ErrorExpression::type_error(
                format!("Display parameter must be a rich_presence_value, found {}", value.type_name()),
                value.span,
            )),
        })
        .collect()
}

fn push_display(call: &mut BuiltinCall<'_>, condition: Option<ExprRef>) -> EvaluationResult<Option<ExprRef>> {
    let text = call.string("format_string")?;
    let macros = display_macros(&call.rest)?;
    substitute(&text, call.span, |index| {
        (index < macros.len()).then(|| format!("{{{}}}", index))
    })?;
    let condition = match condition {
        Some(condition) => Some(build_trigger(&condition)?),
        None => None,
    };
    call.scope.output.displays.push(RichPresenceDisplay {
        condition,
        text,
        macros,
    });
    Ok(None)
}

fn rich_presence_display(call: &mut BuiltinCall<'_>) -> EvaluationResult<Option<ExprRef>> {
    push_display(call, None)
}

fn rich_presence_conditional_display(call: &mut BuiltinCall<'_>) -> EvaluationResult<Option<ExprRef>> {
    let condition = call.condition("condition")?;
    push_display(call, Some(condition))
}

fn rich_presence_value(call: &mut BuiltinCall<'_>) -> EvaluationResult<Option<ExprRef>> {
    let name = call.string("name")?;
    let value = call.argument("expression")?;
    if is_condition(&value) || !(value.depends_on_memory() || value.is_numeric_literal()) {
        return Err(ErrorExpression::type_error(
            format!("expression must be a numeric value, found {}", value.type_name()),
            value.span,
        ));
    }
    let format = call.format("format")?;
    Ok(Some(Expression::expanded(
        ExpressionKind::RichPresenceValue { name, value, format },
        call.span,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::{execute, ErrorKind};
    use crate::requirements::{serialize_trigger, SerializationContext};
    use crate::syntax::parse_source;
    use assert_matches::assert_matches;

    fn run(source: &str) -> (InterpreterScope, EvaluationResult<()>) {
        let mut scope = InterpreterScope::new();
        let mut result = Ok(());
        for statement in parse_source(source) {
            result = execute(&statement, &mut scope);
            if result.is_err() {
                break;
            }
        }
        (scope, result)
    }

    fn shown(scope: &InterpreterScope, name: &str) -> String {
        scope
            .get_variable(name)
            .map(|value| value.to_string())
            .unwrap_or_default()
    }

    fn trigger_of(source: &str) -> String {
        let (scope, result) = run(source);
        assert!(result.is_ok(), "{:?}", result);
        let achievement = &scope.output.achievements[0];
        serialize_trigger(&achievement.trigger, &SerializationContext::new()).unwrap()
    }

    #[test]
    fn test_lookup_resolves_accessors() {
        assert_eq!(find_builtin("word_be").map(|b| b.name), Some("word_be"));
        assert!(is_builtin("tally"));
        assert!(!is_builtin("nope"));
    }

    #[test]
    fn test_hit_counts() {
        assert_eq!(
            trigger_of("achievement(\"T\", \"D\", 5, once(byte(0x10) == 1) && repeated(3, byte(0x11) == 2))\n"),
            "0xH000010=1.1._0xH000011=2.3."
        );
    }

    #[test]
    fn test_never_of_false_is_dropped() {
        assert_eq!(
            trigger_of("achievement(\"T\", \"D\", 5, byte(0x10) == 1 && never(false))\n"),
            "0xH000010=1"
        );
    }

    #[test]
    fn test_prev_distributes_over_arithmetic() {
        let (scope, result) = run("a = prev(byte(0x10) + 2)\n");
        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(shown(&scope, "a"), "prev(byte(0x000010)) + 2");
        let (_, result) = run("a = bcd(byte(0x10) + 2)\n");
        assert_eq!(result.unwrap_err().kind, ErrorKind::Type);
    }

    #[test]
    fn test_range_and_collections() {
        let (scope, result) = run(
            "a = range(1, 5, 2)\nb = range(3, 1, -1)\narray_push(a, 9)\nc = length(a)\nd = array_pop([])\n",
        );
        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(shown(&scope, "a"), "[1, 3, 5, 9]");
        assert_eq!(shown(&scope, "b"), "[3, 2, 1]");
        assert_eq!(shown(&scope, "c"), "4");
        assert_eq!(shown(&scope, "d"), "0");
        let (_, result) = run("a = range(1, 5, 0)\n");
        assert!(result.unwrap_err().message.contains("step"));
    }

    #[test]
    fn test_higher_order_builtins() {
        let (scope, result) = run(
            "a = array_map([1, 2, 3], (x) => x * 10)\nb = array_filter([1, 2, 3, 4], (x) => x % 2 == 0)\nc = sum_of([1, 2, 3], (x) => x)\nd = dictionary_contains_key({\"k\": 1}, \"k\")\n",
        );
        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(shown(&scope, "a"), "[10, 20, 30]");
        assert_eq!(shown(&scope, "b"), "[2, 4]");
        assert_eq!(shown(&scope, "c"), "6");
        assert_eq!(shown(&scope, "d"), "true");
    }

    #[test]
    fn test_any_of_builds_alternatives() {
        assert_eq!(
            trigger_of("achievement(\"T\", \"D\", 5, any_of([1, 2], (a) => byte(a) == 3))\n"),
            "S0xH000001=3S0xH000002=3"
        );
        let (scope, result) = run("a = any_of([], (a) => byte(a) == 3)\n");
        assert!(result.is_ok());
        assert_eq!(shown(&scope, "a"), "false");
    }

    #[test]
    fn test_format_placeholders() {
        let (scope, result) = run("a = format(\"{1}-{0}\", \"x\", 2)\n");
        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(shown(&scope, "a"), "\"2-x\"");
        let (_, result) = run("a = format(\"{3}\", 1)\n");
        assert!(result.unwrap_err().message.contains("Invalid parameter index"));
    }

    #[test]
    fn test_output_defaults_and_named_arguments() {
        let (scope, result) = run(
            "achievement(title = \"T\", description = \"D\", points = 10, trigger = byte(0x20) > 3, id = 7)\n",
        );
        assert!(result.is_ok(), "{:?}", result);
        let achievement = &scope.output.achievements[0];
        assert_eq!(achievement.id, 7);
        assert_eq!(achievement.badge, "0");
        assert_eq!(achievement.points, 10);
    }

    #[test]
    fn test_leaderboard_and_rich_presence() {
        let (scope, result) = run(
            "leaderboard(\"L\", \"D\", byte(0x1) == 1, byte(0x1) == 2, byte(0x1) == 3, word(0x2), format = \"score\", lower_is_better = true)\n\
             rich_presence_conditional_display(byte(0x3) == 1, \"Stage {0}\", rich_presence_value(\"Num\", byte(0x4)))\n\
             rich_presence_display(\"Playing\")\n",
        );
        assert!(result.is_ok(), "{:?}", result);
        let leaderboard = &scope.output.leaderboards[0];
        assert_eq!(leaderboard.format, ValueFormat::Score);
        assert!(leaderboard.lower_is_better);
        assert_eq!(scope.output.displays.len(), 2);
        assert!(scope.output.displays[0].condition.is_some());
        assert_eq!(scope.output.displays[0].macros[0].name, "Num");
        assert!(scope.output.displays[1].condition.is_none());

        let (_, result) = run("rich_presence_display(\"{1}\", rich_presence_value(\"N\", byte(1)))\n");
        assert!(result.unwrap_err().message.contains("Invalid parameter index"));
    }

    #[test]
    fn test_missing_and_mistyped_arguments() {
        let (_, result) = run("achievement(\"T\", \"D\", 5)\n");
        assert_eq!(result.unwrap_err().message, "Required parameter 'trigger' not provided");
        let (_, result) = run("a = byte(\"x\")\n");
        assert_matches!(result.unwrap_err().kind, ErrorKind::Type);
        let (_, result) = run("a = bit(9, 0x10)\n");
        assert!(result.unwrap_err().message.contains("between 0 and 7"));
    }
}
