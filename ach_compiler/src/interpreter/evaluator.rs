//! Expression evaluation and statement execution
//!
//! [`evaluate`] reduces an expression to a fully expanded node: literals,
//! collections, function references, or normalized memory expressions.
//! [`execute`] runs a statement for its effect on the scope.

use super::builtins::find_builtin;
use super::error::{ErrorExpression, EvaluationResult};
use super::functions::{call_reference, function_reference, CallArguments};
use super::scope::{Completion, InterpreterScope};
use crate::config::constants::compile_time::interpreter::MAX_LOOP_ITERATIONS;
use crate::grammar::ast::{
    ConditionalOperation, ExprRef, Expression, ExpressionKind, MathematicOperation,
};
use crate::normalization::{combine_logical, combine_mathematic, invert, normalize_comparison, Number};
use crate::utils::Span;
use std::cell::RefCell;
use std::rc::Rc;

/// Reduce an expression to its value
pub fn evaluate(expression: &ExprRef, scope: &mut InterpreterScope) -> EvaluationResult<ExprRef> {
    if expression.fully_expanded {
        return match &expression.kind {
            ExpressionKind::Error(error) => Err((**error).clone()),
            _ => Ok(Rc::clone(expression)),
        };
    }

    let span = expression.span;
    let result = match &expression.kind {
        ExpressionKind::Integer(_)
        | ExpressionKind::Float(_)
        | ExpressionKind::String(_)
        | ExpressionKind::Boolean(_) => Ok(Expression::expanded(expression.kind.clone(), span)),

        ExpressionKind::Variable(name) => {
            if let Some(value) = scope.get_variable(name) {
                Ok(Rc::clone(value))
            } else if let Some(function) = scope.get_function(name) {
                Ok(Rc::clone(function))
            } else {
                Err(ErrorExpression::unknown_identifier(name, span))
            }
        }

        ExpressionKind::Mathematic {
            left,
            operation,
            right,
        } => {
            let left = evaluate(left, scope)?;
            let right = evaluate(right, scope)?;
            combine_mathematic(&left, *operation, &right, span)
        }

        ExpressionKind::Comparison {
            left,
            operation,
            right,
        } => {
            let left = evaluate(left, scope)?;
            let right = evaluate(right, scope)?;
            normalize_comparison(&left, *operation, &right, span)
        }

        ExpressionKind::Conditional {
            operation,
            operands,
        } => evaluate_conditional(*operation, operands, span, scope),

        ExpressionKind::Negate(inner) => {
            let value = evaluate(inner, scope)?;
            match Number::of(&value) {
                Some(number) => Ok(number.negate().into_expression(span)),
                None => combine_mathematic(
                    &Expression::integer(0, span),
                    MathematicOperation::Subtract,
                    &value,
                    span,
                ),
            }
        }

        ExpressionKind::FunctionCall { name, arguments } => {
            match call_function(name, arguments, span, scope)? {
                Some(value) => Ok(value),
                None => Err(ErrorExpression::semantic(
                    format!("{} did not return a value", name),
                    span,
                )),
            }
        }

        ExpressionKind::Index { target, index } => {
            let container = evaluate(target, scope)?;
            let key = evaluate(index, scope)?;
            lookup_index(&container, &key, span)
        }

        ExpressionKind::ArrayLiteral(items) => {
            let values = items
                .iter()
                .map(|item| evaluate(item, scope))
                .collect::<EvaluationResult<Vec<_>>>()?;
            Ok(Expression::expanded(
                ExpressionKind::Array(Rc::new(RefCell::new(values))),
                span,
            ))
        }

        ExpressionKind::DictionaryLiteral(entries) => {
            let mut values: Vec<(ExprRef, ExprRef)> = Vec::with_capacity(entries.len());
            for (key, value) in entries {
                let key = evaluate(key, scope)?;
                check_dictionary_key(&key)?;
                let value = evaluate(value, scope)?;
                match values.iter_mut().find(|(existing, _)| *existing == key) {
                    Some(entry) => entry.1 = value,
                    None => values.push((key, value)),
                }
            }
            Ok(Expression::expanded(
                ExpressionKind::Dictionary(Rc::new(RefCell::new(values))),
                span,
            ))
        }

        ExpressionKind::FunctionDefinition(function) => Ok(function_reference(function, scope, span)),

        ExpressionKind::Error(error) => Err((**error).clone()),

        ExpressionKind::Assignment { .. }
        | ExpressionKind::If { .. }
        | ExpressionKind::For { .. }
        | ExpressionKind::Return(_)
        | ExpressionKind::Break
        | ExpressionKind::Comment(_) => Err(ErrorExpression::syntax(
            format!("Expected expression, found {}", expression.type_name()),
            span,
        )),

        // Every remaining kind is built by evaluation and is already expanded
        _ => Ok(Rc::clone(expression)),
    }?;

    if expression.is_logical_unit
        && matches!(
            result.kind,
            ExpressionKind::Mathematic { .. } | ExpressionKind::Conditional { .. }
        )
    {
        Ok(Expression::as_logical_unit(&result))
    } else {
        Ok(result)
    }
}

/// `&&` and `||` stop at the first operand that decides the result
fn evaluate_conditional(
    operation: ConditionalOperation,
    operands: &[ExprRef],
    span: Span,
    scope: &mut InterpreterScope,
) -> EvaluationResult<ExprRef> {
    if operation == ConditionalOperation::Not {
        return match operands {
            [operand] => invert(&evaluate(operand, scope)?),
            _ => Err(ErrorExpression::semantic("'!' takes exactly one operand", span)),
        };
    }

    let mut values = Vec::with_capacity(operands.len());
    for operand in operands {
        let value = evaluate(operand, scope)?;
        if let (Some(decided), Some(identity)) = (value.as_boolean(), operation.identity()) {
            if decided != identity {
                return Ok(Expression::boolean(decided, span));
            }
        }
        values.push(value);
    }
    combine_logical(operation, values, span)
}

fn check_dictionary_key(key: &ExprRef) -> EvaluationResult<()> {
    match key.kind {
        ExpressionKind::Integer(_) | ExpressionKind::String(_) => Ok(()),
        _ => Err(ErrorExpression::type_error(
            format!("Dictionary key must be an integer or string, found {}", key.type_name()),
            key.span,
        )),
    }
}

fn lookup_index(container: &ExprRef, key: &ExprRef, span: Span) -> EvaluationResult<ExprRef> {
    match &container.kind {
        ExpressionKind::Array(items) => {
            let items = items.borrow();
            let position = array_position(key, items.len())?;
            Ok(Rc::clone(&items[position]))
        }
        ExpressionKind::Dictionary(entries) => {
            check_dictionary_key(key)?;
            entries
                .borrow()
                .iter()
                .find(|(existing, _)| existing == key)
                .map(|(_, value)| Rc::clone(value))
                .ok_or_else(|| {
                    ErrorExpression::semantic(format!("No entry in dictionary for key: {}", key), key.span)
                })
        }
        _ => Err(ErrorExpression::type_error(
            format!("Cannot index {}", container.type_name()),
            span,
        )),
    }
}

fn array_position(key: &ExprRef, length: usize) -> EvaluationResult<usize> {
    let index = key.as_integer().ok_or_else(|| {
        ErrorExpression::type_error(
            format!("Array index must be an integer, found {}", key.type_name()),
            key.span,
        )
    })?;
    if index < 0 || index as usize >= length {
        let message = if length == 0 {
            format!("Index {} not in range: array is empty", index)
        } else {
            format!("Index {} not in range 0-{}", index, length - 1)
        };
        return Err(ErrorExpression::semantic(message, key.span));
    }
    Ok(index as usize)
}

/// Elements of an array, or keys of a dictionary
pub(crate) fn iteration_items(value: &ExprRef) -> EvaluationResult<Vec<ExprRef>> {
    match &value.kind {
        ExpressionKind::Array(items) => Ok(items.borrow().clone()),
        ExpressionKind::Dictionary(entries) => {
            Ok(entries.borrow().iter().map(|(key, _)| Rc::clone(key)).collect())
        }
        _ => Err(ErrorExpression::type_error(
            format!("Cannot iterate over {}", value.type_name()),
            value.span,
        )),
    }
}

// === CALLS ===

/// Call a user function or builtin by name. `None` when it returned nothing.
pub fn call_function(
    name: &str,
    arguments: &[ExprRef],
    span: Span,
    scope: &mut InterpreterScope,
) -> EvaluationResult<Option<ExprRef>> {
    let user_function = scope
        .get_function(name)
        .or_else(|| {
            scope
                .get_variable(name)
                .filter(|value| matches!(value.kind, ExpressionKind::FunctionReference { .. }))
        })
        .cloned();

    if let Some(reference) = user_function {
        let arguments = CallArguments::evaluate(arguments, scope)?;
        return call_reference(&reference, arguments, span, scope);
    }

    match find_builtin(name) {
        Some(builtin) => {
            let arguments = CallArguments::evaluate(arguments, scope)?;
            builtin.call(name, arguments, span, scope)
        }
        None => Err(ErrorExpression::new(
            super::error::ErrorKind::UnknownIdentifier,
            format!("Unknown function: {}", name),
            span,
        )),
    }
}

// === STATEMENTS ===

/// Run statements in order until one completes the block
pub fn execute_block(statements: &[ExprRef], scope: &mut InterpreterScope) -> EvaluationResult<()> {
    for statement in statements {
        execute(statement, scope)?;
        if scope.is_complete() {
            break;
        }
    }
    Ok(())
}

/// Run one statement
pub fn execute(statement: &ExprRef, scope: &mut InterpreterScope) -> EvaluationResult<()> {
    let span = statement.span;
    match &statement.kind {
        ExpressionKind::Comment(_) => Ok(()),

        ExpressionKind::Error(error) => Err((**error).clone()),

        ExpressionKind::Assignment { target, value } => {
            let value = evaluate(value, scope)?;
            assign(target, value, scope)
        }

        ExpressionKind::FunctionDefinition(function) if !function.is_lambda => {
            let reference = function_reference(function, scope, span);
            scope.define_function(&function.name, reference);
            Ok(())
        }

        ExpressionKind::If {
            condition,
            then_branch,
            else_branch,
        } => {
            let value = evaluate(condition, scope)?;
            match value.as_boolean() {
                Some(true) => execute_block(then_branch, scope),
                Some(false) => execute_block(else_branch, scope),
                None if value.depends_on_memory() => Err(ErrorExpression::runtime_incompatibility(
                    format!("Condition cannot be decided at compile time: {}", value),
                    condition.span,
                )),
                None => Err(ErrorExpression::type_error(
                    format!("Condition must be a boolean, found {}", value.type_name()),
                    condition.span,
                )),
            }
        }

        ExpressionKind::For {
            iterator,
            range,
            body,
        } => {
            let range = evaluate(range, scope)?;
            let items = iteration_items(&range)?;
            if items.len() > MAX_LOOP_ITERATIONS {
                return Err(ErrorExpression::semantic(
                    format!("Loop exceeds {} iterations", MAX_LOOP_ITERATIONS),
                    span,
                ));
            }

            scope.enter_loop();
            let mut result = Ok(());
            for item in items {
                scope.assign(iterator, item);
                result = execute_block(body, scope);
                if result.is_err() {
                    break;
                }
                match scope.take_completion() {
                    Some(Completion::Break) => break,
                    Some(completion) => {
                        scope.complete(completion);
                        break;
                    }
                    None => {}
                }
            }
            scope.exit_loop();
            result
        }

        ExpressionKind::Return(value) => {
            if !scope.in_function() {
                return Err(ErrorExpression::semantic("return is only valid inside a function", span));
            }
            let value = match value {
                Some(value) => Some(evaluate(value, scope)?),
                None => None,
            };
            scope.complete(Completion::Return(value));
            Ok(())
        }

        ExpressionKind::Break => {
            if !scope.in_loop() {
                return Err(ErrorExpression::semantic("break is only valid inside a loop", span));
            }
            scope.complete(Completion::Break);
            Ok(())
        }

        ExpressionKind::FunctionCall { name, arguments } => {
            call_function(name, arguments, span, scope).map(|_| ())
        }

        _ => evaluate(statement, scope).map(|_| ()),
    }
}

fn assign(target: &ExprRef, value: ExprRef, scope: &mut InterpreterScope) -> EvaluationResult<()> {
    match &target.kind {
        ExpressionKind::Variable(name) => {
            scope.assign(name, value);
            Ok(())
        }
        ExpressionKind::Index { target: container, index } => {
            let container = evaluate(container, scope)?;
            let key = evaluate(index, scope)?;
            match &container.kind {
                ExpressionKind::Array(items) => {
                    let mut items = items.borrow_mut();
                    let position = array_position(&key, items.len())?;
                    items[position] = value;
                    Ok(())
                }
                ExpressionKind::Dictionary(entries) => {
                    check_dictionary_key(&key)?;
                    let mut entries = entries.borrow_mut();
                    match entries.iter_mut().find(|(existing, _)| *existing == key) {
                        Some(entry) => entry.1 = value,
                        None => entries.push((key, value)),
                    }
                    Ok(())
                }
                _ => Err(ErrorExpression::type_error(
                    format!("Cannot index {}", container.type_name()),
                    target.span,
                )),
            }
        }
        _ => Err(ErrorExpression::syntax(
            format!("Cannot assign to {}", target.type_name()),
            target.span,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::ErrorKind;
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

    fn value_of(scope: &InterpreterScope, name: &str) -> String {
        scope
            .get_variable(name)
            .map(|value| value.to_string())
            .unwrap_or_default()
    }

    #[test]
    fn test_function_call_compiles_achievement() {
        let (scope, result) = run(
            "function f(x) => x * 2\nachievement(\"T\", \"D\", 5, f(3) == byte(0x1234))\n",
        );
        assert!(result.is_ok(), "{:?}", result);
        let achievement = &scope.output.achievements[0];
        assert_eq!(achievement.title, "T");
        assert_eq!(achievement.points, 5);
        assert_eq!(achievement.line, 2);
        let context = SerializationContext::new();
        assert_eq!(serialize_trigger(&achievement.trigger, &context).unwrap(), "0xH001234=6");
    }

    /// Evaluated value of a condition assigned to a variable
    fn condition(source: &str) -> ExprRef {
        let (scope, result) = run(&format!("c = {}\n", source));
        assert!(result.is_ok(), "{:?}", result);
        scope.get_variable("c").map(Rc::clone).unwrap()
    }

    #[test]
    fn test_expanded_values_evaluate_to_themselves() {
        let mut scope = InterpreterScope::new();
        for source in [
            "byte(0x10) == 3 && (byte(0x11) != 2 || prev(byte(0x12)) > 4)",
            "once(word(0x20) == 1) && never(byte(0x21) == 9)",
            "byte(0x30) * 2 + byte(0x31) >= 10",
        ] {
            let value = condition(source);
            assert!(value.fully_expanded, "{}", source);
            let again = evaluate(&value, &mut scope).unwrap();
            assert!(Rc::ptr_eq(&value, &again), "{}", source);
        }

        let number = evaluate(&Expression::integer(7, Span::dummy()), &mut scope).unwrap();
        assert!(Rc::ptr_eq(&number, &evaluate(&number, &mut scope).unwrap()));
    }

    #[test]
    fn test_double_inversion_restores_condition() {
        for source in [
            "byte(0x01) == 1",
            "byte(0x01) == 1 && byte(0x02) < 2",
            "!(byte(0x01) == 1 || byte(0x02) < 2) && byte(0x03) > 3",
            "(byte(0x01) >= 1 || !(byte(0x02) <= 2 && byte(0x03) != 3)) && word(0x04) == 4",
            "!(!(byte(0x01) == 1) || (byte(0x02) == 2 && (byte(0x03) == 3 || byte(0x04) == 4)))",
        ] {
            let original = condition(source);
            let inverted = invert(&original).unwrap();
            assert_ne!(inverted, original, "{}", source);
            assert_eq!(invert(&inverted).unwrap(), original, "{}", source);
        }
    }

    #[test]
    fn test_arithmetic_and_strings() {
        let (scope, result) = run("a = 2 + 3 * 4\nb = \"n\" + a\nc = -a\n");
        assert!(result.is_ok());
        assert_eq!(value_of(&scope, "a"), "14");
        assert_eq!(value_of(&scope, "b"), "\"n14\"");
        assert_eq!(value_of(&scope, "c"), "-14");
    }

    #[test]
    fn test_collections_share_by_reference() {
        let (scope, result) = run("a = [1, 2]\nb = a\nb[0] = 5\nd = {\"k\": 1}\nd[\"j\"] = a[0]\n");
        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(value_of(&scope, "a"), "[5, 2]");
        let d = scope.get_variable("d").unwrap();
        assert_matches!(&d.kind, ExpressionKind::Dictionary(entries) if entries.borrow().len() == 2);
    }

    #[test]
    fn test_index_errors() {
        let (_, result) = run("a = [1]\nb = a[3]\n");
        assert!(result.unwrap_err().message.contains("not in range"));
        let (_, result) = run("d = {1: 2}\nb = d[7]\n");
        assert!(result.unwrap_err().message.contains("No entry in dictionary"));
    }

    #[test]
    fn test_loops_and_break() {
        let (scope, result) = run(
            "total = 0\nfor i in range(1, 10) {\n  if (i == 4) { break }\n  total = total + i\n}\n",
        );
        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(value_of(&scope, "total"), "6");
    }

    #[test]
    fn test_return_from_loop_in_function() {
        let (scope, result) = run(
            "function first_even(items) {\n  for i in items {\n    if (i % 2 == 0) { return i }\n  }\n  return -1\n}\nv = first_even([3, 5, 8, 10])\n",
        );
        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(value_of(&scope, "v"), "8");
    }

    #[test]
    fn test_closures_capture_locals() {
        let (scope, result) = run(
            "function adder(n) {\n  return (x) => x + n\n}\nadd3 = adder(3)\nv = add3(4)\n",
        );
        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(value_of(&scope, "v"), "7");
    }

    #[test]
    fn test_memory_condition_in_if_is_rejected() {
        let (_, result) = run("if (byte(0x10) == 1) { a = 1 }\n");
        assert_eq!(result.unwrap_err().kind, ErrorKind::RuntimeIncompatibility);
    }

    #[test]
    fn test_statement_errors() {
        let (_, result) = run("return 1\n");
        assert_eq!(result.unwrap_err().kind, ErrorKind::Semantic);
        let (_, result) = run("a = b + 1\n");
        assert_eq!(result.unwrap_err().message, "Unknown variable: b");
        let (_, result) = run("a = nope(1)\n");
        assert_eq!(result.unwrap_err().message, "Unknown function: nope");
    }

    #[test]
    fn test_unbounded_recursion_is_fatal() {
        let (_, result) = run("function f(x) => f(x + 1)\na = f(1)\n");
        let error = result.unwrap_err();
        assert!(error.is_fatal());
        assert_eq!(error.message, "f call failed");
    }

    #[test]
    fn test_short_circuit_skips_errors() {
        let (scope, result) = run("a = false && nope(1)\nb = true || nope(1)\n");
        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(value_of(&scope, "a"), "false");
        assert_eq!(value_of(&scope, "b"), "true");
    }
}
