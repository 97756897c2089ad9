//! Argument binding, closures and user function calls

use super::error::{ErrorExpression, EvaluationResult};
use super::evaluator::{evaluate, execute_block};
use super::scope::{Completion, InterpreterScope};
use crate::grammar::ast::{
    function_free_names, ExprRef, Expression, ExpressionKind, FunctionDefinition,
};
use crate::utils::Span;
use std::rc::Rc;

/// Evaluated call arguments in source order
#[derive(Debug, Clone, Default)]
pub struct CallArguments {
    pub positional: Vec<ExprRef>,
    /// `name = value` arguments with the span of the name
    pub named: Vec<(String, ExprRef, Span)>,
}

impl CallArguments {
    pub fn positional(values: Vec<ExprRef>) -> Self {
        Self {
            positional: values,
            named: Vec::new(),
        }
    }

    /// Evaluate call arguments in the caller's scope
    pub fn evaluate(arguments: &[ExprRef], scope: &mut InterpreterScope) -> EvaluationResult<Self> {
        let mut result = Self::default();
        for argument in arguments {
            match &argument.kind {
                ExpressionKind::Assignment { target, value } => match &target.kind {
                    ExpressionKind::Variable(name) => {
                        let value = evaluate(value, scope)?;
                        result.named.push((name.clone(), value, target.span));
                    }
                    _ => {
                        return Err(ErrorExpression::syntax(
                            "Named argument must be an identifier",
                            target.span,
                        ))
                    }
                },
                _ => result.positional.push(evaluate(argument, scope)?),
            }
        }
        Ok(result)
    }
}

/// Arguments matched to parameter slots
#[derive(Debug, Clone)]
pub struct BoundArguments {
    pub values: Vec<Option<ExprRef>>,
    /// Positional arguments past the last parameter of a variadic function
    pub rest: Vec<ExprRef>,
}

/// Match positional arguments to parameters in order, then named ones by
/// name. Errors point at the offending argument, or at the call when the
/// argument has no position of its own.
pub fn bind_arguments<S: AsRef<str>>(
    function: &str,
    parameters: &[S],
    variadic: bool,
    arguments: CallArguments,
    span: Span,
) -> EvaluationResult<BoundArguments> {
    let mut values: Vec<Option<ExprRef>> = vec![None; parameters.len()];
    let mut rest = Vec::new();

    for (index, value) in arguments.positional.into_iter().enumerate() {
        if index < values.len() {
            values[index] = Some(value);
        } else if variadic {
            rest.push(value);
        } else {
            let at = if value.span.is_dummy() { span } else { value.span };
            return Err(ErrorExpression::semantic(
                format!("Too many parameters passed to {}", function),
                at,
            ));
        }
    }

    for (name, value, name_span) in arguments.named {
        let index = parameters
            .iter()
            .position(|p| p.as_ref() == name)
            .ok_or_else(|| {
                ErrorExpression::semantic(
                    format!("'{}' does not have a '{}' parameter", function, name),
                    name_span,
                )
            })?;
        if values[index].is_some() {
            return Err(ErrorExpression::semantic(
                format!("'{}' already has a value", name),
                name_span,
            ));
        }
        values[index] = Some(value);
    }

    Ok(BoundArguments { values, rest })
}

/// Values of the free names a function body uses that are bound in the
/// current function frame. Globals are resolved when the function runs.
pub fn capture(function: &FunctionDefinition, scope: &InterpreterScope) -> Vec<(String, ExprRef)> {
    function_free_names(&function.parameters, &function.body)
        .into_iter()
        .filter_map(|name| scope.get_local(&name).map(|value| (name, Rc::clone(value))))
        .collect()
}

/// Function value for a definition evaluated in `scope`
pub fn function_reference(
    function: &Rc<FunctionDefinition>,
    scope: &InterpreterScope,
    span: Span,
) -> ExprRef {
    Expression::expanded(
        ExpressionKind::FunctionReference {
            function: Rc::clone(function),
            captured: capture(function, scope),
        },
        span,
    )
}

/// Call a function reference. `None` when the body returned no value.
pub fn call_reference(
    reference: &ExprRef,
    arguments: CallArguments,
    span: Span,
    scope: &mut InterpreterScope,
) -> EvaluationResult<Option<ExprRef>> {
    let (function, captured) = match &reference.kind {
        ExpressionKind::FunctionReference { function, captured } => (function, captured),
        _ => {
            return Err(ErrorExpression::type_error(
                format!("Cannot call {}", reference.type_name()),
                span,
            ))
        }
    };
    let name = function.display_name().to_string();

    let bound = bind_arguments(&name, &function.parameters, false, arguments, span)?;
    let mut parameters = Vec::with_capacity(function.parameters.len());
    for (parameter, value) in function.parameters.iter().zip(bound.values) {
        let value = match value {
            Some(value) => value,
            None => match function.default_for(parameter) {
                Some(default) => evaluate(default, scope)?,
                None => {
                    return Err(ErrorExpression::semantic(
                        format!("Required parameter '{}' not provided", parameter),
                        span,
                    ))
                }
            },
        };
        parameters.push((parameter.as_str(), value));
    }

    scope
        .push_function(name.as_str(), span)
        .map_err(|e| e.wrap(format!("{} call failed", name), span))?;
    for (captured_name, value) in captured {
        scope.assign(captured_name, Rc::clone(value));
    }
    for (parameter, value) in parameters {
        scope.assign(parameter, value);
    }

    let result = execute_block(&function.body, scope);
    let completion = scope.pop_function();
    result.map_err(|e| e.wrap(format!("{} call failed", name), span))?;

    Ok(match completion {
        Some(Completion::Return(value)) => value,
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::Position;
    use assert_matches::assert_matches;

    fn int(value: i64) -> ExprRef {
        Expression::integer(value, Span::dummy())
    }

    #[test]
    fn test_positional_then_named() {
        let arguments = CallArguments {
            positional: vec![int(1)],
            named: vec![("c".into(), int(3), Span::dummy())],
        };
        let bound = bind_arguments("f", &["a", "b", "c"], false, arguments, Span::dummy()).unwrap();
        assert_eq!(bound.values[0], Some(int(1)));
        assert_eq!(bound.values[1], None);
        assert_eq!(bound.values[2], Some(int(3)));
    }

    #[test]
    fn test_binding_errors() {
        let call = Span::single(Position::new(40, 3, 5));
        let too_many = CallArguments::positional(vec![int(1), int(2)]);
        let error = bind_arguments("f", &["a"], false, too_many, call).unwrap_err();
        assert!(error.message.contains("Too many parameters"));
        assert_eq!(error.span, call);

        let placed = Span::single(Position::new(44, 3, 9));
        let extra = Expression::expanded(ExpressionKind::Integer(2), placed);
        let too_many = CallArguments::positional(vec![int(1), extra]);
        let error = bind_arguments("f", &["a"], false, too_many, call).unwrap_err();
        assert_eq!(error.span, placed);

        let unknown = CallArguments {
            positional: vec![],
            named: vec![("z".into(), int(1), Span::dummy())],
        };
        let error = bind_arguments("f", &["a"], false, unknown, Span::dummy()).unwrap_err();
        assert!(error.message.contains("does not have a 'z' parameter"));

        let duplicate = CallArguments {
            positional: vec![int(1)],
            named: vec![("a".into(), int(2), Span::dummy())],
        };
        let error = bind_arguments("f", &["a"], false, duplicate, Span::dummy()).unwrap_err();
        assert!(error.message.contains("already has a value"));
    }

    #[test]
    fn test_variadic_rest() {
        let arguments = CallArguments::positional(vec![int(1), int(2), int(3)]);
        let bound = bind_arguments("format", &["format_string"], true, arguments, Span::dummy()).unwrap();
        assert_eq!(bound.rest.len(), 2);
        assert_matches!(bound.values[0].as_ref().map(|v| &v.kind), Some(ExpressionKind::Integer(1)));
    }
}
