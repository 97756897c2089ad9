//! Child enumeration and variable read/write analysis
//!
//! The incremental engine keys its dependency tracking on the name sets
//! computed here, and closures use them to decide what to capture.

use super::nodes::{ExprRef, Expression, ExpressionKind};
use std::collections::{BTreeMap, BTreeSet};

/// Builtins that change their first argument in place
pub const MUTATING_BUILTINS: [(&str, &str); 2] = [("array_push", "array"), ("array_pop", "array")];

/// Names a statement reads and writes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameUsage {
    /// Variables read and functions called
    pub reads: BTreeSet<String>,
    /// Variables assigned and functions defined
    pub writes: BTreeSet<String>,
    /// Containers changed in place, by indexed assignment or a mutating builtin
    pub mutates: BTreeSet<String>,
    /// Variables handed directly to each called function
    pub passed: BTreeMap<String, BTreeSet<String>>,
}

impl NameUsage {
    pub fn of(expression: &Expression) -> Self {
        let mut usage = Self::default();
        expression.collect_names(&mut usage);
        usage
    }

    pub fn merge(&mut self, other: NameUsage) {
        self.reads.extend(other.reads);
        self.writes.extend(other.writes);
        self.mutates.extend(other.mutates);
        for (function, names) in other.passed {
            self.passed.entry(function).or_default().extend(names);
        }
    }

    /// Names whose value may differ after the statement runs, not counting
    /// effects hidden inside called user functions
    pub fn changed(&self) -> BTreeSet<String> {
        self.writes.union(&self.mutates).cloned().collect()
    }
}

impl Expression {
    /// Direct children in source order
    pub fn children(&self) -> Vec<&ExprRef> {
        match &self.kind {
            ExpressionKind::Integer(_)
            | ExpressionKind::Float(_)
            | ExpressionKind::String(_)
            | ExpressionKind::Boolean(_)
            | ExpressionKind::AlwaysTrue
            | ExpressionKind::AlwaysFalse
            | ExpressionKind::Variable(_)
            | ExpressionKind::Array(_)
            | ExpressionKind::Dictionary(_)
            | ExpressionKind::FunctionReference { .. }
            | ExpressionKind::Break
            | ExpressionKind::Comment(_)
            | ExpressionKind::Error(_)
            | ExpressionKind::Recall => Vec::new(),
            ExpressionKind::Assignment { target, value } => vec![target, value],
            ExpressionKind::Mathematic { left, right, .. }
            | ExpressionKind::Comparison { left, right, .. } => vec![left, right],
            ExpressionKind::Conditional { operands, .. }
            | ExpressionKind::FunctionCall {
                arguments: operands,
                ..
            }
            | ExpressionKind::ArrayLiteral(operands)
            | ExpressionKind::MaxOf(operands) => operands.iter().collect(),
            ExpressionKind::Tallied { conditions, .. } => conditions.iter().collect(),
            ExpressionKind::Negate(inner) | ExpressionKind::Deduct(inner) => vec![inner],
            ExpressionKind::Index { target, index } => vec![target, index],
            ExpressionKind::DictionaryLiteral(entries) => {
                entries.iter().flat_map(|(k, v)| [k, v]).collect()
            }
            ExpressionKind::FunctionDefinition(definition) => definition
                .defaults
                .iter()
                .map(|(_, value)| value)
                .chain(definition.body.iter())
                .collect(),
            ExpressionKind::If {
                condition,
                then_branch,
                else_branch,
            } => std::iter::once(condition)
                .chain(then_branch.iter())
                .chain(else_branch.iter())
                .collect(),
            ExpressionKind::For { range, body, .. } => {
                std::iter::once(range).chain(body.iter()).collect()
            }
            ExpressionKind::Return(value) => value.iter().collect(),
            ExpressionKind::MemoryAccessor { address, .. } => vec![address],
            ExpressionKind::MemoryModifier { accessor, .. } => vec![accessor],
            ExpressionKind::Behavioral { condition, .. } => vec![condition],
            ExpressionKind::Measured { value, when, .. } => {
                std::iter::once(value).chain(when.iter()).collect()
            }
            ExpressionKind::RichPresenceValue { value, .. } => vec![value],
        }
    }

    /// Pre-order walk over this node and every descendant
    pub fn walk(&self, visit: &mut dyn FnMut(&Expression)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// Accumulate the names this node reads and writes
    pub fn collect_names(&self, usage: &mut NameUsage) {
        match &self.kind {
            ExpressionKind::Variable(name) => {
                usage.reads.insert(name.clone());
            }
            ExpressionKind::FunctionCall { name, arguments } => {
                usage.reads.insert(name.clone());
                let container = MUTATING_BUILTINS
                    .iter()
                    .find(|(builtin, _)| *builtin == name.as_str())
                    .map(|(_, parameter)| *parameter);
                for (position, argument) in arguments.iter().enumerate() {
                    // Named arguments are not assignments
                    let (parameter, value) = match &argument.kind {
                        ExpressionKind::Assignment { target, value } => match &target.kind {
                            ExpressionKind::Variable(parameter) => (Some(parameter.as_str()), value),
                            _ => (None, argument),
                        },
                        _ => (None, argument),
                    };
                    value.collect_names(usage);

                    let Some(root) = root_variable(value) else {
                        continue;
                    };
                    let mutated = match parameter {
                        Some(parameter) => container == Some(parameter),
                        None => position == 0 && container.is_some(),
                    };
                    if mutated {
                        usage.mutates.insert(root.to_string());
                    }
                    usage
                        .passed
                        .entry(name.clone())
                        .or_default()
                        .insert(root.to_string());
                }
            }
            ExpressionKind::Assignment { target, value } => {
                match &target.kind {
                    ExpressionKind::Variable(name) => {
                        usage.writes.insert(name.clone());
                    }
                    ExpressionKind::Index { .. } => {
                        // x[k] = v reads x, mutates it, and reads k
                        if let Some(container) = root_variable(target) {
                            usage.mutates.insert(container.to_string());
                        }
                        target.collect_names(usage);
                    }
                    _ => target.collect_names(usage),
                }
                value.collect_names(usage);
            }
            ExpressionKind::FunctionDefinition(definition) => {
                for (_, value) in &definition.defaults {
                    value.collect_names(usage);
                }
                let body = function_body_usage(&definition.parameters, &definition.body);
                if definition.name.is_empty() {
                    // A lambda may run anywhere in this statement
                    usage.merge(body);
                } else {
                    usage.writes.insert(definition.name.clone());
                    usage.reads.extend(body.reads);
                }
            }
            ExpressionKind::For {
                iterator,
                range,
                body,
            } => {
                usage.writes.insert(iterator.clone());
                range.collect_names(usage);
                for statement in body {
                    statement.collect_names(usage);
                }
            }
            _ => {
                for child in self.children() {
                    child.collect_names(usage);
                }
            }
        }
    }
}

/// Variable at the base of an index chain (`x` in `x[1][2]`)
pub fn root_variable(expression: &Expression) -> Option<&str> {
    match &expression.kind {
        ExpressionKind::Variable(name) => Some(name),
        ExpressionKind::Index { target, .. } => root_variable(target),
        _ => None,
    }
}

/// Names a function body uses that are not its own parameters or locals
pub fn function_free_names(parameters: &[String], body: &[ExprRef]) -> BTreeSet<String> {
    function_body_usage(parameters, body).reads
}

/// Usage of a function body restricted to names from outside it. Locals
/// and parameters are dropped; assignments inside the body bind locals, so
/// only in-place mutations and handed-on containers escape.
pub fn function_body_usage(parameters: &[String], body: &[ExprRef]) -> NameUsage {
    let mut usage = NameUsage::default();
    for statement in body {
        statement.collect_names(&mut usage);
    }
    let locals = usage.writes;
    let is_free = |name: &String| !parameters.contains(name) && !locals.contains(name);

    NameUsage {
        reads: usage.reads.into_iter().filter(|n| is_free(n)).collect(),
        writes: BTreeSet::new(),
        mutates: usage.mutates.into_iter().filter(|n| is_free(n)).collect(),
        passed: usage
            .passed
            .into_iter()
            .map(|(function, names)| (function, names.into_iter().filter(|n| is_free(n)).collect()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_source;

    fn usage_of(source: &str) -> NameUsage {
        let statements = parse_source(source);
        let mut usage = NameUsage::default();
        for statement in &statements {
            usage.merge(NameUsage::of(statement));
        }
        usage
    }

    #[test]
    fn test_assignment_reads_and_writes() {
        let usage = usage_of("b = a + 1\n");
        assert!(usage.reads.contains("a"));
        assert!(usage.writes.contains("b"));
        assert!(!usage.reads.contains("b"));
    }

    #[test]
    fn test_function_definition_excludes_parameters() {
        let usage = usage_of("function f(x) { y = x * scale\n return y }\n");
        assert!(usage.writes.contains("f"));
        assert!(usage.reads.contains("scale"));
        assert!(!usage.reads.contains("x"));
        assert!(!usage.reads.contains("y"));
    }

    #[test]
    fn test_named_arguments_are_not_writes() {
        let usage = usage_of("achievement(\"T\", \"D\", 5, trigger, id = base)\n");
        assert!(usage.reads.contains("achievement"));
        assert!(usage.reads.contains("trigger"));
        assert!(usage.reads.contains("base"));
        assert!(usage.writes.is_empty());
    }

    #[test]
    fn test_indexed_assignment_mutates_container() {
        let usage = usage_of("table[key] = 3\n");
        assert!(usage.mutates.contains("table"));
        assert!(usage.changed().contains("table"));
        assert!(usage.reads.contains("key"));
    }

    #[test]
    fn test_mutating_builtins_change_their_container() {
        let usage = usage_of("array_push(items[0], count)\n");
        assert!(usage.mutates.contains("items"));
        assert!(!usage.mutates.contains("count"));

        let named = usage_of("array_push(value = 1, array = stack)\n");
        assert!(named.mutates.contains("stack"));

        let popped = usage_of("x = array_pop(stack)\n");
        assert_eq!(
            popped.changed(),
            BTreeSet::from(["stack".to_string(), "x".to_string()])
        );
    }

    #[test]
    fn test_function_body_usage_keeps_only_outside_names() {
        let source = "function add(v) { log = [v]\n array_push(history, v)\n record(totals, log) }\n";
        let usage = usage_of(source);
        assert!(usage.writes.contains("add"));
        assert!(usage.mutates.is_empty());

        let statements = parse_source(source);
        let ExpressionKind::FunctionDefinition(definition) = &statements[0].kind else {
            panic!("expected a function definition");
        };
        let body = function_body_usage(&definition.parameters, &definition.body);
        assert_eq!(body.mutates, BTreeSet::from(["history".to_string()]));
        assert_eq!(body.passed["record"], BTreeSet::from(["totals".to_string()]));
        assert!(!body.reads.contains("log"));
    }

    #[test]
    fn test_lambda_mutations_belong_to_the_statement() {
        let usage = usage_of("array_map(inputs, (x) => array_push(seen, x))\n");
        assert!(usage.mutates.contains("seen"));
        assert!(!usage.mutates.contains("x"));
    }
}
