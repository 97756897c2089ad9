//! One top-level statement, or one contiguous run of comments

use crate::grammar::ast::{function_body_usage, root_variable, ExprRef, ExpressionKind, NameUsage};
use crate::interpreter::{is_builtin, ErrorExpression};
use crate::output::{Achievement, Leaderboard, OutputCollector, RichPresenceDisplay};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

/// Name to the names a call or alias can change along with it
pub type NameGraph = BTreeMap<String, BTreeSet<String>>;

/// Objects compiled from one group, shared so an untouched group hands out
/// the same references after every update
#[derive(Debug, Default)]
pub struct GroupOutput {
    pub achievements: Vec<Rc<Achievement>>,
    pub leaderboards: Vec<Rc<Leaderboard>>,
    pub displays: Vec<Rc<RichPresenceDisplay>>,
}

impl GroupOutput {
    pub fn is_empty(&self) -> bool {
        self.achievements.is_empty() && self.leaderboards.is_empty() && self.displays.is_empty()
    }
}

impl From<OutputCollector> for GroupOutput {
    fn from(collector: OutputCollector) -> Self {
        Self {
            achievements: collector.achievements.into_iter().map(Rc::new).collect(),
            leaderboards: collector.leaderboards.into_iter().map(Rc::new).collect(),
            displays: collector.displays.into_iter().map(Rc::new).collect(),
        }
    }
}

#[derive(Debug)]
pub struct ExpressionGroup {
    pub first_line: u32,
    pub last_line: u32,
    /// `None` for a comment run
    pub statement: Option<ExprRef>,
    /// Comment text, for comment runs
    pub comment: Option<String>,
    /// Names the statement assigns, defines or changes in place, including
    /// changes made inside the user functions it calls
    pub modifies: BTreeSet<String>,
    /// Names the statement reads or calls
    pub depends: BTreeSet<String>,
    usage: NameUsage,
    pub needs_evaluation: bool,
    /// Parse and evaluation diagnostics
    pub errors: Vec<ErrorExpression>,
    pub outputs: Rc<GroupOutput>,
}

impl ExpressionGroup {
    pub fn statement(statement: ExprRef) -> Self {
        let usage = NameUsage::of(&statement);
        let errors = statement.as_error().cloned().into_iter().collect();
        let mut group = Self {
            first_line: statement.span.start.line,
            last_line: statement.span.end.line.max(statement.span.start.line),
            modifies: BTreeSet::new(),
            depends: usage.reads.clone(),
            usage,
            statement: Some(statement),
            comment: None,
            needs_evaluation: true,
            errors,
            outputs: Rc::new(GroupOutput::default()),
        };
        group.resolve_modifies(&NameGraph::new(), &NameGraph::new());
        group
    }

    pub fn comment(first_line: u32, last_line: u32, text: String) -> Self {
        Self {
            first_line,
            last_line,
            statement: None,
            comment: Some(text),
            modifies: BTreeSet::new(),
            depends: BTreeSet::new(),
            usage: NameUsage::default(),
            needs_evaluation: false,
            errors: Vec::new(),
            outputs: Rc::new(GroupOutput::default()),
        }
    }

    pub fn is_comment(&self) -> bool {
        self.statement.is_none()
    }

    pub fn contains_line(&self, line: u32) -> bool {
        (self.first_line..=self.last_line).contains(&line)
    }

    /// Same statement tree or same comment text, wherever it sits
    pub fn is_equivalent(&self, other: &ExpressionGroup) -> bool {
        match (&self.statement, &other.statement) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.comment == other.comment,
            _ => false,
        }
    }

    /// Keep this group's results but take position and statement from a
    /// fresh parse of the same text
    pub fn relocate(&mut self, fresh: ExpressionGroup) {
        let delta = fresh.first_line as i64 - self.first_line as i64;
        if delta != 0 {
            for error in &mut self.errors {
                error.shift_lines(delta);
            }
        }
        self.first_line = fresh.first_line;
        self.last_line = fresh.last_line;
        self.statement = fresh.statement;
    }

    pub fn depends_on(&self, names: &BTreeSet<String>) -> bool {
        !self.depends.is_disjoint(names)
    }

    /// Name and outside usage of a named function definition
    pub fn function_body(&self) -> Option<(&str, NameUsage)> {
        match &self.statement.as_ref()?.kind {
            ExpressionKind::FunctionDefinition(definition) if !definition.name.is_empty() => Some((
                definition.name.as_str(),
                function_body_usage(&definition.parameters, &definition.body),
            )),
            _ => None,
        }
    }

    /// `(b, a)` for `b = a` or `b = a[k]`, where both names then share
    /// one container
    pub fn alias(&self) -> Option<(&str, &str)> {
        let ExpressionKind::Assignment { target, value } = &self.statement.as_ref()?.kind else {
            return None;
        };
        match &target.kind {
            ExpressionKind::Variable(name) => Some((name.as_str(), root_variable(value)?)),
            _ => None,
        }
    }

    /// Recompute `modifies` from the effects of every user function and
    /// the known aliases. A container handed to a user function counts as
    /// changed.
    pub fn resolve_modifies(&mut self, effects: &NameGraph, aliases: &NameGraph) {
        let mut in_place = self.usage.mutates.clone();
        for (callee, passed) in &self.usage.passed {
            if !is_builtin(callee) {
                in_place.extend(passed.iter().cloned());
            }
        }
        for callee in &self.usage.reads {
            if let Some(changed) = effects.get(callee) {
                in_place.extend(changed.iter().cloned());
            }
        }

        let mut pending: Vec<String> = in_place.iter().cloned().collect();
        while let Some(name) = pending.pop() {
            for other in aliases.get(&name).into_iter().flatten() {
                if in_place.insert(other.clone()) {
                    pending.push(other.clone());
                }
            }
        }

        self.modifies = self.usage.writes.union(&in_place).cloned().collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_source;

    #[test]
    fn test_statement_name_sets() {
        let statements = parse_source("b = a + f(1)\n");
        let group = ExpressionGroup::statement(std::rc::Rc::clone(&statements[0]));
        assert!(group.modifies.contains("b"));
        assert!(group.depends.contains("a"));
        assert!(group.depends.contains("f"));
        assert!(group.needs_evaluation);
        assert!(group.errors.is_empty());
    }

    #[test]
    fn test_modifies_follows_calls_and_aliases() {
        let statements = parse_source("function fill() { array_push(log, 1) }\nkept = log\nfill()\nadd(items)\n");
        let groups: Vec<ExpressionGroup> = statements
            .iter()
            .map(|s| ExpressionGroup::statement(std::rc::Rc::clone(s)))
            .collect();

        let (name, body) = groups[0].function_body().unwrap();
        assert_eq!(name, "fill");
        assert!(body.mutates.contains("log"));
        assert_eq!(groups[1].alias(), Some(("kept", "log")));

        // A container passed to a user function may be changed by it
        assert!(groups[3].modifies.contains("items"));

        let effects = NameGraph::from([("fill".to_string(), body.mutates.clone())]);
        let aliases = NameGraph::from([
            ("log".to_string(), BTreeSet::from(["kept".to_string()])),
            ("kept".to_string(), BTreeSet::from(["log".to_string()])),
        ]);
        let mut call = ExpressionGroup::statement(std::rc::Rc::clone(&statements[2]));
        assert!(call.modifies.is_empty());
        call.resolve_modifies(&effects, &aliases);
        assert_eq!(
            call.modifies,
            BTreeSet::from(["kept".to_string(), "log".to_string()])
        );
    }

    #[test]
    fn test_relocate_shifts_errors() {
        let statements = parse_source("\n\na = )\n");
        let mut group = ExpressionGroup::statement(std::rc::Rc::clone(&statements[0]));
        assert_eq!(group.errors.len(), 1);
        let moved = parse_source("\n\n\n\na = )\n");
        let fresh = ExpressionGroup::statement(std::rc::Rc::clone(&moved[0]));
        assert!(group.is_equivalent(&fresh));

        let before = group.errors[0].span.start.line;
        group.relocate(fresh);
        assert_eq!(group.first_line, 5);
        assert_eq!(group.errors[0].span.start.line, before + 2);
    }

    #[test]
    fn test_comment_equivalence() {
        let a = ExpressionGroup::comment(1, 1, "// one".into());
        let b = ExpressionGroup::comment(4, 4, "// one".into());
        let c = ExpressionGroup::comment(4, 4, "// two".into());
        assert!(a.is_equivalent(&b));
        assert!(!a.is_equivalent(&c));
        assert!(a.is_comment());
    }
}
