//! Incremental re-parse and re-evaluation
//!
//! Source is partitioned into [`ExpressionGroup`]s. An update re-parses from
//! the first group touched by the edit, keeps every group whose statement
//! is structurally unchanged (old groups are matched from the end of the
//! document backwards), and flags for evaluation only the changed groups
//! plus everything that reads a name they write.

mod group;

pub use group::{ExpressionGroup, GroupOutput, NameGraph};

use crate::config::constants::compile_time::incremental::{MAX_GROUPS, MAX_PROPAGATION_ITERATIONS};
use crate::config::constants::compile_time::interpreter::MAX_COLLECTED_ERRORS;
use crate::config::runtime::IncrementalPreferences;
use crate::interpreter::{execute, is_builtin, ErrorExpression, InterpreterScope};
use crate::grammar::ast::NameUsage;
use crate::logging::codes;
use crate::output::{Achievement, Leaderboard, RichPresence};
use crate::syntax::ScriptParser;
use crate::tokens::TokenStream;
use crate::utils::{Position, Span};
use crate::{log_debug, log_error, log_success, log_warning};
use serde::Serialize;
use std::collections::BTreeSet;
use std::rc::Rc;

/// Counts from one [`ExpressionGroupCollection::evaluate`] pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EvaluationSummary {
    pub groups_evaluated: usize,
    pub errors: usize,
    pub achievements: usize,
    pub leaderboards: usize,
    pub displays: usize,
}

#[derive(Debug, Default)]
pub struct ExpressionGroupCollection {
    groups: Vec<ExpressionGroup>,
    /// Diagnostics not tied to a statement: tokenization failures, limits
    errors: Vec<ErrorExpression>,
    preferences: IncrementalPreferences,
}

impl ExpressionGroupCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preferences(preferences: IncrementalPreferences) -> Self {
        Self {
            preferences,
            ..Self::default()
        }
    }

    /// Replace everything with a fresh parse of `source`
    pub fn parse(&mut self, source: &str) -> bool {
        self.groups.clear();
        self.update(source, None)
    }

    /// Re-parse after an edit starting at `first_edited_line` (`None` for
    /// anywhere). Returns whether [`evaluate`](Self::evaluate) has work to do.
    pub fn update(&mut self, source: &str, first_edited_line: Option<u32>) -> bool {
        self.errors.clear();

        let tokens = match crate::lexical::tokenize_source(source) {
            Ok(tokens) => tokens,
            Err(error) => {
                let span = match error.location() {
                    Some((line, column)) => Span::single(Position::new(0, line, column)),
                    None => Span::dummy(),
                };
                let removed: Vec<ExpressionGroup> = self.groups.drain(..).collect();
                self.errors.push(ErrorExpression::syntax(error.to_string(), span));
                log_error!(error.error_code(), "Tokenization failed", "error" => error.to_string());
                return removed.iter().any(|g| !g.is_comment());
            }
        };

        let start = self.reparse_start(first_edited_line);
        let start_line = self
            .groups
            .get(start)
            .map(|g| g.first_line)
            .or_else(|| first_edited_line.filter(|_| !self.groups.is_empty()))
            .unwrap_or(1);
        let mut fresh = partition(tokens, start_line);

        // Longest common suffix between the old tail and the new groups
        let mut old_tail: Vec<ExpressionGroup> = self.groups.drain(start..).collect();
        let mut kept: Vec<ExpressionGroup> = Vec::new();
        while matches!((old_tail.last(), fresh.last()), (Some(old), Some(new)) if old.is_equivalent(new)) {
            if let (Some(mut old), Some(new)) = (old_tail.pop(), fresh.pop()) {
                old.relocate(new);
                kept.push(old);
            }
        }
        kept.reverse();

        let mut changed: BTreeSet<String> = BTreeSet::new();
        let mut needs_evaluation = false;
        for removed in &old_tail {
            changed.extend(removed.modifies.iter().cloned());
            needs_evaluation |= !removed.is_comment();
        }

        if self.preferences.log_invalidation_details {
            log_debug!("Groups replaced",
                "removed" => old_tail.len(),
                "added" => fresh.len(),
                "reused" => kept.len()
            );
        }

        let added = start..start + fresh.len();
        self.groups.extend(fresh);
        self.groups.extend(kept);
        let previous: Vec<BTreeSet<String>> = self.groups.iter().map(|g| g.modifies.clone()).collect();
        self.resolve_modifies();
        for (index, group) in self.groups.iter().enumerate() {
            if added.contains(&index) {
                changed.extend(group.modifies.iter().cloned());
                needs_evaluation |= group.needs_evaluation;
            } else if group.modifies != previous[index] {
                // A called function or an alias changed what this statement touches
                changed.extend(group.modifies.symmetric_difference(&previous[index]).cloned());
            }
        }

        if self.groups.len() > MAX_GROUPS {
            log_error!(codes::incremental::GROUP_LIMIT_EXCEEDED, "Too many statements",
                "groups" => self.groups.len(),
                "limit" => MAX_GROUPS
            );
            let span = self
                .groups
                .get(MAX_GROUPS)
                .map_or_else(Span::dummy, |g| Span::single(Position::new(0, g.first_line, 1)));
            self.groups.truncate(MAX_GROUPS);
            self.errors.push(ErrorExpression::semantic(
                format!("Script exceeds {} statements", MAX_GROUPS),
                span,
            ));
        }

        if self.preferences.always_full_evaluation && needs_evaluation {
            for group in self.groups.iter_mut().filter(|g| !g.is_comment()) {
                group.needs_evaluation = true;
            }
        } else {
            needs_evaluation |= self.propagate(changed);
        }

        log_success!(codes::success::INCREMENTAL_UPDATE_COMPLETE,
            "Incremental update completed",
            "groups" => self.groups.len(),
            "needs_evaluation" => needs_evaluation
        );
        needs_evaluation
    }

    /// Index of the first group the edit can affect. Groups sharing a line
    /// with it are re-parsed too.
    fn reparse_start(&self, first_edited_line: Option<u32>) -> usize {
        let Some(line) = first_edited_line else {
            return 0;
        };
        let mut start = self
            .groups
            .iter()
            .position(|g| g.last_line >= line)
            .unwrap_or(self.groups.len());
        while start > 0
            && start < self.groups.len()
            && self.groups[start - 1].last_line >= self.groups[start].first_line
        {
            start -= 1;
        }
        if start == self.groups.len() && start > 0 && self.groups[start - 1].last_line + 1 >= line {
            // Appending directly after the last statement may extend it
            start -= 1;
        }
        start
    }

    /// Recompute what each statement changes once every function
    /// definition and alias in the document is known
    fn resolve_modifies(&mut self) {
        let bodies: Vec<(String, NameUsage)> = self
            .groups
            .iter()
            .filter_map(|g| g.function_body().map(|(name, body)| (name.to_string(), body)))
            .collect();

        let mut effects: NameGraph = bodies
            .iter()
            .map(|(name, body)| (name.clone(), body.mutates.clone()))
            .collect();
        // Functions calling functions take on their callees' effects
        for _ in 0..MAX_PROPAGATION_ITERATIONS {
            let mut grew = false;
            for (name, body) in &bodies {
                let mut reached: BTreeSet<String> = body
                    .passed
                    .iter()
                    .filter(|(callee, _)| !is_builtin(callee))
                    .flat_map(|(_, passed)| passed.iter().cloned())
                    .collect();
                for callee in &body.reads {
                    if let Some(changed) = effects.get(callee) {
                        reached.extend(changed.iter().cloned());
                    }
                }
                let entry = effects.entry(name.clone()).or_default();
                let before = entry.len();
                entry.extend(reached);
                grew |= entry.len() > before;
            }
            if !grew {
                break;
            }
        }

        let mut aliases = NameGraph::new();
        for (name, source) in self.groups.iter().filter_map(ExpressionGroup::alias) {
            aliases.entry(name.to_string()).or_default().insert(source.to_string());
            aliases.entry(source.to_string()).or_default().insert(name.to_string());
        }

        for group in self.groups.iter_mut() {
            group.resolve_modifies(&effects, &aliases);
        }
    }

    /// Flag every group that reads a changed name, then the names those
    /// groups write, until nothing new is flagged. Returns whether any
    /// statement group was flagged.
    fn propagate(&mut self, mut names: BTreeSet<String>) -> bool {
        let mut flagged_any = false;
        for iteration in 0.. {
            if iteration >= MAX_PROPAGATION_ITERATIONS {
                log_warning!("Dependency propagation did not settle",
                    "code" => codes::incremental::PROPAGATION_LIMIT.as_str(),
                    "iterations" => iteration
                );
                for group in self.groups.iter_mut().filter(|g| !g.is_comment()) {
                    group.needs_evaluation = true;
                }
                return true;
            }

            let mut newly_written = BTreeSet::new();
            for group in self.groups.iter_mut() {
                if group.needs_evaluation || group.is_comment() || !group.depends_on(&names) {
                    continue;
                }
                group.needs_evaluation = true;
                flagged_any = true;
                newly_written.extend(group.modifies.iter().filter(|n| !names.contains(*n)).cloned());
            }
            if newly_written.is_empty() {
                break;
            }
            names.extend(newly_written);
        }
        flagged_any
    }

    /// Run flagged groups. Every statement is replayed in order into a
    /// fresh scope, so later groups see the same state a full compile
    /// builds; only flagged groups take new objects and diagnostics.
    pub fn evaluate(&mut self) -> EvaluationSummary {
        let mut scope = InterpreterScope::new();
        let mut summary = EvaluationSummary::default();

        for group in self.groups.iter_mut() {
            let Some(statement) = group.statement.clone() else {
                group.needs_evaluation = false;
                continue;
            };

            let result = execute(&statement, &mut scope);
            let output = scope.output.take();
            if !group.needs_evaluation {
                continue;
            }

            group.needs_evaluation = false;
            summary.groups_evaluated += 1;
            group.errors = match result {
                Ok(()) => Vec::new(),
                Err(error) => {
                    log_error!(error.error_code(), "Statement evaluation failed",
                        span = error.span,
                        "message" => error.message.as_str()
                    );
                    vec![error]
                }
            };
            group.outputs = Rc::new(GroupOutput::from(output));
        }

        summary.errors = self.errors().len();
        summary.achievements = self.achievements().len();
        summary.leaderboards = self.leaderboards().len();
        summary.displays = self.rich_presence().displays.len();
        log_success!(codes::success::EVALUATION_COMPLETE,
            "Evaluation completed",
            "groups_evaluated" => summary.groups_evaluated,
            "errors" => summary.errors
        );
        summary
    }

    pub fn groups(&self) -> &[ExpressionGroup] {
        &self.groups
    }

    /// Every diagnostic in line order, capped at the collection limit
    pub fn errors(&self) -> Vec<&ErrorExpression> {
        let mut errors: Vec<&ErrorExpression> = self
            .errors
            .iter()
            .chain(self.groups.iter().flat_map(|g| g.errors.iter()))
            .collect();
        errors.sort_by_key(|e| (e.span.start.line, e.span.start.column));
        errors.truncate(MAX_COLLECTED_ERRORS);
        errors
    }

    /// Diagnostics of the group covering `line`
    pub fn errors_for_line(&self, line: u32) -> Vec<&ErrorExpression> {
        self.errors
            .iter()
            .filter(|e| e.span.start.line == line)
            .chain(
                self.groups
                    .iter()
                    .filter(|g| g.contains_line(line))
                    .flat_map(|g| g.errors.iter()),
            )
            .collect()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty() || self.groups.iter().any(|g| !g.errors.is_empty())
    }

    pub fn achievements(&self) -> Vec<Rc<Achievement>> {
        self.groups
            .iter()
            .flat_map(|g| g.outputs.achievements.iter().cloned())
            .collect()
    }

    pub fn leaderboards(&self) -> Vec<Rc<Leaderboard>> {
        self.groups
            .iter()
            .flat_map(|g| g.outputs.leaderboards.iter().cloned())
            .collect()
    }

    pub fn rich_presence(&self) -> RichPresence {
        RichPresence::new(
            self.groups
                .iter()
                .flat_map(|g| g.outputs.displays.iter().cloned())
                .collect(),
        )
    }
}

/// Groups for every statement and comment run at or after `start_line`
fn partition(tokens: TokenStream, start_line: u32) -> Vec<ExpressionGroup> {
    let comments: Vec<(u32, u32, String)> = tokens
        .comments()
        .filter(|token| token.span.start.line >= start_line)
        .map(|token| (token.span.start.line, token.span.end.line, token.value.to_string()))
        .collect();

    let mut parser = ScriptParser::new(tokens);
    parser.seek_line(start_line);
    let mut groups: Vec<ExpressionGroup> = Vec::new();
    while let Some(statement) = parser.parse_statement() {
        groups.push(ExpressionGroup::statement(statement));
    }

    let mut runs: Vec<ExpressionGroup> = Vec::new();
    for (first, last, text) in comments {
        if groups.iter().any(|g| g.contains_line(first)) {
            continue;
        }
        match runs.last_mut() {
            Some(run) if first <= run.last_line + 1 => {
                run.last_line = run.last_line.max(last);
                if let Some(existing) = run.comment.as_mut() {
                    existing.push('\n');
                    existing.push_str(&text);
                }
            }
            _ => runs.push(ExpressionGroup::comment(first, last, text)),
        }
    }

    groups.extend(runs);
    groups.sort_by_key(|g| g.first_line);
    groups
}

/// Initialize incremental engine logging and validate error codes
pub fn init_incremental_logging() -> Result<(), String> {
    let test_codes = [
        codes::incremental::GROUP_LIMIT_EXCEEDED,
        codes::incremental::PROPAGATION_LIMIT,
    ];
    for code in &test_codes {
        if codes::get_error_metadata(code.as_str()).is_none() {
            return Err(format!(
                "Incremental error code {} not registered",
                code.as_str()
            ));
        }
    }

    log_success!(
        codes::success::SYSTEM_INITIALIZATION_COMPLETED,
        "Incremental engine logging validation completed",
        "error_codes_validated" => test_codes.len()
    );
    Ok(())
}
