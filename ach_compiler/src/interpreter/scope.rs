//! Variable and function bindings
//!
//! Frames live in an arena owned by [`InterpreterScope`]. Frame 0 is the
//! global frame and persists across evaluations; a function call pushes a
//! frame whose parent is the global frame, so a body sees its parameters,
//! the values its closure captured, and globals, in that order.

use super::error::{ErrorExpression, ErrorKind, EvaluationResult};
use crate::config::constants::compile_time::interpreter::MAX_CALL_DEPTH;
use crate::grammar::ast::ExprRef;
use crate::output::OutputCollector;
use crate::utils::Span;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Global,
    Function,
}

/// Why a block stopped before its last statement
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Break,
    Return(Option<ExprRef>),
}

#[derive(Debug, Clone)]
pub struct ScopeFrame {
    pub kind: FrameKind,
    pub parent: Option<usize>,
    pub variables: HashMap<String, ExprRef>,
    /// Named functions, stored as function references
    pub functions: HashMap<String, ExprRef>,
    /// What is being evaluated, for diagnostics
    pub context: String,
    /// Set by `return` and `break`; checked after every statement
    pub completion: Option<Completion>,
    /// Nesting of `for` loops currently running in this frame
    pub loop_depth: usize,
}

impl ScopeFrame {
    fn new(kind: FrameKind, parent: Option<usize>, context: impl Into<String>) -> Self {
        Self {
            kind,
            parent,
            variables: HashMap::new(),
            functions: HashMap::new(),
            context: context.into(),
            completion: None,
            loop_depth: 0,
        }
    }
}

#[derive(Debug)]
pub struct InterpreterScope {
    frames: Vec<ScopeFrame>,
    /// Compiled objects produced by output builtins since the last `take`
    pub output: OutputCollector,
}

impl Default for InterpreterScope {
    fn default() -> Self {
        Self::new()
    }
}

impl InterpreterScope {
    pub fn new() -> Self {
        Self {
            frames: vec![ScopeFrame::new(FrameKind::Global, None, "global")],
            output: OutputCollector::new(),
        }
    }

    fn current(&self) -> &ScopeFrame {
        // Frame 0 is never popped
        &self.frames[self.frames.len() - 1]
    }

    fn current_mut(&mut self) -> &mut ScopeFrame {
        let index = self.frames.len() - 1;
        &mut self.frames[index]
    }

    /// Number of active function calls
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    pub fn in_function(&self) -> bool {
        self.current().kind == FrameKind::Function
    }

    pub fn context(&self) -> &str {
        &self.current().context
    }

    // === LOOKUP ===

    /// Frames visible from the current one, innermost first
    fn visible(&self) -> impl Iterator<Item = &ScopeFrame> {
        let mut next = Some(self.frames.len() - 1);
        std::iter::from_fn(move || {
            let index = next?;
            let frame = &self.frames[index];
            next = frame.parent;
            Some(frame)
        })
    }

    pub fn get_variable(&self, name: &str) -> Option<&ExprRef> {
        self.visible().find_map(|frame| frame.variables.get(name))
    }

    pub fn get_function(&self, name: &str) -> Option<&ExprRef> {
        self.visible().find_map(|frame| frame.functions.get(name))
    }

    /// Value bound in the current function frame, ignoring globals
    pub fn get_local(&self, name: &str) -> Option<&ExprRef> {
        if !self.in_function() {
            return None;
        }
        let frame = self.current();
        frame
            .variables
            .get(name)
            .or_else(|| frame.functions.get(name))
    }

    // === BINDING ===

    /// Assignments always bind in the current frame
    pub fn assign(&mut self, name: &str, value: ExprRef) {
        self.current_mut().variables.insert(name.to_string(), value);
    }

    pub fn define_function(&mut self, name: &str, function: ExprRef) {
        self.current_mut().functions.insert(name.to_string(), function);
    }

    /// Forget a global variable or function
    pub fn remove_global(&mut self, name: &str) {
        let global = &mut self.frames[0];
        global.variables.remove(name);
        global.functions.remove(name);
    }

    pub fn global_names(&self) -> impl Iterator<Item = &String> {
        let global = &self.frames[0];
        global.variables.keys().chain(global.functions.keys())
    }

    // === FRAMES ===

    pub fn push_function(&mut self, context: impl Into<String>, span: Span) -> EvaluationResult<()> {
        if self.depth() >= MAX_CALL_DEPTH {
            return Err(ErrorExpression::new(
                ErrorKind::RecursionLimit,
                "Maximum recursion depth exceeded",
                span,
            ));
        }
        self.frames
            .push(ScopeFrame::new(FrameKind::Function, Some(0), context));
        Ok(())
    }

    /// Drop the current function frame, returning how it completed
    pub fn pop_function(&mut self) -> Option<Completion> {
        if self.frames.len() > 1 {
            self.frames.pop().and_then(|frame| frame.completion)
        } else {
            None
        }
    }

    // === CONTROL FLOW ===

    pub fn is_complete(&self) -> bool {
        self.current().completion.is_some()
    }

    pub fn complete(&mut self, completion: Completion) {
        self.current_mut().completion = Some(completion);
    }

    pub fn take_completion(&mut self) -> Option<Completion> {
        self.current_mut().completion.take()
    }

    pub fn in_loop(&self) -> bool {
        self.current().loop_depth > 0
    }

    pub fn enter_loop(&mut self) {
        self.current_mut().loop_depth += 1;
    }

    pub fn exit_loop(&mut self) {
        let frame = self.current_mut();
        frame.loop_depth = frame.loop_depth.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::ast::Expression;

    #[test]
    fn test_function_frames_see_globals_not_callers() {
        let mut scope = InterpreterScope::new();
        scope.assign("g", Expression::integer(1, Span::dummy()));
        scope.push_function("f", Span::dummy()).unwrap();
        scope.assign("local", Expression::integer(2, Span::dummy()));
        scope.push_function("h", Span::dummy()).unwrap();

        assert!(scope.get_variable("g").is_some());
        assert!(scope.get_variable("local").is_none());
        assert_eq!(scope.depth(), 2);

        scope.pop_function();
        assert!(scope.get_local("local").is_some());
        scope.pop_function();
        assert!(scope.get_local("g").is_none());
        assert_eq!(scope.pop_function(), None);
    }

    #[test]
    fn test_depth_limit() {
        let mut scope = InterpreterScope::new();
        for _ in 0..MAX_CALL_DEPTH {
            scope.push_function("f", Span::dummy()).unwrap();
        }
        let error = scope.push_function("f", Span::dummy()).unwrap_err();
        assert_eq!(error.kind, ErrorKind::RecursionLimit);
        assert!(error.is_fatal());
    }

    #[test]
    fn test_completion_flags() {
        let mut scope = InterpreterScope::new();
        scope.push_function("f", Span::dummy()).unwrap();
        scope.complete(Completion::Return(Some(Expression::integer(3, Span::dummy()))));
        assert!(scope.is_complete());
        assert_eq!(
            scope.pop_function(),
            Some(Completion::Return(Some(Expression::integer(3, Span::dummy()))))
        );
        assert!(!scope.is_complete());
    }
}
