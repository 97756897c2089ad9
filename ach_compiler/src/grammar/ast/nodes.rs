//! Expression tree of the achievement script language
//!
//! Design principles:
//! - Closed sum type: every capability is an exhaustive match over
//!   [`ExpressionKind`]
//! - Shared, immutable nodes: children are `Rc<Expression>` and a node is
//!   never mutated once built; evaluation always allocates fresh nodes
//! - Span tracking: every node keeps the span it was parsed from
//! - Structural equality: `==` compares node kinds recursively and ignores
//!   spans, so a re-parse of unchanged text compares equal

use super::operators::{ComparisonOperation, ConditionalOperation, MathematicOperation};
use crate::interpreter::ErrorExpression;
use crate::output::ValueFormat;
use crate::requirements::{FieldSize, FieldType, RequirementType};
use crate::utils::Span;
use std::cell::RefCell;
use std::rc::Rc;

/// Shared handle to an immutable node
pub type ExprRef = Rc<Expression>;

/// Arrays are bound by reference: in-place changes are visible to every
/// holder of the handle
pub type ArrayValue = Rc<RefCell<Vec<ExprRef>>>;

/// Insertion-ordered key/value pairs, bound by reference like arrays
pub type DictionaryValue = Rc<RefCell<Vec<(ExprRef, ExprRef)>>>;

// === MEMORY VIEWS ===

/// Wrappers that change how a memory read is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryModifierKind {
    Prev,
    Prior,
    Bcd,
    Invert,
}

impl MemoryModifierKind {
    pub fn function_name(self) -> &'static str {
        match self {
            Self::Prev => "prev",
            Self::Prior => "prior",
            Self::Bcd => "bcd",
            Self::Invert => "invert",
        }
    }

    pub fn from_function_name(name: &str) -> Option<Self> {
        match name {
            "prev" => Some(Self::Prev),
            "prior" => Some(Self::Prior),
            "bcd" => Some(Self::Bcd),
            "invert" => Some(Self::Invert),
            _ => None,
        }
    }

    pub fn field_type(self) -> FieldType {
        match self {
            Self::Prev => FieldType::PreviousValue,
            Self::Prior => FieldType::PriorValue,
            Self::Bcd => FieldType::BinaryCodedDecimal,
            Self::Invert => FieldType::Invert,
        }
    }
}

/// Flag wrappers that change when a condition applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BehaviorKind {
    Never,
    Unless,
    TriggerWhen,
}

impl BehaviorKind {
    pub fn function_name(self) -> &'static str {
        match self {
            Self::Never => "never",
            Self::Unless => "unless",
            Self::TriggerWhen => "trigger_when",
        }
    }

    pub fn requirement_type(self) -> RequirementType {
        match self {
            Self::Never => RequirementType::ResetIf,
            Self::Unless => RequirementType::PauseIf,
            Self::TriggerWhen => RequirementType::Trigger,
        }
    }
}

// === FUNCTIONS ===

/// A named or anonymous function. Lambdas (`(a) => a + 1`) have an empty
/// name and a body of a single `return`.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    pub parameters: Vec<String>,
    /// Default values for trailing parameters
    pub defaults: Vec<(String, ExprRef)>,
    pub body: Vec<ExprRef>,
    pub is_lambda: bool,
}

impl FunctionDefinition {
    pub fn default_for(&self, parameter: &str) -> Option<&ExprRef> {
        self.defaults
            .iter()
            .find(|(name, _)| name == parameter)
            .map(|(_, value)| value)
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "anonymous function"
        } else {
            &self.name
        }
    }
}

// === NODE KINDS ===

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    // Literals
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    /// Markers that survive logical simplification so they can still be
    /// turned into explicit alt groups
    AlwaysTrue,
    AlwaysFalse,

    // Names and operators
    Variable(String),
    /// Statement only: `target = value` where target is a variable or index
    Assignment {
        target: ExprRef,
        value: ExprRef,
    },
    Mathematic {
        left: ExprRef,
        operation: MathematicOperation,
        right: ExprRef,
    },
    Comparison {
        left: ExprRef,
        operation: ComparisonOperation,
        right: ExprRef,
    },
    /// And/Or over any number of operands; Not has exactly one
    Conditional {
        operation: ConditionalOperation,
        operands: Vec<ExprRef>,
    },
    Negate(ExprRef),

    // Calls and indexing
    /// Named arguments are `Assignment` nodes whose target is the name
    FunctionCall {
        name: String,
        arguments: Vec<ExprRef>,
    },
    Index {
        target: ExprRef,
        index: ExprRef,
    },

    // Collections
    ArrayLiteral(Vec<ExprRef>),
    DictionaryLiteral(Vec<(ExprRef, ExprRef)>),
    Array(ArrayValue),
    Dictionary(DictionaryValue),

    // Functions
    FunctionDefinition(Rc<FunctionDefinition>),
    /// A function value with the free variables it captured when created
    FunctionReference {
        function: Rc<FunctionDefinition>,
        captured: Vec<(String, ExprRef)>,
    },

    // Control flow
    If {
        condition: ExprRef,
        then_branch: Vec<ExprRef>,
        else_branch: Vec<ExprRef>,
    },
    For {
        iterator: String,
        range: ExprRef,
        body: Vec<ExprRef>,
    },
    Return(Option<ExprRef>),
    Break,
    Comment(String),

    Error(Rc<ErrorExpression>),

    // Memory
    MemoryAccessor {
        size: FieldSize,
        address: ExprRef,
    },
    MemoryModifier {
        modifier: MemoryModifierKind,
        accessor: ExprRef,
    },
    /// The value accumulated by the runtime's remember slot
    Recall,

    // Requirement flags
    Behavioral {
        behavior: BehaviorKind,
        condition: ExprRef,
    },
    Measured {
        value: ExprRef,
        when: Option<ExprRef>,
        percent: bool,
    },
    /// `once`, `repeated` and `tally`: the conditions' hits add up to
    /// `target`
    Tallied {
        target: u32,
        conditions: Vec<ExprRef>,
    },
    /// A tally condition whose hits are subtracted
    Deduct(ExprRef),
    MaxOf(Vec<ExprRef>),
    RichPresenceValue {
        name: String,
        value: ExprRef,
        format: ValueFormat,
    },
}

// === NODE ===

#[derive(Debug, Clone)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub span: Span,
    /// Written in parentheses; rebalancing must not reach into it
    pub is_logical_unit: bool,
    /// Produced by evaluation; evaluating it again yields the same node
    pub fully_expanded: bool,
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Expression {
    /// A node straight from the parser
    pub fn new(kind: ExpressionKind, span: Span) -> ExprRef {
        Rc::new(Self {
            kind,
            span,
            is_logical_unit: false,
            fully_expanded: false,
        })
    }

    /// A node that evaluates to itself
    pub fn expanded(kind: ExpressionKind, span: Span) -> ExprRef {
        Rc::new(Self {
            kind,
            span,
            is_logical_unit: false,
            fully_expanded: true,
        })
    }

    pub fn integer(value: i64, span: Span) -> ExprRef {
        Self::expanded(ExpressionKind::Integer(value), span)
    }

    pub fn float(value: f64, span: Span) -> ExprRef {
        Self::expanded(ExpressionKind::Float(value), span)
    }

    pub fn string(value: impl Into<String>, span: Span) -> ExprRef {
        Self::expanded(ExpressionKind::String(value.into()), span)
    }

    pub fn boolean(value: bool, span: Span) -> ExprRef {
        Self::expanded(ExpressionKind::Boolean(value), span)
    }

    pub fn error(error: ErrorExpression) -> ExprRef {
        let span = error.span;
        Self::expanded(ExpressionKind::Error(Rc::new(error)), span)
    }

    /// Copy of `node` flagged as parenthesized
    pub fn as_logical_unit(node: &ExprRef) -> ExprRef {
        if node.is_logical_unit {
            return Rc::clone(node);
        }
        Rc::new(Self {
            is_logical_unit: true,
            ..(**node).clone()
        })
    }

    /// Copy of `node` with a different span
    pub fn with_span(node: &ExprRef, span: Span) -> ExprRef {
        Rc::new(Self {
            span,
            ..(**node).clone()
        })
    }

    // === ACCESSORS ===

    pub fn as_integer(&self) -> Option<i64> {
        match self.kind {
            ExpressionKind::Integer(value) => Some(value),
            _ => None,
        }
    }

    /// Integer or float literal as a number
    pub fn as_number(&self) -> Option<f64> {
        match self.kind {
            ExpressionKind::Integer(value) => Some(value as f64),
            ExpressionKind::Float(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match &self.kind {
            ExpressionKind::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self.kind {
            ExpressionKind::Boolean(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&ErrorExpression> {
        match &self.kind {
            ExpressionKind::Error(error) => Some(error),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, ExpressionKind::Error(_))
    }

    pub fn is_comment(&self) -> bool {
        matches!(self.kind, ExpressionKind::Comment(_))
    }

    /// Integer, float, string or boolean literal
    pub fn is_literal(&self) -> bool {
        matches!(
            self.kind,
            ExpressionKind::Integer(_)
                | ExpressionKind::Float(_)
                | ExpressionKind::String(_)
                | ExpressionKind::Boolean(_)
        )
    }

    /// Integer or float literal
    pub fn is_numeric_literal(&self) -> bool {
        matches!(
            self.kind,
            ExpressionKind::Integer(_) | ExpressionKind::Float(_)
        )
    }

    /// A plain memory read, optionally wrapped in prev/prior/bcd/invert
    pub fn is_memory_reference(&self) -> bool {
        match &self.kind {
            ExpressionKind::MemoryAccessor { .. } => true,
            ExpressionKind::MemoryModifier { accessor, .. } => accessor.is_memory_reference(),
            _ => false,
        }
    }

    /// The value of this node changes with emulated memory
    pub fn depends_on_memory(&self) -> bool {
        match &self.kind {
            ExpressionKind::MemoryAccessor { .. }
            | ExpressionKind::MemoryModifier { .. }
            | ExpressionKind::Recall => true,
            ExpressionKind::Mathematic { left, right, .. }
            | ExpressionKind::Comparison { left, right, .. } => {
                left.depends_on_memory() || right.depends_on_memory()
            }
            ExpressionKind::Conditional { operands, .. } | ExpressionKind::MaxOf(operands) => {
                operands.iter().any(|o| o.depends_on_memory())
            }
            ExpressionKind::Negate(inner) | ExpressionKind::Deduct(inner) => {
                inner.depends_on_memory()
            }
            ExpressionKind::Behavioral { .. }
            | ExpressionKind::Measured { .. }
            | ExpressionKind::Tallied { .. }
            | ExpressionKind::AlwaysTrue
            | ExpressionKind::AlwaysFalse => true,
            _ => false,
        }
    }

    /// Memory size read by the innermost accessor of a memory reference
    pub fn memory_size(&self) -> Option<FieldSize> {
        match &self.kind {
            ExpressionKind::MemoryAccessor { size, .. } => Some(*size),
            ExpressionKind::MemoryModifier { accessor, .. } => accessor.memory_size(),
            _ => None,
        }
    }

    /// Operand evaluates to whole numbers only
    pub fn is_integer_valued(&self) -> bool {
        match &self.kind {
            ExpressionKind::Integer(_) => true,
            ExpressionKind::MemoryAccessor { size, .. } => !size.is_float(),
            ExpressionKind::MemoryModifier { accessor, .. } => accessor.is_integer_valued(),
            ExpressionKind::Mathematic {
                left,
                operation,
                right,
            } => {
                *operation != MathematicOperation::Divide
                    && left.is_integer_valued()
                    && right.is_integer_valued()
            }
            _ => false,
        }
    }

    /// Name used in type errors
    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            ExpressionKind::Integer(_) => "integer",
            ExpressionKind::Float(_) => "float",
            ExpressionKind::String(_) => "string",
            ExpressionKind::Boolean(_) => "boolean",
            ExpressionKind::AlwaysTrue | ExpressionKind::AlwaysFalse => "boolean marker",
            ExpressionKind::Variable(_) => "variable",
            ExpressionKind::Assignment { .. } => "assignment",
            ExpressionKind::Mathematic { .. } => "mathematic expression",
            ExpressionKind::Comparison { .. } => "comparison",
            ExpressionKind::Conditional { .. } => "logical expression",
            ExpressionKind::Negate(_) => "negation",
            ExpressionKind::FunctionCall { .. } => "function call",
            ExpressionKind::Index { .. } => "index",
            ExpressionKind::ArrayLiteral(_) | ExpressionKind::Array(_) => "array",
            ExpressionKind::DictionaryLiteral(_) | ExpressionKind::Dictionary(_) => "dictionary",
            ExpressionKind::FunctionDefinition(_) | ExpressionKind::FunctionReference { .. } => {
                "function"
            }
            ExpressionKind::If { .. } => "if statement",
            ExpressionKind::For { .. } => "for loop",
            ExpressionKind::Return(_) => "return",
            ExpressionKind::Break => "break",
            ExpressionKind::Comment(_) => "comment",
            ExpressionKind::Error(_) => "error",
            ExpressionKind::MemoryAccessor { .. } | ExpressionKind::MemoryModifier { .. } => {
                "memory accessor"
            }
            ExpressionKind::Recall => "recall",
            ExpressionKind::Behavioral { .. }
            | ExpressionKind::Measured { .. }
            | ExpressionKind::Tallied { .. }
            | ExpressionKind::Deduct(_) => "requirement flag",
            ExpressionKind::MaxOf(_) => "value",
            ExpressionKind::RichPresenceValue { .. } => "rich presence value",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::Position;

    fn at(line: u32) -> Span {
        Span::single(Position::new(0, line, 1))
    }

    #[test]
    fn test_structural_equality_ignores_spans() {
        let a = Expression::new(
            ExpressionKind::Mathematic {
                left: Expression::new(ExpressionKind::Variable("x".into()), at(1)),
                operation: MathematicOperation::Add,
                right: Expression::integer(1, at(1)),
            },
            at(1),
        );
        let b = Expression::new(
            ExpressionKind::Mathematic {
                left: Expression::new(ExpressionKind::Variable("x".into()), at(9)),
                operation: MathematicOperation::Add,
                right: Expression::integer(1, at(9)),
            },
            at(9),
        );
        assert_eq!(a, b);
        assert!(!Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_arrays_share_contents_by_reference() {
        let values: ArrayValue = Rc::new(RefCell::new(vec![Expression::integer(1, at(1))]));
        let first = Expression::expanded(ExpressionKind::Array(Rc::clone(&values)), at(1));
        let second = Expression::expanded(ExpressionKind::Array(Rc::clone(&values)), at(2));

        values.borrow_mut().push(Expression::integer(2, at(1)));
        assert_eq!(first, second);
        if let ExpressionKind::Array(items) = &second.kind {
            assert_eq!(items.borrow().len(), 2);
        }
    }

    #[test]
    fn test_memory_classification() {
        let accessor = Expression::expanded(
            ExpressionKind::MemoryAccessor {
                size: FieldSize::Byte,
                address: Expression::integer(0x1234, at(1)),
            },
            at(1),
        );
        let prev = Expression::expanded(
            ExpressionKind::MemoryModifier {
                modifier: MemoryModifierKind::Prev,
                accessor: Rc::clone(&accessor),
            },
            at(1),
        );
        assert!(prev.is_memory_reference());
        assert!(prev.is_integer_valued());
        assert_eq!(prev.memory_size(), Some(FieldSize::Byte));
        assert!(!Expression::integer(3, at(1)).depends_on_memory());
    }

    #[test]
    fn test_logical_unit_copy() {
        let node = Expression::integer(4, at(1));
        let unit = Expression::as_logical_unit(&node);
        assert!(unit.is_logical_unit);
        assert!(!node.is_logical_unit);
        assert_eq!(node, unit);
    }
}
