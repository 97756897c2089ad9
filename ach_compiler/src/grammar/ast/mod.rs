//! Expression tree, operators, traversal and display

pub mod display;
pub mod nodes;
pub mod operators;
pub mod traversal;

pub use nodes::{
    ArrayValue, BehaviorKind, DictionaryValue, ExprRef, Expression, ExpressionKind,
    FunctionDefinition, MemoryModifierKind,
};
pub use operators::{
    ComparisonOperation, ConditionalOperation, MathematicOperation, OperationPriority,
};
pub use traversal::{
    function_body_usage, function_free_names, root_variable, NameUsage, MUTATING_BUILTINS,
};
